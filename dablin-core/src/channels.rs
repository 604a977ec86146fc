//! DAB channel block → frequency (kHz) table for Band III and L-Band.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Block name ("5A", "13F", "LA"...) to centre frequency in kHz.
pub static DAB_CHANNELS: Lazy<BTreeMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("5A", 174928),
        ("5B", 176640),
        ("5C", 178352),
        ("5D", 180064),
        ("6A", 181936),
        ("6B", 183648),
        ("6C", 185360),
        ("6D", 187072),
        ("7A", 188928),
        ("7B", 190640),
        ("7C", 192352),
        ("7D", 194064),
        ("8A", 195936),
        ("8B", 197648),
        ("8C", 199360),
        ("8D", 201072),
        ("9A", 202928),
        ("9B", 204640),
        ("9C", 206352),
        ("9D", 208064),
        ("10A", 209936),
        ("10N", 210096),
        ("10B", 211648),
        ("10C", 213360),
        ("10D", 215072),
        ("11A", 216928),
        ("11N", 217088),
        ("11B", 218640),
        ("11C", 220352),
        ("11D", 222064),
        ("12A", 223936),
        ("12N", 224096),
        ("12B", 225648),
        ("12C", 227360),
        ("12D", 229072),
        ("13A", 230784),
        ("13B", 232496),
        ("13C", 234208),
        ("13D", 235776),
        ("13E", 237488),
        ("13F", 239200),
        ("LA", 1452960),
        ("LB", 1454672),
        ("LC", 1456384),
        ("LD", 1458096),
        ("LE", 1459808),
        ("LF", 1461520),
        ("LG", 1463232),
        ("LH", 1464944),
        ("LI", 1466656),
        ("LJ", 1468368),
        ("LK", 1470080),
        ("LL", 1471792),
        ("LM", 1473504),
        ("LN", 1475216),
        ("LO", 1476928),
        ("LP", 1478640),
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band3_and_lband_present() {
        assert_eq!(DAB_CHANNELS.get("5A"), Some(&174928));
        assert_eq!(DAB_CHANNELS.get("13F"), Some(&239200));
        assert_eq!(DAB_CHANNELS.get("LA"), Some(&1452960));
    }
}
