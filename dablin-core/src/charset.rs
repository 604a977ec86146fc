//! DAB/MOT character repertoire conversion to UTF-8.

use crate::error::{Error, Result};

const NO_CHAR: &str = "";

// Code points 0x00-0x1F, EBU Latin based repertoire.
const EBU_0X00_TO_0X1F: [&str; 32] = [
    NO_CHAR, "\u{0118}", "\u{012E}", "\u{0172}", "\u{0102}", "\u{0116}", "\u{010E}", "\u{0218}",
    "\u{021A}", "\u{010A}", NO_CHAR, NO_CHAR, "\u{0120}", "\u{0139}", "\u{017B}", "\u{0143}",
    "\u{0105}", "\u{0119}", "\u{012F}", "\u{0173}", "\u{0103}", "\u{0117}", "\u{010F}", "\u{0219}",
    "\u{021B}", "\u{010B}", "\u{0147}", "\u{011A}", "\u{0121}", "\u{013A}", "\u{017C}", NO_CHAR,
];

// Code points 0x7B-0xFF, EBU Latin based repertoire.
const EBU_0X7B_TO_0XFF: [&str; 133] = [
    "\u{00AB}", "\u{016F}", "\u{00BB}", "\u{013D}", "\u{0126}", "\u{00E1}", "\u{00E0}", "\u{00E9}",
    "\u{00E8}", "\u{00ED}", "\u{00EC}", "\u{00F3}", "\u{00F2}", "\u{00FA}", "\u{00F9}", "\u{00D1}",
    "\u{00C7}", "\u{015E}", "\u{00DF}", "\u{00A1}", "\u{0178}", "\u{00E2}", "\u{00E4}", "\u{00EA}",
    "\u{00EB}", "\u{00EE}", "\u{00EF}", "\u{00F4}", "\u{00F6}", "\u{00FB}", "\u{00FC}", "\u{00F1}",
    "\u{00E7}", "\u{015F}", "\u{011F}", "\u{0131}", "\u{00FF}", "\u{0136}", "\u{0145}", "\u{00A9}",
    "\u{0122}", "\u{011E}", "\u{011B}", "\u{0148}", "\u{0151}", "\u{0150}", "\u{20AC}", "\u{00A3}",
    "\u{0024}", "\u{0100}", "\u{0112}", "\u{012A}", "\u{016A}", "\u{0137}", "\u{0146}", "\u{013B}",
    "\u{0123}", "\u{013C}", "\u{0130}", "\u{0144}", "\u{0171}", "\u{0170}", "\u{00BF}", "\u{013E}",
    "\u{00B0}", "\u{0101}", "\u{0113}", "\u{012B}", "\u{016B}", "\u{00C1}", "\u{00C0}", "\u{00C9}",
    "\u{00C8}", "\u{00CD}", "\u{00CC}", "\u{00D3}", "\u{00D2}", "\u{00DA}", "\u{00D9}", "\u{0158}",
    "\u{010C}", "\u{0160}", "\u{017D}", "\u{00D0}", "\u{013F}", "\u{00C2}", "\u{00C4}", "\u{00CA}",
    "\u{00CB}", "\u{00CE}", "\u{00CF}", "\u{00D4}", "\u{00D6}", "\u{00DB}", "\u{00DC}", "\u{0159}",
    "\u{010D}", "\u{0161}", "\u{017E}", "\u{0111}", "\u{0140}", "\u{00C3}", "\u{00C5}", "\u{00C6}",
    "\u{0152}", "\u{0177}", "\u{00DD}", "\u{00D5}", "\u{00D8}", "\u{00DE}", "\u{014A}", "\u{0154}",
    "\u{0106}", "\u{015A}", "\u{0179}", "\u{0164}", "\u{00F0}", "\u{00E3}", "\u{00E5}", "\u{00E6}",
    "\u{0153}", "\u{0175}", "\u{00FD}", "\u{00F5}", "\u{00F8}", "\u{00FE}", "\u{014B}", "\u{0155}",
    "\u{0107}", "\u{015B}", "\u{017A}", "\u{0165}", "\u{0127}",
];

/// Convert one EBU-Latin-based code point to its UTF-8 representation.
pub fn ebu_char_to_utf8(value: u8) -> std::borrow::Cow<'static, str> {
    if value <= 0x1F {
        return EBU_0X00_TO_0X1F[value as usize].into();
    }
    if value >= 0x7B {
        return EBU_0X7B_TO_0XFF[(value - 0x7B) as usize].into();
    }
    match value {
        0x24 => "\u{0142}".into(),
        0x5C => "\u{016E}".into(),
        0x5E => "\u{0141}".into(),
        0x60 => "\u{0104}".into(),
        // leave untouched: single ASCII byte, always valid UTF-8 on its own.
        _ => (value as char).to_string().into(),
    }
}

/// Result of a successful conversion: the UTF-8 text plus the charset's
/// human name, used by consumers (CLI title, MOT slideshow metadata).
pub struct Converted {
    pub text: String,
    pub charset_name: &'static str,
}

/// Strip the four control bytes the DAB character repertoire reserves
/// (NULL, PLB, EoH, PWB) before any charset conversion.
fn strip_control_bytes(data: &[u8]) -> Vec<u8> {
    data.iter()
        .copied()
        .filter(|b| !matches!(b, 0x00 | 0x0A | 0x0B | 0x1F))
        .collect()
}

/// `convert_text_to_utf8(bytes, charset_code, mot_context) -> (utf8, charset_name)`.
///
/// Charset codes: 0 = EBU Latin based, 4 = ISO-8859-1 (MOT only), 6 = UCS-2BE
/// (DAB only), 15 = UTF-8 passthrough. Any other code is rejected.
pub fn convert_text_to_utf8(data: &[u8], charset: u8, mot: bool) -> Result<Converted> {
    let cleaned = strip_control_bytes(data);

    match charset {
        0b0000 => {
            let text = cleaned.iter().map(|&b| ebu_char_to_utf8(b)).collect();
            Ok(Converted {
                text,
                charset_name: "EBU Latin based",
            })
        }
        0b0100 if mot => Ok(Converted {
            text: cleaned.iter().map(|&b| b as char).collect(),
            charset_name: "ISO-8859-1",
        }),
        0b0110 if !mot => {
            if cleaned.len() % 2 != 0 {
                return Err(Error::UnknownCharset(charset));
            }
            let text = cleaned
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .filter_map(char::from_u32_or_none)
                .collect();
            Ok(Converted {
                text,
                charset_name: "UCS-2BE",
            })
        }
        0b1111 => {
            let text = String::from_utf8(cleaned).map_err(|_| Error::UnknownCharset(charset))?;
            Ok(Converted {
                text,
                charset_name: "UTF-8",
            })
        }
        other => {
            log::warn!(
                "charset: the {} charset {} is not supported; ignoring",
                if mot { "MOT" } else { "DAB" },
                other
            );
            Err(Error::UnknownCharset(other))
        }
    }
}

/// Small helper trait so the UCS-2BE path can filter out unpaired surrogates
/// without pulling in a dedicated UTF-16 decoding crate for a single use site.
trait FromU32OrNone {
    fn from_u32_or_none(code: u16) -> Option<char>;
}

impl FromU32OrNone for char {
    fn from_u32_or_none(code: u16) -> Option<char> {
        char::from_u32(code as u32)
    }
}

/// Trim trailing spaces from a decoded label, per DAB label post-processing.
pub fn trim_label(text: &str) -> &str {
    text.trim_end_matches(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ebu_ascii_passthrough() {
        assert_eq!(ebu_char_to_utf8(b'A'), "A");
    }

    #[test]
    fn ebu_hand_mapped_exceptions() {
        assert_eq!(ebu_char_to_utf8(0x24), "\u{0142}");
        assert_eq!(ebu_char_to_utf8(0x5C), "\u{016E}");
        assert_eq!(ebu_char_to_utf8(0x5E), "\u{0141}");
        assert_eq!(ebu_char_to_utf8(0x60), "\u{0104}");
    }

    #[test]
    fn utf8_identity_on_valid_input() {
        let data = "hello".as_bytes();
        let converted = convert_text_to_utf8(data, 0b1111, true).unwrap();
        assert_eq!(converted.text, "hello");
    }

    #[test]
    fn strips_control_bytes() {
        let data = [0x00, b'A', 0x0A, b'B', 0x0B, b'C', 0x1F];
        let converted = convert_text_to_utf8(&data, 0b1111, true).unwrap();
        assert_eq!(converted.text, "ABC");
    }

    #[test]
    fn unknown_charset_rejected() {
        assert!(convert_text_to_utf8(b"x", 3, true).is_err());
    }

    #[test]
    fn iso8859_1_mot_only() {
        assert!(convert_text_to_utf8(b"x", 0b0100, false).is_err());
        assert!(convert_text_to_utf8(b"x", 0b0100, true).is_ok());
    }

    #[test]
    fn trims_trailing_spaces() {
        assert_eq!(trim_label("Ensemble Name   "), "Ensemble Name");
    }
}
