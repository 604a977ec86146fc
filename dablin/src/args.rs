//! CLI flags for the text-build receiver, plus the post-parse validation
//! `dablin.cpp::main` performs by hand (mutually exclusive initial-service
//! and gain selectors) - `clap` can express "conflicts_with" pairwise, but
//! not this set's "at most one of five differently-typed flags" shape
//! without losing the specific error text, so it's done as an explicit pass
//! here.

use clap::{Parser, ValueEnum};

use dablin_playback::source::live::{CaptureBinary, Gain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportFormat {
    Eti,
    Edi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureBinaryKind {
    Dab2Eti,
    EtiCmdline,
}

impl From<CaptureBinaryKind> for CaptureBinary {
    fn from(kind: CaptureBinaryKind) -> Self {
        match kind {
            CaptureBinaryKind::Dab2Eti => CaptureBinary::Dab2Eti,
            CaptureBinaryKind::EtiCmdline => CaptureBinary::EtiCmdline,
        }
    }
}

/// A resolved, mutually-exclusive choice of which service/component to
/// select once the FIC catalog reveals it. `None` means "select nothing -
/// print the catalog and stay silent", which is a legitimate mode (e.g.
/// scanning an ensemble's service list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialSelector {
    None,
    Label(String),
    FirstFound,
    Sid { sid: u16, scids: Option<u8> },
    SubchidDab(u8),
    SubchidDabPlus(u8),
}

fn parse_num(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u32>().map_err(|e| e.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "dablin", about = "A DAB/DAB+ receiver: demultiplex, decode, and print metadata for one ensemble")]
pub struct Args {
    /// Transport stream format carried by the input.
    #[arg(short = 'f', value_enum, default_value_t = TransportFormat::Eti)]
    pub format: TransportFormat,

    /// Path to a live-capture binary to spawn instead of reading a file/stdin.
    #[arg(short = 'd')]
    pub capture_binary: Option<String>,

    /// Which capture binary's argv convention `-d` refers to.
    #[arg(short = 'D', value_enum, requires = "capture_binary")]
    pub capture_kind: Option<CaptureBinaryKind>,

    /// Channel block (Band III/L-Band name), optionally `NAME:<gain>`.
    #[arg(short = 'c', requires = "capture_binary")]
    pub channel: Option<String>,

    /// Select the first service whose FIC label equals this string.
    #[arg(short = 'l')]
    pub label: Option<String>,

    /// Select the first service with a usable audio component, whichever it is.
    #[arg(short = '1')]
    pub first_found: bool,

    /// Select by Service ID (decimal, or hex with a `0x` prefix).
    #[arg(short = 's', value_parser = parse_num)]
    pub sid: Option<u32>,

    /// Component ID within `-s`'s service (SCIdS); requires `-s`.
    #[arg(short = 'x', value_parser = parse_num, requires = "sid")]
    pub scids: Option<u32>,

    /// Select a DAB (MPEG Layer-II) sub-channel directly by SubChId.
    #[arg(short = 'r', value_parser = parse_num)]
    pub subchid_dab: Option<u32>,

    /// Select a DAB+ (HE-AAC) sub-channel directly by SubChId.
    #[arg(short = 'R', value_parser = parse_num)]
    pub subchid_dabplus: Option<u32>,

    /// Fixed tuner gain for a spawned capture process.
    #[arg(short = 'g')]
    pub gain: Option<String>,

    /// Use the capture device's own default gain (rather than this app's auto-gain).
    #[arg(short = 'G')]
    pub gain_default: bool,

    /// Write decoded PCM to stdout instead of a platform audio device.
    #[arg(short = 'p')]
    pub pcm_stdout: bool,

    /// Write the selected sub-channel's raw (undecoded) bytes to stdout.
    #[arg(short = 'u')]
    pub untouched_stdout: bool,

    /// Disable pacing catch-up: a stall re-anchors the schedule instead of
    /// bursting the backlog.
    #[arg(short = 'I')]
    pub no_catch_up: bool,

    /// Suppress per-frame "FIB discarded" and dynamic FIC log lines.
    #[arg(short = 'F')]
    pub suppress_dynamic_fic: bool,

    /// Input file; omitted means read from stdin. Ignored when `-d` spawns a
    /// live capture process.
    pub input: Option<String>,
}

impl Args {
    /// Resolves the mutually-exclusive initial-service selector, or returns
    /// a usage-error message.
    pub fn initial_selector(&self) -> Result<InitialSelector, String> {
        let mut chosen: Vec<&str> = Vec::new();
        if self.label.is_some() {
            chosen.push("-l");
        }
        if self.first_found {
            chosen.push("-1");
        }
        if self.sid.is_some() {
            chosen.push("-s");
        }
        if self.subchid_dab.is_some() {
            chosen.push("-r");
        }
        if self.subchid_dabplus.is_some() {
            chosen.push("-R");
        }
        if chosen.len() > 1 {
            return Err(format!(
                "at most one initial-service selector may be given, got {}",
                chosen.join(" and ")
            ));
        }

        Ok(match (&self.label, self.first_found, self.sid, self.subchid_dab, self.subchid_dabplus) {
            (Some(label), ..) => InitialSelector::Label(label.clone()),
            (_, true, ..) => InitialSelector::FirstFound,
            (_, _, Some(sid), ..) => InitialSelector::Sid {
                sid: sid as u16,
                scids: self.scids.map(|v| v as u8),
            },
            (_, _, _, Some(subchid), _) => InitialSelector::SubchidDab(subchid as u8),
            (_, _, _, _, Some(subchid)) => InitialSelector::SubchidDabPlus(subchid as u8),
            _ => InitialSelector::None,
        })
    }

    /// Resolves the CLI-level gain mode (`-g`/`-G`); a channel string's own
    /// embedded `:<gain>` suffix still takes precedence over this, applied
    /// later in [`dablin_playback::source::live::ChannelSelection::resolve_gain`].
    pub fn gain_mode(&self) -> Result<Gain, String> {
        if self.gain.is_some() && self.gain_default {
            return Err("-g and -G are mutually exclusive gain selectors".to_string());
        }
        Ok(match &self.gain {
            Some(g) => Gain::Fixed(g.clone()),
            None if self.gain_default => Gain::Default,
            None => Gain::Auto,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn rejects_conflicting_selectors() {
        let args = Args::parse_from(["dablin", "-l", "Radio 1", "-1"]);
        assert!(args.initial_selector().is_err());
    }

    #[test]
    fn rejects_conflicting_gain_flags() {
        let args = Args::parse_from(["dablin", "-g", "30", "-G"]);
        assert!(args.gain_mode().is_err());
    }

    #[test]
    fn sid_accepts_hex() {
        let args = Args::parse_from(["dablin", "-s", "0x1001"]);
        assert_eq!(args.initial_selector().unwrap(), InitialSelector::Sid { sid: 0x1001, scids: None });
    }

    #[test]
    fn no_selector_is_none() {
        let args = Args::parse_from(["dablin"]);
        assert_eq!(args.initial_selector().unwrap(), InitialSelector::None);
    }
}
