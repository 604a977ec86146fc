//! Spawned live-capture process sources. Demodulation itself is an external
//! collaborator; this module knows how to drive two capture binaries:
//! `dab2eti`, which takes a frequency and optional gain, and `eti-cmdline`,
//! which takes a channel block, band, and gain mode. Both print ETI(NI) on
//! stdout.

use std::process::{Child, Command, Stdio};

use dablin_core::channels::DAB_CHANNELS;

use crate::error::{Error, Result};
use crate::source::SourceReader;

/// Which capture binary to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBinary {
    Dab2Eti,
    EtiCmdline,
}

/// Tuner gain mode, resolved from the CLI's `-g`/`-G` flags and/or a
/// channel string's embedded `:<gain>` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gain {
    /// Let the capture binary apply its own default (no gain flag at all).
    Default,
    /// This app's auto-gain algorithm (`eti-cmdline -Q`; `dab2eti` with no
    /// gain argument - it has no separate auto flag).
    Auto,
    /// A specific gain value (`dab2eti <gain>`; `eti-cmdline -G <gain>`).
    Fixed(String),
}

/// A parsed `"NAME"` or `"NAME:<gain>"` channel string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelection {
    pub block: String,
    /// `Some` only when the channel string itself carried a `:<gain>` suffix.
    pub embedded_gain: Option<String>,
}

impl ChannelSelection {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((block, gain)) => {
                ChannelSelection { block: block.to_string(), embedded_gain: Some(gain.to_string()) }
            }
            None => ChannelSelection { block: spec.to_string(), embedded_gain: None },
        }
    }

    fn frequency_hz(&self) -> Result<u32> {
        DAB_CHANNELS
            .get(self.block.as_str())
            .map(|khz| khz * 1000)
            .ok_or_else(|| Error::UnknownChannel(self.block.clone()))
    }

    /// Combines this channel's embedded gain (if any) with the CLI's
    /// separately-specified gain mode; an embedded gain always wins, since
    /// it's the more specific selector.
    pub fn resolve_gain(&self, cli_gain: Gain) -> Gain {
        match &self.embedded_gain {
            Some(g) => Gain::Fixed(g.clone()),
            None => cli_gain,
        }
    }
}

/// Band selector for `eti-cmdline -B`, derived from the channel block name
/// (Band III blocks are numeric-prefixed, L-Band blocks start with "L").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    BandIii,
    LBand,
}

impl Band {
    fn of_block(block: &str) -> Band {
        if block.starts_with('L') {
            Band::LBand
        } else {
            Band::BandIii
        }
    }

    fn flag(self) -> &'static str {
        match self {
            Band::BandIii => "BAND_III",
            Band::LBand => "L_BAND",
        }
    }
}

fn build_command(binary_path: &str, kind: CaptureBinary, channel: &ChannelSelection, gain: &Gain) -> Result<Command> {
    let mut cmd = Command::new(binary_path);
    match kind {
        CaptureBinary::Dab2Eti => {
            let freq = channel.frequency_hz()?;
            cmd.arg(freq.to_string());
            if let Gain::Fixed(g) = gain {
                cmd.arg(g);
            }
            // Gain::Auto and Gain::Default both mean "omit the argument" for
            // dab2eti, which has no separate auto-gain flag.
        }
        CaptureBinary::EtiCmdline => {
            cmd.arg("-C").arg(&channel.block);
            cmd.arg("-S");
            cmd.arg("-B").arg(Band::of_block(&channel.block).flag());
            match gain {
                Gain::Auto => {
                    cmd.arg("-Q");
                }
                Gain::Fixed(g) => {
                    cmd.arg("-G").arg(g);
                }
                Gain::Default => {}
            }
        }
    }
    Ok(cmd)
}

/// Spawns `binary_path` with the argv matching `kind`'s capture contract,
/// returning the child process (so its exit status can be checked) and a
/// [`SourceReader`] over its stdout.
pub fn spawn(
    binary_path: &str,
    kind: CaptureBinary,
    channel: &ChannelSelection,
    gain: Gain,
) -> Result<(Child, SourceReader)> {
    let mut cmd = build_command(binary_path, kind, channel, &gain)?;
    cmd.stdout(Stdio::piped());
    cmd.stdin(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| Error::SpawnFailed(format!("{binary_path}: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::SpawnFailed("child process produced no stdout pipe".into()))?;

    let reader = SourceReader::new(stdout, 0);
    Ok((child, reader))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_channel() {
        let c = ChannelSelection::parse("12A");
        assert_eq!(c.block, "12A");
        assert_eq!(c.embedded_gain, None);
    }

    #[test]
    fn parses_channel_with_gain() {
        let c = ChannelSelection::parse("12A:30");
        assert_eq!(c.block, "12A");
        assert_eq!(c.embedded_gain, Some("30".to_string()));
    }

    #[test]
    fn embedded_gain_overrides_cli_gain() {
        let c = ChannelSelection::parse("12A:30");
        assert_eq!(c.resolve_gain(Gain::Auto), Gain::Fixed("30".to_string()));
    }

    #[test]
    fn band_is_derived_from_block_prefix() {
        assert_eq!(Band::of_block("12A"), Band::BandIii);
        assert_eq!(Band::of_block("LA"), Band::LBand);
    }

    #[test]
    fn unknown_channel_block_is_rejected() {
        let c = ChannelSelection::parse("99Z");
        assert!(matches!(c.frequency_hz(), Err(Error::UnknownChannel(_))));
    }
}
