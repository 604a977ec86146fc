//! Streaming WAV-to-stdout sink: writes a RIFF/WAVE header with
//! `ckSize = 0xFFFFFFFF` (streaming, unknown final length) once per format
//! change, then interleaved 16-bit LE samples as they arrive.

use std::io::{self, Write};

use crate::audio_output::AudioOutput;

pub struct WavOutput {
    samplerate: u32,
    channels: u8,
    audio_mute: bool,
}

impl Default for WavOutput {
    fn default() -> Self {
        WavOutput { samplerate: 0, channels: 0, audio_mute: false }
    }
}

impl WavOutput {
    pub fn new() -> Self {
        WavOutput::default()
    }

    fn write_header(&self, samplerate: u32, channels: u8) -> io::Result<()> {
        let mut out = io::stdout();

        out.write_all(b"RIFF")?;
        out.write_all(&u32::MAX.to_le_bytes())?;
        out.write_all(b"WAVE")?;

        out.write_all(b"fmt ")?;
        out.write_all(&16u32.to_le_bytes())?;
        out.write_all(&1u16.to_le_bytes())?; // WAVE_FORMAT_PCM
        out.write_all(&(channels as u16).to_le_bytes())?;
        out.write_all(&samplerate.to_le_bytes())?;
        out.write_all(&(2 * channels as u32 * samplerate).to_le_bytes())?;
        out.write_all(&(2 * channels as u16).to_le_bytes())?;
        out.write_all(&16u16.to_le_bytes())?;

        out.write_all(b"data")?;
        out.write_all(&u32::MAX.to_le_bytes())?;
        Ok(())
    }
}

impl AudioOutput for WavOutput {
    fn start_audio(&mut self, samplerate: u32, channels: u8, _float32: bool) {
        if self.samplerate == samplerate && self.channels == channels {
            return;
        }
        self.samplerate = samplerate;
        self.channels = channels;
        log::info!("WAV output: format set; samplerate: {samplerate}, channels: {channels}");
        if let Err(e) = self.write_header(samplerate, channels) {
            log::error!("WAV output: error while writing header: {e}");
        }
    }

    fn put_audio(&mut self, data: &[u8]) {
        if self.audio_mute {
            return;
        }
        if let Err(e) = io::stdout().write_all(data) {
            log::error!("WAV output: error while writing to stdout: {e}");
        }
    }

    fn set_audio_mute(&mut self, mute: bool) {
        self.audio_mute = mute;
    }
}
