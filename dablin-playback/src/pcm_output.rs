//! Interleaved-PCM-to-stdout sink: writes every decoded frame immediately,
//! no buffering.

use std::io::{self, Write};

use crate::audio_output::AudioOutput;

pub struct PcmOutput {
    samplerate: u32,
    channels: u8,
    audio_mute: bool,
}

impl Default for PcmOutput {
    fn default() -> Self {
        PcmOutput { samplerate: 0, channels: 0, audio_mute: false }
    }
}

impl PcmOutput {
    pub fn new() -> Self {
        PcmOutput::default()
    }
}

impl AudioOutput for PcmOutput {
    fn start_audio(&mut self, samplerate: u32, channels: u8, _float32: bool) {
        if self.samplerate == samplerate && self.channels == channels {
            return;
        }
        self.samplerate = samplerate;
        self.channels = channels;
        log::info!("PCM output: format set; samplerate: {samplerate}, channels: {channels}");
    }

    fn put_audio(&mut self, data: &[u8]) {
        if self.audio_mute {
            return;
        }
        if let Err(e) = io::stdout().write_all(data) {
            log::error!("PCM output: error while writing to stdout: {e}");
        }
    }

    fn set_audio_mute(&mut self, mute: bool) {
        self.audio_mute = mute;
    }
}
