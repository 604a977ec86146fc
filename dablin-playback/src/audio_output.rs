//! The pluggable audio-sink contract, shared by the stdout PCM/WAV sinks
//! and the platform-device (`cpal`) sink.

/// A decoded-audio destination: PCM-to-stdout, WAV-to-stdout, or a real
/// output device. Mute/volume are no-ops for sinks that can't support them.
pub trait AudioOutput {
    fn start_audio(&mut self, samplerate: u32, channels: u8, float32: bool);
    fn put_audio(&mut self, data: &[u8]);
    fn stop_audio(&mut self) {}

    fn set_audio_mute(&mut self, _mute: bool) {}
    fn set_audio_volume(&mut self, _volume: f64) {}
    fn has_audio_volume_control(&self) -> bool {
        false
    }
}
