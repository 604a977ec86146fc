//! The per-frame contract a sub-channel codec adapter (MP2 or DAB+
//! superframe) feeds into: decoded audio plus the PAD carried alongside it.

/// Length of an F-PAD field, in bytes. Always 2.
pub const FPAD_LEN: usize = 2;

/// Receives a [`SubchannelSink`]'s output: format/start notifications,
/// decoded PCM, and the raw PAD bytes that rode alongside the audio frame.
pub trait SubchannelSinkObserver {
    fn format_change(&mut self, _summary: &str) {}
    fn start_audio(&mut self, _samplerate: u32, _channels: u8, _float32: bool) {}
    fn put_audio(&mut self, _data: &[u8]) {}
    fn process_pad(&mut self, _xpad_data: &[u8], _exact_xpad_len: bool, _fpad_data: [u8; FPAD_LEN]) {}
}

/// One sub-channel's codec adapter: absorbs raw MSC bytes for a single 24ms
/// frame and reports decoded audio/PAD to its observer out of band.
pub trait SubchannelSink {
    fn feed(&mut self, data: &[u8]);
}
