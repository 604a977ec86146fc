//! MPEG-1/2 Audio Layer II (DAB) sub-channel adapter. One `feed()` call
//! carries exactly one MP2 frame (a DAB sub-channel's bytes for a single
//! 24ms logical frame always align to one Layer-II frame boundary).
//!
//! PAD derivation is done directly against the raw frame bytes, independent
//! of the codec decode: the frame's CRC-protection length (2 or 4 bytes,
//! depending on MPEG version/bitrate/mode) is subtracted along with the
//! trailing F-PAD, and the remainder is forwarded as X-PAD — the later of
//! two conventions for PAD derivation, the fixed-offset-copy one being
//! superseded.

use symphonia_core::audio::SampleBuffer;
use symphonia_core::codecs::{CodecParameters, CodecRegistry, DecoderOptions, CODEC_TYPE_MP2};
use symphonia_core::formats::Packet;

use crate::subchannel_sink::{SubchannelSink, SubchannelSinkObserver, FPAD_LEN};

const MPEG1_BITRATES_LAYER2: [u32; 15] =
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const MPEG2_BITRATES_LAYER2: [u32; 15] =
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const MPEG1_SAMPLERATES: [u32; 3] = [44100, 48000, 32000];
const MPEG2_SAMPLERATES: [u32; 3] = [22050, 24000, 16000];
const MPEG25_SAMPLERATES: [u32; 3] = [11025, 12000, 8000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MpegVersion {
    V1,
    V2,
    V25,
}

struct FrameHeader {
    version: MpegVersion,
    samplerate: u32,
    bitrate: u32,
    channels: u8,
    crc_len: usize,
}

fn parse_header(data: &[u8]) -> Option<FrameHeader> {
    if data.len() < 4 {
        return None;
    }
    if data[0] != 0xFF || data[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = match (data[1] >> 3) & 0x03 {
        0b00 => MpegVersion::V25,
        0b10 => MpegVersion::V2,
        0b11 => MpegVersion::V1,
        _ => return None,
    };
    let layer = (data[1] >> 1) & 0x03;
    if layer != 0b10 {
        return None; // Layer II only
    }

    let bitrate_index = ((data[2] >> 4) & 0x0F) as usize;
    let samplerate_index = ((data[2] >> 2) & 0x03) as usize;
    if bitrate_index == 0 || bitrate_index >= 15 || samplerate_index >= 3 {
        return None;
    }

    let bitrate = match version {
        MpegVersion::V1 => MPEG1_BITRATES_LAYER2[bitrate_index],
        MpegVersion::V2 | MpegVersion::V25 => MPEG2_BITRATES_LAYER2[bitrate_index],
    };
    let samplerate = match version {
        MpegVersion::V1 => MPEG1_SAMPLERATES[samplerate_index],
        MpegVersion::V2 => MPEG2_SAMPLERATES[samplerate_index],
        MpegVersion::V25 => MPEG25_SAMPLERATES[samplerate_index],
    };

    let channel_mode = (data[3] >> 6) & 0x03;
    let channels = if channel_mode == 0b11 { 1 } else { 2 };

    let mono_limit = 56;
    let stereo_limit = 112;
    let limit = if channels == 1 { mono_limit } else { stereo_limit };
    let crc_len = if version == MpegVersion::V1 && bitrate < limit { 2 } else { 4 };

    Some(FrameHeader { version, samplerate, bitrate, channels, crc_len })
}

fn version_name(version: MpegVersion) -> &'static str {
    match version {
        MpegVersion::V1 => "1.0",
        MpegVersion::V2 => "2.0",
        MpegVersion::V25 => "2.5",
    }
}

/// Decodes one sub-channel's MP2 (Layer-II) frames, forwarding decoded PCM
/// and derived PAD to an observer.
pub struct Mp2Decoder<O: SubchannelSinkObserver> {
    observer: O,
    format_announced: bool,
    decoder: Option<Box<dyn symphonia_core::codecs::Decoder>>,
    codec_registry: &'static CodecRegistry,
}

impl<O: SubchannelSinkObserver> Mp2Decoder<O> {
    pub fn new(observer: O) -> Self {
        Mp2Decoder {
            observer,
            format_announced: false,
            decoder: None,
            codec_registry: symphonia::default::get_codecs(),
        }
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn ensure_decoder(&mut self, header: &FrameHeader) {
        if self.decoder.is_some() {
            return;
        }
        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_MP2)
            .with_sample_rate(header.samplerate)
            .with_max_frames_per_packet(1152);

        match self.codec_registry.make(&params, &DecoderOptions::default()) {
            Ok(decoder) => self.decoder = Some(decoder),
            Err(e) => log::error!("mp2: failed to create decoder: {e}"),
        }
    }
}

impl<O: SubchannelSinkObserver> SubchannelSink for Mp2Decoder<O> {
    fn feed(&mut self, data: &[u8]) {
        let header = match parse_header(data) {
            Some(h) => h,
            None => {
                log::warn!("mp2: frame sync/header invalid, dropping {} bytes", data.len());
                return;
            }
        };

        if !self.format_announced {
            self.format_announced = true;
            self.observer.format_change(&format!(
                "MPEG {} Layer II, {} kHz {} @ {} kbit/s",
                version_name(header.version),
                header.samplerate / 1000,
                if header.channels == 1 { "Mono" } else { "Stereo" },
                header.bitrate
            ));
            self.observer.start_audio(header.samplerate, header.channels, false);
        }

        if data.len() < FPAD_LEN + header.crc_len {
            log::warn!("mp2: frame too short to hold CRC+F-PAD");
            return;
        }
        let fpad_start = data.len() - FPAD_LEN;
        let xpad_end = fpad_start - header.crc_len;
        let fpad: [u8; FPAD_LEN] = [data[fpad_start], data[fpad_start + 1]];
        self.observer.process_pad(&data[..xpad_end], false, fpad);

        self.ensure_decoder(&header);
        let Some(decoder) = self.decoder.as_mut() else { return };

        let packet = Packet::new_from_slice(0, 0, 0, data);
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let spec = *audio_buf.spec();
                let mut sample_buf = SampleBuffer::<i16>::new(audio_buf.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(audio_buf);
                self.observer.put_audio(&interleave_le_bytes(sample_buf.samples()));
            }
            Err(e) => log::warn!("mp2: decode error: {e}"),
        }
    }
}

/// Every multi-byte protocol/PCM field is assembled explicitly, never by
/// reinterpreting memory; this turns an `i16` sample slice into its
/// little-endian wire representation.
pub(crate) fn interleave_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
