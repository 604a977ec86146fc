//! DAB+ superframe (HE-AAC) sub-channel adapter.
//!
//! The Reed-Solomon(120,110) error correction and the exact AU_START
//! pointer table are codec-internal machinery treated as a black box here;
//! this adapter buffers exactly the five logical (24ms) frames
//! that make up one superframe and hands the whole superframe payload,
//! minus its trailing F-PAD/X-PAD, to `symphonia`'s AAC decoder as a single
//! access unit per superframe. PAD in a DAB+ stream only accompanies the
//! last logical frame of each superframe.

use symphonia_core::audio::SampleBuffer;
use symphonia_core::codecs::{CodecParameters, CodecRegistry, DecoderOptions, CODEC_TYPE_AAC};
use symphonia_core::formats::Packet;

use crate::mp2::interleave_le_bytes;
use crate::subchannel_sink::{SubchannelSink, SubchannelSinkObserver, FPAD_LEN};

const FRAMES_PER_SUPERFRAME: usize = 5;

/// Decodes one sub-channel's DAB+ superframes, forwarding decoded PCM and
/// the superframe's PAD to an observer.
pub struct SuperframeFilter<O: SubchannelSinkObserver> {
    observer: O,
    samplerate: u32,
    channels: u8,
    format_announced: bool,
    frames: Vec<Vec<u8>>,
    decoder: Option<Box<dyn symphonia_core::codecs::Decoder>>,
    codec_registry: &'static CodecRegistry,
}

impl<O: SubchannelSinkObserver> SuperframeFilter<O> {
    pub fn new(observer: O, samplerate: u32, channels: u8) -> Self {
        SuperframeFilter {
            observer,
            samplerate,
            channels,
            format_announced: false,
            frames: Vec::with_capacity(FRAMES_PER_SUPERFRAME),
            decoder: None,
            codec_registry: symphonia::default::get_codecs(),
        }
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn ensure_decoder(&mut self) {
        if self.decoder.is_some() {
            return;
        }
        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_AAC)
            .with_sample_rate(self.samplerate)
            .with_channels(if self.channels == 1 {
                symphonia_core::audio::Channels::FRONT_LEFT
            } else {
                symphonia_core::audio::Channels::FRONT_LEFT | symphonia_core::audio::Channels::FRONT_RIGHT
            });

        match self.codec_registry.make(&params, &DecoderOptions::default()) {
            Ok(decoder) => self.decoder = Some(decoder),
            Err(e) => log::error!("superframe: failed to create AAC decoder: {e}"),
        }
    }

    fn process_superframe(&mut self) {
        let superframe: Vec<u8> = self.frames.drain(..).flatten().collect();

        if !self.format_announced {
            self.format_announced = true;
            self.observer.format_change(&format!(
                "DAB+ (HE-AAC v2), {} kHz {}",
                self.samplerate / 1000,
                if self.channels == 1 { "Mono" } else { "Stereo" }
            ));
            self.observer.start_audio(self.samplerate, self.channels, false);
        }

        if superframe.len() < FPAD_LEN {
            log::warn!("superframe: too short to hold F-PAD");
            return;
        }
        let fpad_start = superframe.len() - FPAD_LEN;
        let fpad: [u8; FPAD_LEN] = [superframe[fpad_start], superframe[fpad_start + 1]];
        self.observer.process_pad(&superframe[..fpad_start], true, fpad);

        self.ensure_decoder();
        let Some(decoder) = self.decoder.as_mut() else { return };

        let packet = Packet::new_from_slice(0, 0, 0, &superframe[..fpad_start]);
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let spec = *audio_buf.spec();
                let mut sample_buf = SampleBuffer::<i16>::new(audio_buf.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(audio_buf);
                self.observer.put_audio(&interleave_le_bytes(sample_buf.samples()));
            }
            Err(e) => log::warn!("superframe: AAC decode error: {e}"),
        }
    }
}

impl<O: SubchannelSinkObserver> SubchannelSink for SuperframeFilter<O> {
    fn feed(&mut self, data: &[u8]) {
        self.frames.push(data.to_vec());
        if self.frames.len() == FRAMES_PER_SUPERFRAME {
            self.process_superframe();
        }
    }
}
