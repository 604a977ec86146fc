//! The audio pump: 24ms/frame pacing, mutex-guarded sub-channel selection,
//! and (re)instantiation of the codec adapter + PAD decoder pair for
//! whichever [`AudioService`] is currently selected.
//!
//! Grounded on `ensemble_player.h`/`ensemble_player.cpp::ProcessFrame`'s
//! pacing anchor and on a `Controls`-style mutex-guarded shared state for the
//! selection handoff between the source thread and any other thread calling
//! [`EnsemblePlayer::set_audio_service`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dablin_core::pad::{PadDecoder, PadDecoderObserver};
use dablin_core::types::AudioService;

use crate::audio_output::AudioOutput;
use crate::mp2::Mp2Decoder;
use crate::subchannel_sink::{SubchannelSink, SubchannelSinkObserver, FPAD_LEN};
use crate::superframe::SuperframeFilter;

/// Real-time length of one DAB logical frame.
pub const FRAME_PERIOD: Duration = Duration::from_millis(24);

/// DAB+ superframes don't self-describe samplerate/channels the way MPEG
/// Layer-II frame headers do, and the HE-AAC codec is treated as a black
/// box here, so this crate assumes the overwhelmingly common DAB+
/// broadcast format (48kHz stereo) and lets `symphonia`'s AAC decoder
/// correct itself from the access unit's own `StreamInfo` once decoding
/// starts.
const DAB_PLUS_DEFAULT_SAMPLERATE: u32 = 48_000;
const DAB_PLUS_DEFAULT_CHANNELS: u8 = 2;

/// Bridges one [`SubchannelSink`]'s output to the shared [`AudioOutput`] and
/// to a freshly-constructed [`PadDecoder`]. Built anew by every
/// [`EnsemblePlayer::set_audio_service`] call, which is exactly how PAD
/// state ends up reset on every selection change: there's nothing to carry
/// over, a new bridge starts a new [`PadDecoder`].
struct FrameBridge<P: PadDecoderObserver> {
    audio_output: Arc<Mutex<Box<dyn AudioOutput + Send>>>,
    pad_decoder: PadDecoder<P>,
}

impl<P: PadDecoderObserver> SubchannelSinkObserver for FrameBridge<P> {
    fn format_change(&mut self, summary: &str) {
        log::info!("audio format: {summary}");
    }

    fn start_audio(&mut self, samplerate: u32, channels: u8, float32: bool) {
        self.audio_output.lock().unwrap().start_audio(samplerate, channels, float32);
    }

    fn put_audio(&mut self, data: &[u8]) {
        self.audio_output.lock().unwrap().put_audio(data);
    }

    fn process_pad(&mut self, xpad_data: &[u8], exact_xpad_len: bool, fpad_data: [u8; FPAD_LEN]) {
        self.pad_decoder.process(xpad_data, exact_xpad_len, fpad_data);
    }
}

struct Selection {
    audio_service: AudioService,
    sink: Option<Box<dyn SubchannelSink + Send>>,
    /// Bumped on every non-idempotent selection change; exposed for tests
    /// and diagnostics, not required for correctness.
    generation: u64,
}

impl Default for Selection {
    fn default() -> Self {
        Selection { audio_service: AudioService::NONE, sink: None, generation: 0 }
    }
}

/// Owns the sub-channel sink, the pluggable audio sink, and the PAD/MOT
/// reassembly state for whichever sub-channel is currently selected; paces
/// frame delivery to the codec at exactly 24ms real time per frame.
pub struct EnsemblePlayer<P: PadDecoderObserver + Clone + Send + 'static> {
    audio_output: Arc<Mutex<Box<dyn AudioOutput + Send>>>,
    pad_observer_template: P,
    loose_xpad: bool,
    catch_up: bool,
    selection: Mutex<Selection>,
    scheduled: Mutex<Option<Instant>>,
}

impl<P: PadDecoderObserver + Clone + Send + 'static> EnsemblePlayer<P> {
    pub fn new(audio_output: Box<dyn AudioOutput + Send>, pad_observer: P, loose_xpad: bool, catch_up: bool) -> Self {
        EnsemblePlayer {
            audio_output: Arc::new(Mutex::new(audio_output)),
            pad_observer_template: pad_observer,
            loose_xpad,
            catch_up,
            selection: Mutex::new(Selection::default()),
            scheduled: Mutex::new(None),
        }
    }

    /// Selects which sub-channel (and codec family) receives subsequent
    /// [`Self::feed`] calls. Idempotent: reselecting the currently active
    /// service is a no-op (no sink teardown, no PAD reset).
    pub fn set_audio_service(&self, audio_service: AudioService, mot_app_type: Option<u8>) {
        let mut sel = self.selection.lock().unwrap();
        if sel.audio_service == audio_service {
            return;
        }
        sel.audio_service = audio_service;
        sel.sink = None;
        sel.generation += 1;

        let Some(_subchid) = audio_service.subchid else {
            self.audio_output.lock().unwrap().stop_audio();
            return;
        };

        let mut pad_decoder = PadDecoder::new(self.pad_observer_template.clone(), self.loose_xpad);
        pad_decoder.set_mot_app_type(mot_app_type);
        let bridge = FrameBridge { audio_output: self.audio_output.clone(), pad_decoder };

        sel.sink = Some(if audio_service.dab_plus {
            Box::new(SuperframeFilter::new(bridge, DAB_PLUS_DEFAULT_SAMPLERATE, DAB_PLUS_DEFAULT_CHANNELS))
        } else {
            Box::new(Mp2Decoder::new(bridge))
        });
    }

    pub fn current_audio_service(&self) -> AudioService {
        self.selection.lock().unwrap().audio_service
    }

    /// Test/diagnostic hook: how many times selection has actually changed
    /// the sink (as opposed to idempotent reselection).
    pub fn generation(&self) -> u64 {
        self.selection.lock().unwrap().generation
    }

    /// Feeds one frame's sub-channel bytes, if `subchid` matches the current
    /// selection; otherwise dropped (the frame belongs to an unselected
    /// sub-channel).
    pub fn feed(&self, subchid: u8, data: &[u8]) {
        let mut sel = self.selection.lock().unwrap();
        if sel.audio_service.subchid != Some(subchid) {
            return;
        }
        if let Some(sink) = sel.sink.as_mut() {
            sink.feed(data);
        }
    }

    pub fn set_mute(&self, mute: bool) {
        self.audio_output.lock().unwrap().set_audio_mute(mute);
    }

    pub fn set_volume(&self, volume: f64) {
        self.audio_output.lock().unwrap().set_audio_volume(volume);
    }

    /// Blocks the calling (source) thread until the next frame's scheduled
    /// delivery time, then advances the schedule by [`FRAME_PERIOD`].
    ///
    /// When delivery is running more than one frame period late and
    /// catch-up is disabled, the schedule re-anchors to the current clock
    /// instead of delivering a backlog of frames back-to-back (the
    /// stall-tolerant pacing policy).
    pub fn pace(&self) {
        let mut scheduled = self.scheduled.lock().unwrap();
        let now = Instant::now();
        let next = scheduled.unwrap_or(now);

        if now < next {
            std::thread::sleep(next - now);
            *scheduled = Some(next + FRAME_PERIOD);
            return;
        }

        let late = now.duration_since(next);
        if late > FRAME_PERIOD && !self.catch_up {
            *scheduled = Some(now + FRAME_PERIOD);
        } else {
            *scheduled = Some(next + FRAME_PERIOD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NullAudio;
    impl AudioOutput for NullAudio {
        fn start_audio(&mut self, _samplerate: u32, _channels: u8, _float32: bool) {}
        fn put_audio(&mut self, _data: &[u8]) {}
    }

    #[derive(Clone, Default)]
    struct NullPad;
    impl PadDecoderObserver for NullPad {}

    fn player() -> EnsemblePlayer<NullPad> {
        EnsemblePlayer::new(Box::new(NullAudio), NullPad, false, true)
    }

    #[test]
    fn reselecting_same_service_is_a_no_op() {
        let p = player();
        p.set_audio_service(AudioService::new(5, false), None);
        assert_eq!(p.generation(), 1);
        p.set_audio_service(AudioService::new(5, false), None);
        assert_eq!(p.generation(), 1, "identical reselection must not bump the generation");
    }

    #[test]
    fn switching_subchannel_bumps_generation() {
        let p = player();
        p.set_audio_service(AudioService::new(5, false), None);
        p.set_audio_service(AudioService::new(6, false), None);
        assert_eq!(p.generation(), 2);
    }

    #[test]
    fn unselected_subchannel_bytes_are_dropped() {
        let p = player();
        p.set_audio_service(AudioService::new(5, false), None);
        // Feeding sub-channel 6 while 5 is selected must not touch the sink.
        p.feed(6, &[0xFF; 4]);
    }

    #[test]
    fn none_selection_produces_silence() {
        let p = player();
        p.set_audio_service(AudioService::new(5, false), None);
        p.set_audio_service(AudioService::NONE, None);
        assert!(p.current_audio_service().is_none());
    }
}
