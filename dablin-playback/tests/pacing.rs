//! Pacing and resync behaviour for the audio pump.

use std::time::{Duration, Instant};

use dablin_core::pad::PadDecoderObserver;
use dablin_playback::audio_output::AudioOutput;
use dablin_playback::ensemble_player::{EnsemblePlayer, FRAME_PERIOD};

#[derive(Default)]
struct NullAudio;
impl AudioOutput for NullAudio {
    fn start_audio(&mut self, _samplerate: u32, _channels: u8, _float32: bool) {}
    fn put_audio(&mut self, _data: &[u8]) {}
}

#[derive(Clone, Default)]
struct NullPad;
impl PadDecoderObserver for NullPad {}

/// A modest frame count keeps this test's wall-clock cost down while still
/// exercising several pacing cycles; the assertion scales with `N` so it's
/// equally valid at either size.
const N: u32 = 20;

#[test]
fn frames_delivered_back_to_back_are_paced_at_24ms() {
    let player = EnsemblePlayer::new(Box::new(NullAudio), NullPad, false, true);

    let start = Instant::now();
    for _ in 0..N {
        player.pace();
    }
    let elapsed = start.elapsed();

    // First frame is delivered immediately (no prior schedule), so N frames
    // span (N-1) frame periods, not N.
    let expected = FRAME_PERIOD * (N - 1);
    assert!(
        elapsed >= expected.saturating_sub(Duration::from_millis(5)),
        "paced delivery finished too early: {elapsed:?} < {expected:?}"
    );
    assert!(
        elapsed <= expected + Duration::from_millis(200),
        "paced delivery finished too late: {elapsed:?} > {expected:?}"
    );
}

#[test]
fn stall_without_catch_up_resyncs_instead_of_bursting() {
    let player = EnsemblePlayer::new(Box::new(NullAudio), NullPad, false, false);

    // Establish a schedule with one frame, then simulate a long stall by
    // sleeping well past the next deadline before calling pace() again.
    player.pace();
    std::thread::sleep(Duration::from_millis(120));

    let resume = Instant::now();
    player.pace(); // must return immediately: catch-up disabled, way more than one frame late
    assert!(resume.elapsed() < Duration::from_millis(10), "stalled pump should not sleep to catch up");

    // Cadence resumes at 24ms from the resync point.
    let next = Instant::now();
    player.pace();
    let gap = next.elapsed();
    assert!(gap >= Duration::from_millis(19), "expected ~24ms gap after resync, got {gap:?}");
    assert!(gap <= Duration::from_millis(60), "expected ~24ms gap after resync, got {gap:?}");
}
