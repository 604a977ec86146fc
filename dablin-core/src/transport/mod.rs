//! Transport framing: resynchronisation to frame boundaries and the two
//! concrete wire formats (ETI(NI), EDI) that carry a DAB ensemble.
//!
//! The [`Framer`] trait and [`FrameAssembler`] it drives are pure - no I/O.
//! A caller (the source reader, in `dablin-playback`) owns the actual byte
//! source and repeatedly hands fresh bytes to [`FrameAssembler::fill`].

pub mod edi;
pub mod eti;

/// A byte sequence that marks the start of a frame, at a fixed offset within
/// it (ETI's FSYNC sits at offset 1; EDI's "AF"/"fio_" sit at offset 0).
#[derive(Debug, Clone, Copy)]
pub struct SyncMagic {
    pub offset: usize,
    pub bytes: &'static [u8],
    pub name: &'static str,
}

impl SyncMagic {
    fn matches(&self, buf: &[u8]) -> bool {
        buf.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes)
    }

    fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }
}

/// Outcome of [`Framer::check_frame_completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCheck {
    /// The buffer holds one complete frame.
    Complete,
    /// The buffer's true size has just become known (e.g. an EDI AF
    /// packet's `LEN` field); grow the assembler's buffer to `new_size` and
    /// keep filling.
    Incomplete { new_size: usize },
}

/// A wire format's sync magics, initial (prefix) buffer size, and frame
/// completion test. Implementations hold no frame state between calls other
/// than whatever helps dedup/validate the *next* frame (see
/// [`eti::EtiDecoder`]'s FSYNC-repeat check).
pub trait Framer {
    fn sync_magics(&self) -> &'static [SyncMagic];
    fn initial_frame_size(&self) -> usize;
    fn check_frame_completed(&mut self, buf: &[u8], sync_name: &'static str) -> FrameCheck;
}

/// Result of feeding bytes to a [`FrameAssembler`].
pub enum FrameStep {
    /// More bytes are needed before a frame is complete.
    NeedMore,
    /// One complete, synced frame plus how many bytes were skipped finding
    /// it (0 after the first frame of a clean stream).
    Frame {
        sync_name: &'static str,
        sync_skipped: usize,
        frame: Vec<u8>,
    },
}

/// Drives a [`Framer`] over bytes supplied incrementally: scans for sync
/// magics, resizes the buffer as a format's completion check demands
/// (EDI's two-phase header/body read), and yields one frame at a time.
pub struct FrameAssembler<F: Framer> {
    framer: F,
    buf: Vec<u8>,
    filled: usize,
    sync_skipped: usize,
    synced_name: Option<&'static str>,
}

impl<F: Framer> FrameAssembler<F> {
    pub fn new(framer: F) -> Self {
        let size = framer.initial_frame_size();
        FrameAssembler {
            framer,
            buf: vec![0u8; size],
            filled: 0,
            sync_skipped: 0,
            synced_name: None,
        }
    }

    pub fn framer_mut(&mut self) -> &mut F {
        &mut self.framer
    }

    /// The currently-spare tail of the internal buffer; a source reader
    /// copies newly-read bytes here, then calls [`Self::fill`] with the
    /// count written.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Records that `n` bytes were just written into [`Self::spare_mut`]'s
    /// slice, and advances framing as far as the available bytes allow.
    pub fn fill(&mut self, n: usize) -> FrameStep {
        self.filled += n;
        if self.filled < self.buf.len() {
            return FrameStep::NeedMore;
        }

        let sync_name = match self.synced_name {
            Some(name) => name,
            None => match self.scan_sync() {
                Some(name) => name,
                None => return FrameStep::NeedMore,
            },
        };

        match self.framer.check_frame_completed(&self.buf[..self.filled], sync_name) {
            FrameCheck::Complete => {
                let next_size = self.framer.initial_frame_size();
                let frame = std::mem::replace(&mut self.buf, vec![0u8; next_size]);
                self.filled = 0;
                self.synced_name = None;
                let sync_skipped = std::mem::take(&mut self.sync_skipped);
                FrameStep::Frame { sync_name, sync_skipped, frame }
            }
            FrameCheck::Incomplete { new_size } => {
                self.buf.resize(new_size.max(self.filled), 0);
                self.synced_name = Some(sync_name);
                FrameStep::NeedMore
            }
        }
    }

    /// Scans `self.buf` (currently full) for the earliest offset at which
    /// any sync magic matches. On a match at a non-zero offset, slides the
    /// tail to the front and reports `NeedMore` (more bytes needed to
    /// refill); at offset 0, the buffer is synced and framing proceeds.
    fn scan_sync(&mut self) -> Option<&'static str> {
        let magics = self.framer.sync_magics();
        let max_len = magics.iter().map(SyncMagic::end).max().unwrap_or(1);

        if self.buf.len() < max_len {
            // Can never hold a full magic; drop everything and keep reading.
            self.sync_skipped += self.filled;
            self.filled = 0;
            return None;
        }

        let mut found: Option<(usize, &'static str)> = None;
        for offset in 0..=(self.buf.len() - max_len) {
            if let Some(sm) = magics.iter().find(|sm| sm.matches(&self.buf[offset..])) {
                found = Some((offset, sm.name));
                break;
            }
        }

        match found {
            None => {
                // Keep the trailing `max_len - 1` bytes: they may be the
                // start of the next magic once more bytes arrive.
                let keep = max_len - 1;
                let drop = self.buf.len() - keep;
                self.buf.copy_within(drop.., 0);
                self.sync_skipped += drop;
                self.filled = keep;
                None
            }
            Some((0, name)) => Some(name),
            Some((offset, _)) => {
                self.buf.copy_within(offset.., 0);
                self.filled -= offset;
                self.sync_skipped += offset;
                None
            }
        }
    }
}

/// Converts a frame count (at 24ms/frame) into an `HH:MM:SS` position
/// string, matching the reference implementation's timecode format.
pub fn ms_to_timecode(ms: u64) -> String {
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Accumulates frame/byte counts to produce `(fraction, "pos / total")`
/// progress ticks every ~500ms. `bytes_total == 0` (a non-seekable source,
/// e.g. a pipe) suppresses progress entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressEstimator {
    frames_count: u64,
    bytes_count: u64,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        ProgressEstimator::default()
    }

    pub fn record_frame(&mut self, frame_bytes: usize) {
        self.frames_count += 1;
        self.bytes_count += frame_bytes as u64;
    }

    pub fn frames_count(&self) -> u64 {
        self.frames_count
    }

    /// `None` when there's not yet enough data (no frames seen, or the
    /// source has no known total length).
    pub fn estimate(&self, bytes_total: u64) -> Option<(f64, String)> {
        if self.frames_count == 0 || bytes_total == 0 {
            return None;
        }
        let avg_frame_bytes = self.bytes_count as f64 / self.frames_count as f64;
        let bytes_left = bytes_total.saturating_sub(self.bytes_count) as f64;
        let frames_left = (bytes_left / avg_frame_bytes) as u64;
        let frames_total = self.frames_count + frames_left;

        let fraction = self.frames_count as f64 / frames_total as f64;
        let text = format!(
            "{} / {}",
            ms_to_timecode(self.frames_count * 24),
            ms_to_timecode(frames_total * 24)
        );
        Some((fraction, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::eti::{EtiFramer, ETI_FRAME_SIZE};

    #[test]
    fn assembler_reports_skipped_bytes_before_sync() {
        let mut asm = FrameAssembler::new(EtiFramer);
        let mut junk = vec![0u8; 5];
        junk.extend_from_slice(&[0xFF, 0x07, 0x3A, 0xB6]);
        junk.resize(5 + ETI_FRAME_SIZE, 0xAA);

        let mut total_written = 0;
        let mut step = FrameStep::NeedMore;
        while total_written < junk.len() {
            let spare = asm.spare_mut();
            let n = spare.len().min(junk.len() - total_written);
            spare[..n].copy_from_slice(&junk[total_written..total_written + n]);
            total_written += n;
            step = asm.fill(n);
            if matches!(step, FrameStep::Frame { .. }) {
                break;
            }
        }

        match step {
            FrameStep::Frame { sync_skipped, frame, .. } => {
                assert_eq!(sync_skipped, 5);
                assert_eq!(frame.len(), ETI_FRAME_SIZE);
            }
            FrameStep::NeedMore => panic!("expected a completed frame"),
        }
    }

    #[test]
    fn progress_suppressed_without_total() {
        let mut est = ProgressEstimator::new();
        est.record_frame(6144);
        assert!(est.estimate(0).is_none());
    }

    #[test]
    fn progress_fraction_between_zero_and_one() {
        let mut est = ProgressEstimator::new();
        est.record_frame(6144);
        est.record_frame(6144);
        let (fraction, _) = est.estimate(6144 * 10).unwrap();
        assert!(fraction > 0.0 && fraction < 1.0);
    }
}
