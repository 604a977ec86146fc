//! Generic source reader: a file, stdin, or (via [`live`]) a spawned
//! capture process's stdout, read on a dedicated thread and drained by the
//! main loop on a 100ms poll cadence so a "do regular work" callback can run
//! even while the source is idle.
//!
//! A non-blocking file descriptor plus a `select`/`poll` wait would give the
//! same guarantee; a reader thread feeding a bounded channel, drained with
//! `recv_timeout`, reaches the same "never block past one poll quantum"
//! behaviour without reaching for raw `fcntl`/`libc` access the rest of this
//! workspace has no other use for.

pub mod live;

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::error::{Error, Result};

/// One read() call's target size; matches one ETI(NI) frame so a channel
/// message usually carries exactly one frame's worth of bytes, though
/// callers must not assume chunk boundaries align with frame boundaries
/// (pipes and EDI sources won't).
const READ_CHUNK: usize = 6144;

/// The poll quantum bounding exit latency and "do regular work" cadence.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum ReadMsg {
    Data(Vec<u8>),
    Eof,
    Err(std::io::Error),
}

/// Outcome of one [`SourceReader::poll`] call.
pub enum PollEvent {
    /// Bytes arrived; hand them to the frame assembler.
    Data(Vec<u8>),
    /// End of stream (EOF, or a spawned process's stdout pipe closed).
    Eof,
    /// Nothing arrived within the poll quantum - a good time to run regular
    /// work (the GUI's date/time refresh, in the reference implementation).
    Idle,
}

/// Reads bytes from an underlying blocking [`Read`] on a dedicated thread,
/// handing them to the caller through a bounded channel drained on a 100ms
/// cadence.
pub struct SourceReader {
    rx: Receiver<ReadMsg>,
    exit: Arc<AtomicBool>,
    eof: bool,
    bytes_total: u64,
}

impl SourceReader {
    /// Wraps any blocking reader (a file, stdin, or a child process's
    /// stdout) with a reader thread. `bytes_total` is the known total size
    /// for progress reporting (0 when unknown, e.g. a pipe).
    pub fn new<R: Read + Send + 'static>(mut reader: R, bytes_total: u64) -> Self {
        let (tx, rx): (Sender<ReadMsg>, Receiver<ReadMsg>) = bounded(4);
        let exit = Arc::new(AtomicBool::new(false));
        let thread_exit = exit.clone();

        thread::Builder::new()
            .name("dablin-source-reader".into())
            .spawn(move || {
                let mut buf = vec![0u8; READ_CHUNK];
                loop {
                    if thread_exit.load(Ordering::Acquire) {
                        return;
                    }
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            let _ = tx.send(ReadMsg::Eof);
                            return;
                        }
                        Ok(n) => {
                            if tx.send(ReadMsg::Data(buf[..n].to_vec())).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(ReadMsg::Err(e));
                            return;
                        }
                    }
                }
            })
            .expect("failed to spawn source reader thread");

        SourceReader { rx, exit, eof: false, bytes_total }
    }

    /// Opens a regular, seekable file; its length becomes `bytes_total` for
    /// the progress estimator.
    pub fn open_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(Error::Io)?;
        let bytes_total = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self::new(file, bytes_total))
    }

    /// Reads from this process's standard input (length unknown).
    pub fn stdin() -> Self {
        Self::new(std::io::stdin(), 0)
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    /// Signals the reader thread to stop at its next read boundary. The
    /// thread may still be blocked inside the current `read()` call - exit
    /// only completes once that call returns (EOF, error, or new data then
    /// a dropped receiver), which is why the process/file must itself be
    /// capable of unblocking (e.g. closing stdin, or killing a child
    /// process) for a prompt shutdown.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    /// Waits up to [`POLL_INTERVAL`] for the next chunk of bytes, EOF, or a
    /// read error.
    pub fn poll(&mut self) -> Result<PollEvent> {
        if self.eof {
            return Ok(PollEvent::Eof);
        }
        match self.rx.recv_timeout(POLL_INTERVAL) {
            Ok(ReadMsg::Data(data)) => Ok(PollEvent::Data(data)),
            Ok(ReadMsg::Eof) => {
                self.eof = true;
                Ok(PollEvent::Eof)
            }
            Ok(ReadMsg::Err(e)) => Err(Error::Io(e)),
            Err(RecvTimeoutError::Timeout) => Ok(PollEvent::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                self.eof = true;
                Ok(PollEvent::Eof)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn yields_data_then_eof() {
        let mut sr = SourceReader::new(Cursor::new(vec![1, 2, 3, 4]), 4);
        loop {
            match sr.poll().unwrap() {
                PollEvent::Data(d) => {
                    assert_eq!(d, vec![1, 2, 3, 4]);
                }
                PollEvent::Eof => break,
                PollEvent::Idle => continue,
            }
        }
    }

    #[test]
    fn empty_source_is_immediate_eof() {
        let mut sr = SourceReader::new(Cursor::new(Vec::<u8>::new()), 0);
        loop {
            match sr.poll().unwrap() {
                PollEvent::Eof => break,
                PollEvent::Idle => continue,
                PollEvent::Data(_) => panic!("no data expected"),
            }
        }
    }
}
