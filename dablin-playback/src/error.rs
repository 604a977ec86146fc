use thiserror::Error;

/// Playback-layer errors: everything that can stop the audio pump or a
/// source reader outright, as opposed to `dablin_core::Error`'s transient
/// per-unit decode failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn live source process: {0}")]
    SpawnFailed(String),

    #[error("codec initialisation failed: {0}")]
    CodecInit(String),

    #[error("audio device initialisation failed: {0}")]
    DeviceInit(String),

    #[error("unknown channel block {0:?}")]
    UnknownChannel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
