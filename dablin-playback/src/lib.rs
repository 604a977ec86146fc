//! Playback-layer runtime on top of `dablin-core`'s pure decode logic:
//! codec adapters ([`mp2`], [`superframe`]) that turn raw sub-channel bytes
//! into PCM + PAD, the [`ensemble_player`] audio pump that paces and routes
//! them, pluggable [`AudioOutput`](audio_output::AudioOutput) sinks, and
//! [`source`] readers that bring bytes in from a file, stdin, or a spawned
//! capture process.

pub mod audio_output;
pub mod cpal_output;
pub mod ensemble_player;
pub mod error;
pub mod mp2;
pub mod pcm_output;
pub mod source;
pub mod subchannel_sink;
pub mod superframe;
pub mod wav_output;

pub use error::{Error, Result};
