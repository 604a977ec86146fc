//! Protocol- and decode-layer primitives for DAB/DAB+ reception: transport
//! framing (ETI/EDI), the FIC ensemble/service catalog, PAD (Dynamic Label,
//! MOT slideshow), and the small building blocks (CRC, character sets, a
//! byte ring buffer, the European DAB channel table) they're built from.
//!
//! This crate performs no I/O; [`transport`] consumes bytes already read
//! from somewhere and hands decoded frames/FIC/PAD to observer traits.

pub mod channels;
pub mod charset;
pub mod crc;
pub mod error;
pub mod fic;
pub mod mot;
pub mod pad;
pub mod ring_buffer;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use ring_buffer::RingBuffer;
