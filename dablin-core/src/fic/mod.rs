//! Fast Information Channel decoding: FIB/FIG parsing and the resulting
//! ensemble/service catalog.

mod decoder;
mod tables;

pub use decoder::{
    convert_date_time_to_string, convert_label_to_utf8, derive_short_label_utf8, FicDecoder,
    FicDecoderObserver,
};
pub use tables::{asu_type_name, inter_table_name, language_name, lto_to_string, pty_name};
