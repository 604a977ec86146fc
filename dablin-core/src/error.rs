use thiserror::Error;

/// Transient/protocol errors raised while decoding a transport stream.
///
/// None of these are fatal: every call site that can produce one logs it and
/// drops the offending unit (frame, FIB, data group, MOT object) rather than
/// propagating it further.
#[derive(Debug, Error)]
pub enum Error {
    #[error("FIB CRC mismatch")]
    FibCrcMismatch,

    #[error("frame header CRC mismatch")]
    HeaderCrcMismatch,

    #[error("frame MST/body CRC mismatch")]
    BodyCrcMismatch,

    #[error("null transmission frame")]
    NullTransmission,

    #[error("frame ERR byte not 0xFF")]
    NotErrorFree,

    #[error("frame too short to hold its announced fields")]
    ShortFrame,

    #[error("unsupported EDI AF header (MAJ/MIN/PT mismatch)")]
    UnsupportedAfHeader,

    #[error("unsupported EDI TAG item: {0}")]
    UnsupportedEdiTag(String),

    #[error("selected sub-channel {0} absent from current frame")]
    SelectionMiss(u8),

    #[error("data group CRC mismatch")]
    DataGroupCrcMismatch,

    #[error("data subfield shorter than announced length")]
    ShortSubfield,

    #[error("data subfield longer than announced length")]
    LongSubfield,

    #[error("unsupported FIG extension {0}")]
    UnsupportedFig(u8),

    #[error("unknown character set {0}")]
    UnknownCharset(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
