//! Error types for Trackpack

use thiserror::Error;

/// Errors that can occur while encoding, decoding, or segmenting a measurement
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format version: expected {expected}, found {found}")]
    UnsupportedFormatVersion { expected: u16, found: u16 },

    #[error("Unexpected end of stream while reading {0}")]
    TruncatedStream(&'static str),

    #[error("Unknown event type: {0}")]
    UnknownEventType(u8),

    #[error("Timestamp {0} ms is outside the supported range")]
    TimestampOutOfRange(i64),

    #[error("Invalid lifecycle events: {0}")]
    InvalidLifecycleEvents(String),

    #[error("No tracks recorded")]
    NoTracksRecorded,

    #[error("Location out of physical range: {0}")]
    LocationOutOfRange(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetaData(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
