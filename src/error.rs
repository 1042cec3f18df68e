//! Error types for xlang-wire.

use thiserror::Error;

/// Header modes this engine refuses to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// Little-endian flag is clear.
    #[error("big endian is not supported")]
    BigEndian,
    /// Cross-language flag is clear (single-runtime payload).
    #[error("only cross-language payloads are supported")]
    NotCrossLanguage,
    /// Out-of-band flag is set.
    #[error("out-of-band payloads are not supported")]
    OutOfBand,
}

/// Main error type for all serialization operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// A write was started while a volatile view is still outstanding.
    #[error("Ownership violation: a volatile view must be released before the buffer is reused")]
    OwnershipViolation,

    /// Header declares a mode that cannot be decoded.
    #[error("Protocol error: {0}")]
    Protocol(ProtocolViolation),

    /// Failure reported by a codec (type mismatch, malformed data).
    #[error("Codec error: {0}")]
    Codec(String),

    /// A read needed more bytes than the input holds.
    #[error("Buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    /// Type id read from the wire is not in the class table.
    #[error("Unknown type id: {0}")]
    UnknownTypeId(u32),

    /// No codec registered for the given tag.
    #[error("Unknown type tag: {0}")]
    UnknownTag(String),

    /// Back-reference to an id never assigned in this pass.
    #[error("Invalid reference id: {0}")]
    InvalidReference(u32),

    /// Tag already registered with a different description.
    #[error("Tag already registered with a different description: {0}")]
    TagConflict(String),

    /// JSON schema bundle error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack schema bundle encode error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack schema bundle decode error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl From<ProtocolViolation> for WireError {
    fn from(violation: ProtocolViolation) -> Self {
        WireError::Protocol(violation)
    }
}

impl WireError {
    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        WireError::Codec(msg.into())
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
