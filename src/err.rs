use crate::asn1::BufferType;

use thiserror::Error;

pub type DerResult<T> = std::result::Result<T, DerError>;
pub type Result<T> = std::result::Result<T, ReceiptError>;

/// Errors raised while walking raw DER bytes.
///
/// These are produced by the TLV primitives, the token stream and the attribute set
/// processor, and are propagated unchanged by every component above them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerError {
    #[error("reached end of input while reading {what}")]
    ReachedEof { what: &'static str },

    #[error("malformed DER at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("invalid length encoding: {reason}")]
    InvalidLength { reason: &'static str },

    #[error("invalid buffer size {found} for {buffer_type:?}")]
    InvalidBufferSize {
        found: usize,
        buffer_type: BufferType,
    },

    #[error("buffer of type {buffer_type:?} has no supported value conversion")]
    UnsupportedBuffer { buffer_type: BufferType },

    #[error("integer with {significant_bytes} significant bytes does not fit in 63 bits")]
    IntegerOverflow { significant_bytes: usize },
}

/// Errors returned to callers of the receipt decoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("PKCS7 container does not hold a `data` content payload")]
    MalformedContainer,

    #[error(transparent)]
    Der(#[from] DerError),
}

impl ReceiptError {
    /// `true` when the input never looked like a PKCS7 receipt at all.
    ///
    /// Callers typically respond to this by fetching the receipt again, while any other error
    /// means the receipt is structurally unreadable.
    pub fn is_missing_content(&self) -> bool {
        matches!(
            self,
            ReceiptError::MalformedContainer | ReceiptError::Der(DerError::ReachedEof { .. })
        )
    }
}
