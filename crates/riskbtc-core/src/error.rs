use std::time::Duration;

/// Top-level error for the assessment engine.
///
/// Only `InvalidAddress` and `InvalidConfig` ever reach a caller as a hard
/// failure. `DataUnavailable` and `MalformedSnapshot` are recovered inside
/// the orchestrator through the fallback scoring paths.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] DataSourceError),

    #[error("malformed address snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error should be handled by the "data unavailable"
    /// fallback paths rather than surfaced.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_) | Self::MalformedSnapshot(_))
    }
}

/// Failures talking to the blockchain data provider.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by data source")]
    RateLimited,

    #[error("data source returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Why a byte sequence could not be decoded as a DER-style ECDSA signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSignature {
    #[error("signature truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("length {declared} at offset {offset} exceeds remaining {available} bytes")]
    LengthOverflow {
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("expected sequence tag 0x30, found {found:#04x}")]
    MissingSequenceTag { found: u8 },

    #[error("expected integer tag 0x02 at offset {offset}, found {found:#04x}")]
    MissingIntegerTag { offset: usize, found: u8 },

    #[error("zero-length integer at offset {offset}")]
    EmptyInteger { offset: usize },
}
