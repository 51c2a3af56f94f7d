//! Error types for snapshot decoding.

use thiserror::Error;

/// Errors that can occur while decoding a snapshot buffer.
///
/// None of these are retryable: the same bytes will always fail the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u8),

    #[error("Truncated header for version {version}: need {expected} bytes, got {actual}")]
    TruncatedHeader {
        version: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Truncated pixel payload: need {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
}

impl DecodeError {
    /// Short machine-friendly name of the failure, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedVersion(_) => "unsupported-version",
            DecodeError::TruncatedHeader { .. } => "truncated-header",
            DecodeError::TruncatedPayload { .. } => "truncated-payload",
            DecodeError::InvalidDimensions { .. } => "invalid-dimensions",
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
