//! Error types for the proximity scanner.

use thiserror::Error;

use super::types::RadioUnavailable;
use crate::identity::Unauthenticated;

/// Errors that can occur while controlling the scanner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScannerError {
    /// No logged-in identity.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Radio hardware or permission is missing. Not retried automatically.
    #[error("Radio unavailable: {0}")]
    Unavailable(RadioUnavailable),
}

/// Result type for scanner operations.
pub type ScannerResult<T> = std::result::Result<T, ScannerError>;

impl From<Unauthenticated> for ScannerError {
    fn from(_: Unauthenticated) -> Self {
        Self::Unauthenticated
    }
}
