//! Shared error type for the external store interfaces.
//!
//! The identity, location and conversation stores are narrow keyed
//! interfaces. Their failures are reported as [`StoreError`] and converted
//! at the module boundary so callers never see a raw database error.

use thiserror::Error;

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection lock was poisoned.
    #[error("Storage lock error: {0}")]
    Lock(String),

    /// Stored data could not be decoded.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The backing store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Acquires a `SQLite` connection guard, mapping poisoning to [`StoreError::Lock`].
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> StoreResult<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StoreError::Lock(format!("Failed to acquire database lock: {e}")))
}
