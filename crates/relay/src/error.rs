//! Relay error types.

use thiserror::Error;

use crate::subscriber::SubscriberId;

/// Relay error type.
///
/// A single subscriber's fault is isolated to that subscriber; no variant
/// here ever terminates the relay process.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A subscriber identity collided in the registry. Fatal to that
    /// registration attempt only.
    #[error("duplicate subscriber identity: {0}")]
    DuplicateIdentity(SubscriberId),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
