//! Error types for the lease recorder
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are never
//! recovered locally: they propagate to the caller, which for the hook binary
//! means a diagnostic and a non-zero exit.

use thiserror::Error;

/// Result type alias for lease recorder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the lease recorder
#[derive(Error, Debug)]
pub enum Error {
    /// The backing store could not be reached (transport failure, server-side outage)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store was reachable but refused the operation
    #[error("Store rejected request: {0}")]
    StoreRejected(String),

    /// Key absent on a `get`
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored value does not decode to a valid lease record
    #[error("Decode error: {0}")]
    Decode(String),

    /// Lease record could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors (file backend, dump output)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a store-unavailable error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a store-rejected error
    pub fn store_rejected(msg: impl Into<String>) -> Self {
        Self::StoreRejected(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
