//! Error types used across remora components.

use thiserror::Error;

/// A specialized `Result` type for remora operations.
pub type Result<T> = std::result::Result<T, RemoraError>;

/// The error type for remote-store, codec, and cache operations.
#[derive(Error, Debug)]
pub enum RemoraError {
    /// Missing or invalid configuration (unknown cluster, unrouted field).
    #[error("configuration error: {0}")]
    Config(String),

    /// A client lookup or service was used after it was closed.
    #[error("already closed: {0}")]
    AlreadyClosed(String),

    /// Internal consistency fault. Not recoverable by the caller.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A remote-store call failed. Never retried by this layer.
    #[error("remote store error: {0}")]
    Remote(String),

    /// Malformed on-disk metadata or stored values.
    #[error("corrupted data: {0}")]
    Corrupted(String),

    /// The remote-backed format does not model this feature.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An I/O error from the sidecar file or the wire.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoraError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RemoraError::Config(msg.into())
    }

    pub fn already_closed<S: Into<String>>(msg: S) -> Self {
        RemoraError::AlreadyClosed(msg.into())
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        RemoraError::Invariant(msg.into())
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        RemoraError::Remote(msg.into())
    }

    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        RemoraError::Corrupted(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        RemoraError::Unsupported(msg.into())
    }
}
