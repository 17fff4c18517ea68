//! Error types for the retrieval pipeline.

use std::path::PathBuf;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for ingestion and retrieval.
///
/// Configuration and argument errors are programming/operator mistakes and
/// are surfaced immediately, never coerced. `EmbeddingService` carries a
/// `transient` flag so callers can distinguish a retryable outage from a
/// permanent auth/config failure. Index load errors are fatal at startup:
/// a serving process must refuse queries rather than answer ungrounded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration (bad chunk sizes, bad dimensions, unknown provider).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid call argument (e.g. `k < 1`, blank question).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A vector's dimension does not match the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No persisted index exists at the given location.
    #[error("Index not found at {}", path.display())]
    IndexNotFound { path: PathBuf },

    /// Persisted index data is unreadable or internally inconsistent.
    #[error("Index corrupt: {reason}")]
    IndexCorrupt { reason: String },

    /// The embedding service call failed.
    #[error("Embedding service error{}: {message}", if *transient { " (transient)" } else { "" })]
    EmbeddingService { message: String, transient: bool },

    /// Filesystem I/O failure.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Shorthand for a transient embedding failure (worth retrying).
    pub fn embedding_transient(message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            message: message.into(),
            transient: true,
        }
    }

    /// Shorthand for a permanent embedding failure (auth/config).
    pub fn embedding_permanent(message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            message: message.into(),
            transient: false,
        }
    }

    /// True if the failure is worth retrying at a live-traffic call site.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingService { transient: true, .. })
    }
}
