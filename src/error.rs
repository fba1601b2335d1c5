//! Error types for media-dl
//!
//! Item-level download failures are not errors: they are recorded as
//! [`DownloadStatus::Failed`](crate::types::DownloadStatus::Failed) in the result map.
//! The variants here describe structural failures that abort a whole batch run,
//! plus configuration problems.

use thiserror::Error;

use crate::types::ItemId;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent")
        key: Option<String>,
    },

    /// The same item identity appeared twice in one batch
    #[error("duplicate item in batch: {0}")]
    DuplicateItem(ItemId),

    /// A batch was started outside a tokio runtime, so no unit could be spawned
    #[error("no tokio runtime available to spawn download units")]
    NoRuntime,

    /// A unit of work panicked or was aborted before recording its item
    #[error("download unit for item {id} failed: {message}")]
    UnitFailed {
        /// The item whose unit failed
        id: ItemId,
        /// Panic or abort description
        message: String,
    },

    /// The collector finished with fewer entries than input items
    #[error("incomplete batch: expected {expected} results, recorded {recorded}")]
    IncompleteBatch {
        /// Number of input items
        expected: usize,
        /// Number of entries actually recorded
        recorded: usize,
    },

    /// Shutdown in progress - not accepting new batches
    #[error("shutdown in progress: not accepting new batches")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::DuplicateItem(_) => "duplicate_item",
            Error::NoRuntime => "no_runtime",
            Error::UnitFailed { .. } => "unit_failed",
            Error::IncompleteBatch { .. } => "incomplete_batch",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error was caused by the caller's input rather than the run itself
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::DuplicateItem(_) | Error::Serialization(_)
        )
    }
}
