//! Error types for LANSHARE.

use thiserror::Error;

/// Reasons an upload batch is refused for lack of capacity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// Usage is above the quota, so the service is download-only.
    #[error("uploads disabled (download-only mode)")]
    UploadsDisabled,

    /// One file in the batch is larger than the per-file limit.
    #[error("file '{name}' exceeds single-file limit ({size} > {limit} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// The batch as a whole does not fit into the remaining quota.
    #[error("storage quota exceeded ({used} used + {requested} requested > {quota} bytes)")]
    QuotaExceeded { used: u64, requested: u64, quota: u64 },
}

/// Common error type for LANSHARE.
#[derive(Error, Debug)]
pub enum LanshareError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Upload rejected before any disk write.
    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A record exists but its stored object is gone.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for LanshareError {
    fn from(e: sqlx::Error) -> Self {
        LanshareError::Database(e.to_string())
    }
}

/// Result type alias for LANSHARE operations.
pub type Result<T> = std::result::Result<T, LanshareError>;
