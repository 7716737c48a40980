//! Response DTOs for the HTTP interface.

use serde::Serialize;

use crate::file::{FileRecord, UploadOutcome};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Upload result.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Files saved.
    pub saved: usize,
    /// Why the batch stopped early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            saved: outcome.saved,
            failed: outcome.failed,
        }
    }
}

/// Expiry after a change.
#[derive(Debug, Serialize)]
pub struct ExpiryResponse {
    pub id: i64,
    pub is_forever: bool,
    pub expires_at: Option<String>,
}

impl From<FileRecord> for ExpiryResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            is_forever: record.is_forever,
            expires_at: record.expires_at,
        }
    }
}

/// Delete confirmation.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}
