//! Request DTOs for the HTTP interface.
//!
//! Form fields are all optional so that missing values reach the service
//! and are reported with the service's own messages.

use serde::Deserialize;

/// Query for the file listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesQuery {
    /// Category filter; absent or `all` lists everything, an unknown
    /// category lists nothing.
    #[serde(default)]
    pub cat: Option<String>,
}

/// Expiry change form.
#[derive(Debug, Default, Deserialize)]
pub struct ExpiryForm {
    #[serde(default)]
    pub expiry: Option<String>,
}

/// Storage limits form.
#[derive(Debug, Default, Deserialize)]
pub struct StorageSettingsForm {
    #[serde(default)]
    pub quota_size: Option<String>,
    #[serde(default)]
    pub quota_unit: Option<String>,
    #[serde(default)]
    pub file_size: Option<String>,
    #[serde(default)]
    pub file_unit: Option<String>,
}

/// Quota form.
#[derive(Debug, Default, Deserialize)]
pub struct QuotaForm {
    /// Quota in (decimal) GB.
    #[serde(default)]
    pub quota_gb: Option<String>,
}
