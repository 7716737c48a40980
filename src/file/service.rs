//! File service for LANSHARE.
//!
//! This module provides the high-level operations:
//! - Batch upload with quota admission
//! - Download with counting
//! - Listing, expiry changes and deletion
//! - Storage settings administration

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, warn};

use crate::db::{Database, SettingKey, SettingsRepository};
use crate::{LanshareError, Result};

use super::expiry::{normalise_expiry_choice, sweep_expired, ExpiryChoice, SweepReport};
use super::metadata::{FileRecord, FileRepository, FileUpdate, NewFileRecord};
use super::naming::{
    classify, extension_of, generate_stored_name, guess_mime, sanitize, Category, FALLBACK_NAME,
};
use super::quota::{parse_size, quota_from_gb, QuotaAccountant};
use super::storage::{FileStorage, StagedObject};

/// One file of an upload batch, already received into staging.
#[derive(Debug)]
pub struct UploadCandidate {
    /// Filename supplied by the client, if any.
    pub filename: Option<String>,
    /// Received content.
    pub staged: StagedObject,
}

impl UploadCandidate {
    /// Create a new upload candidate.
    pub fn new(filename: Option<String>, staged: StagedObject) -> Self {
        Self { filename, staged }
    }

    /// Display name, defaulting to `file` when missing or blank.
    pub fn display_name(&self) -> &str {
        match self.filename.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => FALLBACK_NAME,
        }
    }
}

/// Result of an admitted upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Files written and recorded.
    pub saved: usize,
    /// Why the batch stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

/// Listing with the usage summary.
#[derive(Debug, Clone, Serialize)]
pub struct FileListing {
    pub files: Vec<FileRecord>,
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub can_upload: bool,
}

/// Result of a file download.
#[derive(Debug)]
pub struct Download {
    /// Record after the download was counted.
    pub record: FileRecord,
    /// Open handle to the stored object.
    pub file: fs::File,
    /// Size on disk in bytes.
    pub size: u64,
}

/// Current storage limits and usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageSettings {
    pub quota_bytes: u64,
    pub max_file_bytes: u64,
    pub used_bytes: u64,
    pub can_upload: bool,
}

/// Limits after an update through [`FileService::update_storage_settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageLimits {
    pub quota_bytes: u64,
    pub max_file_bytes: u64,
    pub can_upload: bool,
}

/// Usage after a quota change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub can_upload: bool,
}

fn required<'v>(value: Option<&'v str>, field: &str) -> Result<&'v str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LanshareError::Validation(format!("missing {field}"))),
    }
}

/// File service for uploads, downloads and administration.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    fn settings(&self) -> SettingsRepository<'_> {
        SettingsRepository::new(self.db.pool())
    }

    fn quota(&self) -> QuotaAccountant<'_> {
        QuotaAccountant::new(self.db)
    }

    async fn sweep(&self) -> Result<SweepReport> {
        sweep_expired(self.db, self.storage, Utc::now()).await
    }

    /// List files, newest first, with the current usage.
    ///
    /// `filter` is a category name; absent, blank or `all` lists everything.
    /// A name that matches no category lists nothing.
    pub async fn list_files(&self, filter: Option<&str>) -> Result<FileListing> {
        self.sweep().await?;

        let files = match filter.map(str::trim) {
            None | Some("") | Some("all") => self.files().list(None).await?,
            Some(name) => match name.parse::<Category>() {
                Ok(category) => self.files().list(Some(category)).await?,
                Err(_) => Vec::new(),
            },
        };
        let quota = self.quota();
        let used_bytes = quota.current_used().await?;
        let quota_bytes = quota.quota_bytes().await?;

        Ok(FileListing {
            files,
            used_bytes,
            quota_bytes,
            can_upload: used_bytes <= quota_bytes,
        })
    }

    /// Upload a batch of files.
    ///
    /// The batch is admitted or rejected as a whole before anything is
    /// stored. Once admitted, files are stored in order; a failure stops the
    /// batch, keeps the files already saved and is reported in the outcome.
    /// Staged content that was not stored is discarded either way.
    pub async fn upload_batch(
        &self,
        candidates: Vec<UploadCandidate>,
        expiry: Option<&str>,
    ) -> Result<UploadOutcome> {
        let result = self.store_batch(&candidates, expiry).await;

        for candidate in &candidates {
            self.storage.discard(&candidate.staged).await;
        }

        result
    }

    async fn store_batch(
        &self,
        candidates: &[UploadCandidate],
        expiry: Option<&str>,
    ) -> Result<UploadOutcome> {
        self.sweep().await?;

        let quota = self.quota();
        quota.ensure_uploads_enabled().await?;

        let choice = match expiry {
            Some(raw) if !raw.trim().is_empty() => raw.parse::<ExpiryChoice>()?,
            _ => ExpiryChoice::default(),
        };
        let (is_forever, expires_at) = normalise_expiry_choice(choice, Utc::now());

        if candidates.is_empty() {
            return Err(LanshareError::Validation("no files uploaded".to_string()));
        }

        let sizes: Vec<(&str, u64)> = candidates
            .iter()
            .map(|c| (c.display_name(), c.staged.size()))
            .collect();
        quota.admit_batch(&sizes).await?;

        let mut saved = 0;
        for candidate in candidates {
            let orig_name = candidate.display_name();
            let ext = extension_of(orig_name);
            let stored_name = generate_stored_name(orig_name);
            let mime = guess_mime(&sanitize(orig_name));
            let category = classify(&ext);

            let size = match self.storage.commit(&candidate.staged, &stored_name).await {
                Ok(size) => size,
                Err(e) => {
                    error!(orig_name, stored_name = %stored_name, error = %e, "Failed to store upload");
                    self.storage.remove_best_effort(&stored_name).await;
                    return Ok(UploadOutcome {
                        saved,
                        failed: Some(format!("failed to store '{orig_name}': {e}")),
                    });
                }
            };

            let record = NewFileRecord {
                orig_name: orig_name.to_string(),
                stored_name: stored_name.clone(),
                ext,
                mime,
                category,
                size_bytes: size as i64,
                uploaded_at: Utc::now(),
                expires_at,
                is_forever,
            };

            match self.files().insert(&record).await {
                Ok(created) => {
                    info!(
                        file_id = created.id,
                        stored_name = %stored_name,
                        size,
                        "File uploaded"
                    );
                    saved += 1;
                }
                Err(e) => {
                    error!(orig_name, stored_name = %stored_name, error = %e, "Failed to record upload");
                    self.storage.remove_best_effort(&stored_name).await;
                    return Ok(UploadOutcome {
                        saved,
                        failed: Some(format!("failed to record '{orig_name}': {e}")),
                    });
                }
            }
        }

        Ok(UploadOutcome {
            saved,
            failed: None,
        })
    }

    /// Open a file for download and count the download.
    ///
    /// A record whose stored object is missing is a consistency error; the
    /// record is left in place.
    pub async fn download(&self, id: i64) -> Result<Download> {
        self.sweep().await?;

        let record = self
            .files()
            .get(id)
            .await?
            .ok_or_else(|| LanshareError::NotFound(format!("file {id}")))?;

        let file = match self.storage.open(&record.stored_name).await {
            Ok(file) => file,
            Err(LanshareError::NotFound(_)) => {
                error!(
                    file_id = id,
                    stored_name = %record.stored_name,
                    "Stored object missing for live record"
                );
                return Err(LanshareError::Consistency(format!(
                    "stored object for file {id} is missing"
                )));
            }
            Err(e) => return Err(e),
        };
        let size = file.metadata().await?.len();

        self.files().increment_downloads(id).await?;
        let record = FileRecord {
            downloads: record.downloads + 1,
            ..record
        };

        Ok(Download { record, file, size })
    }

    /// Change how long a file is kept.
    pub async fn set_expiry(&self, id: i64, choice: Option<&str>) -> Result<FileRecord> {
        let raw = choice
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LanshareError::Validation("missing expiry".to_string()))?;
        let choice: ExpiryChoice = raw.parse()?;
        let (is_forever, expires_at) = normalise_expiry_choice(choice, Utc::now());

        let update = FileUpdate::new()
            .is_forever(is_forever)
            .expires_at(expires_at);
        let repo = self.files();
        if !repo.update_fields(id, &update).await? {
            return Err(LanshareError::NotFound(format!("file {id}")));
        }

        repo.get(id)
            .await?
            .ok_or_else(|| LanshareError::NotFound(format!("file {id}")))
    }

    /// Delete a file and its stored object.
    ///
    /// Failure to remove the stored object is logged; the record is removed
    /// regardless.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.sweep().await?;

        let repo = self.files();
        let record = repo
            .get(id)
            .await?
            .ok_or_else(|| LanshareError::NotFound(format!("file {id}")))?;

        self.storage.remove_best_effort(&record.stored_name).await;
        if !repo.delete(id).await? {
            warn!(file_id = id, "File record already removed");
        }

        info!(file_id = id, stored_name = %record.stored_name, "File deleted");
        Ok(())
    }

    /// Current limits and usage.
    pub async fn storage_settings(&self) -> Result<StorageSettings> {
        let settings = self.settings();
        let quota_bytes = settings.quota_bytes().await?;
        let max_file_bytes = settings.max_file_bytes().await?;
        let used_bytes = self.quota().current_used().await?;

        Ok(StorageSettings {
            quota_bytes,
            max_file_bytes,
            used_bytes,
            can_upload: used_bytes <= quota_bytes,
        })
    }

    /// Set the quota and the single-file limit from amounts with units.
    ///
    /// All four values are required and both results must be positive.
    pub async fn update_storage_settings(
        &self,
        quota_size: Option<&str>,
        quota_unit: Option<&str>,
        file_size: Option<&str>,
        file_unit: Option<&str>,
    ) -> Result<StorageLimits> {
        let quota_size = required(quota_size, "quota_size")?;
        let quota_unit = required(quota_unit, "quota_unit")?;
        let file_size = required(file_size, "file_size")?;
        let file_unit = required(file_unit, "file_unit")?;

        let quota_bytes = parse_size(quota_size, quota_unit)?;
        let max_file_bytes = parse_size(file_size, file_unit)?;
        if quota_bytes == 0 || max_file_bytes == 0 {
            return Err(LanshareError::Validation(
                "sizes must be greater than 0".to_string(),
            ));
        }

        let settings = self.settings();
        settings
            .set_u64(SettingKey::QuotaBytes, quota_bytes)
            .await?;
        settings
            .set_u64(SettingKey::MaxFileBytes, max_file_bytes)
            .await?;
        info!(quota_bytes, max_file_bytes, "Storage settings updated");

        Ok(StorageLimits {
            quota_bytes,
            max_file_bytes,
            can_upload: self.quota().can_accept_uploads().await?,
        })
    }

    /// Set the quota from a decimal GB amount.
    pub async fn set_quota(&self, quota_gb: Option<&str>) -> Result<QuotaStatus> {
        let quota_gb = required(quota_gb, "quota_gb")?;
        let quota_bytes = quota_from_gb(quota_gb)?;

        self.settings()
            .set_u64(SettingKey::QuotaBytes, quota_bytes)
            .await?;
        info!(quota_bytes, "Quota updated");

        let used_bytes = self.quota().current_used().await?;
        Ok(QuotaStatus {
            used_bytes,
            quota_bytes,
            can_upload: used_bytes <= quota_bytes,
        })
    }

    /// Run a sweep now.
    pub async fn manual_sweep(&self) -> Result<SweepReport> {
        self.sweep().await
    }
}
