//! Physical file storage for LANSHARE.
//!
//! All objects live directly in one flat directory and are addressed only by
//! their generated stored name:
//! ```text
//! {base_path}/
//! ├── 3f2a9c0d5e8b4a17b6c1d2e3f4a5b6c7.pdf
//! ├── 9b1e4d7c2a6f40e3a8d5c7b9e1f3a2d4.mp4
//! ├── .upload-5c0e...part      (upload still being received)
//! └── ...
//! ```
//!
//! Uploads are streamed into a staging object first and only moved under
//! their stored name once the whole batch has been admitted.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::{LanshareError, Result};

/// Name prefix of upload objects still being received.
const STAGING_PREFIX: &str = ".upload-";

/// Result of a best-effort removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The object was deleted.
    Removed,
    /// Nothing was there.
    AlreadyAbsent,
    /// Removal failed; the error was logged and swallowed.
    Failed,
}

/// An upload being written to a staging object.
#[derive(Debug)]
pub struct StagingFile {
    name: String,
    file: fs::File,
    size: u64,
}

impl StagingFile {
    /// Append a chunk.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A fully received upload waiting to be committed under its stored name.
#[derive(Debug)]
pub struct StagedObject {
    name: String,
    size: u64,
}

impl StagedObject {
    /// Staging object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Flat-directory storage for uploaded objects.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Full path for a stored name.
    ///
    /// Stored names are generated plain filenames; anything containing a path
    /// separator or a parent reference is rejected.
    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        if stored_name.is_empty()
            || stored_name == "."
            || stored_name == ".."
            || stored_name.contains(['/', '\\', '\0'])
        {
            return Err(LanshareError::Validation(format!(
                "invalid stored name: {stored_name:?}"
            )));
        }
        Ok(self.base_path.join(stored_name))
    }

    /// Start writing an upload to a fresh staging object.
    pub async fn begin_staging(&self) -> Result<StagingFile> {
        let name = format!("{STAGING_PREFIX}{}.part", Uuid::new_v4().simple());
        let path = self.path_for(&name)?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok(StagingFile {
            name,
            file,
            size: 0,
        })
    }

    /// Flush a staging object to disk.
    ///
    /// On failure the staging object is removed.
    pub async fn finish_staging(&self, mut staging: StagingFile) -> Result<StagedObject> {
        let synced = async {
            staging.file.flush().await?;
            staging.file.sync_all().await
        }
        .await;

        match synced {
            Ok(()) => Ok(StagedObject {
                name: staging.name,
                size: staging.size,
            }),
            Err(e) => {
                self.abort_staging(staging).await;
                Err(e.into())
            }
        }
    }

    /// Drop a staging object that will not be finished.
    pub async fn abort_staging(&self, staging: StagingFile) {
        let StagingFile { name, file, .. } = staging;
        drop(file);
        self.remove_best_effort(&name).await;
    }

    /// Stage in-memory content in one go.
    pub async fn stage(&self, content: &[u8]) -> Result<StagedObject> {
        let mut staging = self.begin_staging().await?;
        if let Err(e) = staging.write_chunk(content).await {
            self.abort_staging(staging).await;
            return Err(e);
        }
        self.finish_staging(staging).await
    }

    /// Move a staged object to `stored_name` and return the size on disk.
    ///
    /// Refuses to replace an existing object. The staged object is left in
    /// place when the move fails.
    pub async fn commit(&self, staged: &StagedObject, stored_name: &str) -> Result<u64> {
        let from = self.path_for(&staged.name)?;
        let to = self.path_for(stored_name)?;

        if fs::try_exists(&to).await? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("stored object {stored_name} already exists"),
            )
            .into());
        }
        fs::rename(&from, &to).await?;

        self.file_size(stored_name).await
    }

    /// Remove a staged object that was not committed.
    pub async fn discard(&self, staged: &StagedObject) {
        self.remove_best_effort(&staged.name).await;
    }

    /// Remove staging objects left behind by an interrupted run.
    ///
    /// Returns how many were removed.
    pub fn purge_staging(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name();
            let is_staging = name
                .to_str()
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            if !is_staging {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "Failed to remove staging object"
                ),
            }
        }
        Ok(removed)
    }

    /// Open a stored object for reading.
    ///
    /// A missing object is reported as `NotFound`.
    pub async fn open(&self, stored_name: &str) -> Result<fs::File> {
        let path = self.path_for(stored_name)?;

        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LanshareError::NotFound(format!("stored object {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Size of a stored object in bytes.
    pub async fn file_size(&self, stored_name: &str) -> Result<u64> {
        let path = self.path_for(stored_name)?;

        match fs::metadata(&path).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LanshareError::NotFound(format!("stored object {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a stored object exists.
    pub async fn exists(&self, stored_name: &str) -> bool {
        match self.path_for(stored_name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove a stored object, never failing.
    ///
    /// An absent object counts as success. Any other error is logged and
    /// reported as `Failed` so callers can go on to remove the record.
    pub async fn remove_best_effort(&self, stored_name: &str) -> RemoveOutcome {
        let path = match self.path_for(stored_name) {
            Ok(path) => path,
            Err(e) => {
                warn!(stored_name, error = %e, "Refusing to remove stored object");
                return RemoveOutcome::Failed;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => RemoveOutcome::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => RemoveOutcome::AlreadyAbsent,
            Err(e) => {
                warn!(stored_name, error = %e, "Failed to remove stored object");
                RemoveOutcome::Failed
            }
        }
    }
}
