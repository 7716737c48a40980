//! File sharing module for LANSHARE.
//!
//! This module provides:
//! - File record metadata and storage
//! - Naming and classification of uploads
//! - Quota accounting
//! - Expiry and background sweeping
//! - The upload/download service

mod expiry;
mod metadata;
mod naming;
mod quota;
mod service;
mod storage;

pub use expiry::{
    normalise_expiry_choice, spawn_sweeper, sweep_expired, ExpiryChoice, SweepReport, Sweeper,
    EXPIRY_DAY_CHOICES,
};
pub use metadata::{FileRecord, FileRepository, FileUpdate, NewFileRecord};
pub use naming::{
    classify, extension_of, generate_stored_name, guess_mime, sanitize, Category, FALLBACK_NAME,
};
pub use quota::{parse_size, quota_from_gb, QuotaAccountant, SizeUnit};
pub use service::{
    Download, FileListing, FileService, QuotaStatus, StorageLimits, StorageSettings,
    UploadCandidate, UploadOutcome,
};
pub use storage::{FileStorage, RemoveOutcome, StagedObject, StagingFile};
