//! HTTP handlers for LANSHARE.

pub mod file;
pub mod settings;

pub use file::*;
pub use settings::*;

use std::sync::Arc;

use crate::db::Database;
use crate::file::{FileService, FileStorage};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metadata store.
    pub db: Arc<Database>,
    /// Stored object directory.
    pub storage: FileStorage,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, storage: FileStorage) -> Self {
        Self { db, storage }
    }

    /// File service bound to this state.
    pub fn file_service(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage)
    }
}
