//! Test helpers for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use lanshare::db::{SettingKey, SettingsRepository};
use lanshare::web::{create_app, AppState};
use lanshare::{Database, FileStorage};

/// A router over an in-memory database and a temporary storage directory.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub storage: FileStorage,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Create a new test app with default settings.
    pub async fn new() -> Self {
        let (router, db, storage, temp_dir) = build_router().await;
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Overwrite a numeric setting.
    pub async fn set(&self, key: SettingKey, value: u64) {
        SettingsRepository::new(self.db.pool())
            .set_u64(key, value)
            .await
            .expect("Failed to store setting");
    }

    /// Number of objects in the storage directory.
    pub fn stored_objects(&self) -> usize {
        std::fs::read_dir(self.storage.base_path())
            .expect("Failed to read storage dir")
            .count()
    }
}

/// Build the application router with fresh state.
pub async fn build_router() -> (Router, Arc<Database>, FileStorage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage =
        FileStorage::new(temp_dir.path().join("Temp")).expect("Failed to create storage");
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    SettingsRepository::new(db.pool())
        .seed_defaults(&Default::default())
        .await
        .expect("Failed to seed settings");

    let state = Arc::new(AppState::new(db.clone(), storage.clone()));
    let router = create_app(state, &[]);

    (router, db, storage, temp_dir)
}

/// Multipart form carrying the given files.
pub fn files_form(files: &[(&str, &[u8])]) -> MultipartForm {
    files.iter().fold(MultipartForm::new(), |form, (name, content)| {
        form.add_part(
            "files",
            Part::bytes(content.to_vec())
                .file_name(name.to_string())
                .mime_type("application/octet-stream"),
        )
    })
}
