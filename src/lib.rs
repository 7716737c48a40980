//! LANSHARE - local network file sharing service
//!
//! Files uploaded over HTTP are kept in one flat directory under generated
//! names, tracked in SQLite, and reclaimed once their expiry passes.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Database, SettingKey, SettingsRepository};
pub use error::{CapacityError, LanshareError, Result};
pub use file::{
    Category, ExpiryChoice, FileRecord, FileRepository, FileService, FileStorage, SweepReport,
    Sweeper, UploadCandidate, UploadOutcome,
};
pub use web::WebServer;
