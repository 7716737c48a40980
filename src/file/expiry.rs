//! Expiry handling and the background sweeper.
//!
//! A record is reclaimed once `expires_at <= now` unless it is marked
//! forever. Reclaiming removes the stored object (best effort) and then the
//! record. Sweeping is idempotent and safe to run concurrently with deletes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::{Database, SettingsRepository, DEFAULT_CLEANUP_INTERVAL_SECONDS};
use crate::{LanshareError, Result};

use super::metadata::FileRepository;
use super::storage::{FileStorage, RemoveOutcome};

/// Day counts offered for expiry.
pub const EXPIRY_DAY_CHOICES: [u32; 5] = [1, 3, 7, 15, 30];

/// Shortest pause between background sweeps.
const MIN_SWEEP_INTERVAL_SECS: u64 = 1;

/// How long an upload is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryChoice {
    /// Expire after this many days.
    Days(u32),
    /// Never expire.
    Forever,
}

impl Default for ExpiryChoice {
    fn default() -> Self {
        ExpiryChoice::Days(7)
    }
}

impl fmt::Display for ExpiryChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryChoice::Days(days) => write!(f, "{days}"),
            ExpiryChoice::Forever => f.write_str("forever"),
        }
    }
}

impl FromStr for ExpiryChoice {
    type Err = LanshareError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "forever" {
            return Ok(ExpiryChoice::Forever);
        }
        match s.parse::<u32>() {
            Ok(days) if EXPIRY_DAY_CHOICES.contains(&days) && !s.starts_with('+') => {
                Ok(ExpiryChoice::Days(days))
            }
            _ => Err(LanshareError::Validation(format!(
                "invalid expiry choice: {s:?}"
            ))),
        }
    }
}

/// Resolve a choice into `(is_forever, expires_at)` relative to `now`.
pub fn normalise_expiry_choice(
    choice: ExpiryChoice,
    now: DateTime<Utc>,
) -> (bool, Option<DateTime<Utc>>) {
    match choice {
        ExpiryChoice::Forever => (true, None),
        ExpiryChoice::Days(days) => (false, Some(now + Duration::days(i64::from(days)))),
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired records removed.
    pub reclaimed: u64,
    /// Stored objects that could not be removed.
    pub disk_failures: u64,
    /// Expired records that could not be removed; retried on the next sweep.
    pub record_failures: u64,
}

/// Reclaim every record expired at `now`.
pub async fn sweep_expired(
    db: &Database,
    storage: &FileStorage,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let repo = FileRepository::new(db.pool());
    let expired = repo.list_expired(now).await?;
    let mut report = SweepReport::default();

    for record in expired {
        if storage.remove_best_effort(&record.stored_name).await == RemoveOutcome::Failed {
            report.disk_failures += 1;
        }
        // Gone already means a concurrent delete won
        match repo.delete(record.id).await {
            Ok(_) => {
                report.reclaimed += 1;
                debug!(
                    file_id = record.id,
                    stored_name = %record.stored_name,
                    "Reclaimed expired file"
                );
            }
            Err(e) => {
                report.record_failures += 1;
                warn!(file_id = record.id, error = %e, "Failed to remove expired record");
            }
        }
    }

    if report.reclaimed > 0 || report.record_failures > 0 {
        info!(
            reclaimed = report.reclaimed,
            disk_failures = report.disk_failures,
            record_failures = report.record_failures,
            "Expired files swept"
        );
    }

    Ok(report)
}

/// Owns what a sweep needs so it can run as a background task.
#[derive(Debug, Clone)]
pub struct Sweeper {
    db: Arc<Database>,
    storage: FileStorage,
}

impl Sweeper {
    /// Create a new Sweeper.
    pub fn new(db: Arc<Database>, storage: FileStorage) -> Self {
        Self { db, storage }
    }

    /// Reclaim records expired at `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        sweep_expired(&self.db, &self.storage, now).await
    }

    /// Reclaim records expired as of the current time.
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Pause before the next sweep, read fresh from settings.
    async fn next_interval(&self) -> std::time::Duration {
        let secs = match SettingsRepository::new(self.db.pool())
            .cleanup_interval_seconds()
            .await
        {
            Ok(secs) => secs,
            Err(e) => {
                warn!("Failed to read cleanup interval, using default: {}", e);
                DEFAULT_CLEANUP_INTERVAL_SECONDS
            }
        };
        std::time::Duration::from_secs(secs.max(MIN_SWEEP_INTERVAL_SECS))
    }

    /// Sweep forever. A failed sweep is logged and the next one still runs.
    pub async fn run(&self) {
        info!("Expiry sweeper started");

        loop {
            if let Err(e) = self.sweep().await {
                error!("Expiry sweep failed: {}", e);
            }
            let interval = self.next_interval().await;
            tokio::time::sleep(interval).await;
        }
    }
}

/// Start the sweeper as a background task.
pub fn spawn_sweeper(sweeper: Sweeper) -> JoinHandle<()> {
    tokio::spawn(async move {
        sweeper.run().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SettingKey;
    use crate::file::metadata::NewFileRecord;
    use crate::file::naming::Category;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Sweeper) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        (temp_dir, Sweeper::new(db, storage))
    }

    async fn add_file(
        sweeper: &Sweeper,
        stored_name: &str,
        choice: ExpiryChoice,
        now: DateTime<Utc>,
    ) -> i64 {
        let staged = sweeper.storage.stage(b"data").await.unwrap();
        let size = sweeper.storage.commit(&staged, stored_name).await.unwrap();
        let (is_forever, expires_at) = normalise_expiry_choice(choice, now);
        FileRepository::new(sweeper.db.pool())
            .insert(&NewFileRecord {
                orig_name: stored_name.to_string(),
                stored_name: stored_name.to_string(),
                ext: String::new(),
                mime: "application/octet-stream".to_string(),
                category: Category::Other,
                size_bytes: size as i64,
                uploaded_at: now,
                expires_at,
                is_forever,
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_parse_expiry_choice() {
        assert_eq!("1".parse::<ExpiryChoice>().unwrap(), ExpiryChoice::Days(1));
        assert_eq!(
            " 30 ".parse::<ExpiryChoice>().unwrap(),
            ExpiryChoice::Days(30)
        );
        assert_eq!(
            "forever".parse::<ExpiryChoice>().unwrap(),
            ExpiryChoice::Forever
        );

        for bad in ["2", "0", "31", "-7", "+7", "Forever", "", "7d", "seven"] {
            assert!(
                matches!(bad.parse::<ExpiryChoice>(), Err(LanshareError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_choice() {
        assert_eq!(ExpiryChoice::default(), ExpiryChoice::Days(7));
        assert_eq!(ExpiryChoice::default().to_string(), "7");
        assert_eq!(ExpiryChoice::Forever.to_string(), "forever");
    }

    #[test]
    fn test_normalise_expiry_choice() {
        let now = Utc::now();

        assert_eq!(
            normalise_expiry_choice(ExpiryChoice::Forever, now),
            (true, None)
        );

        for days in EXPIRY_DAY_CHOICES {
            let (is_forever, expires_at) =
                normalise_expiry_choice(ExpiryChoice::Days(days), now);
            assert!(!is_forever);
            assert_eq!(expires_at.unwrap() - now, Duration::days(i64::from(days)));
        }
    }

    #[tokio::test]
    async fn test_sweep_reclaims_after_clock_advance() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();
        let id = add_file(&sweeper, "one-day.bin", ExpiryChoice::Days(1), now).await;

        let report = sweeper.sweep_at(now).await.unwrap();
        assert_eq!(report.reclaimed, 0);

        let later = now + Duration::days(1) + Duration::seconds(1);
        let report = sweeper.sweep_at(later).await.unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.disk_failures, 0);
        assert!(!sweeper.storage.exists("one-day.bin").await);
        assert!(FileRepository::new(sweeper.db.pool())
            .get(id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweep_keeps_forever_and_fresh_files() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();
        add_file(&sweeper, "forever.bin", ExpiryChoice::Forever, now).await;
        add_file(&sweeper, "month.bin", ExpiryChoice::Days(30), now).await;
        add_file(&sweeper, "day.bin", ExpiryChoice::Days(1), now).await;

        let report = sweeper.sweep_at(now + Duration::days(2)).await.unwrap();

        assert_eq!(report.reclaimed, 1);
        let repo = FileRepository::new(sweeper.db.pool());
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(sweeper.storage.exists("forever.bin").await);
        assert!(sweeper.storage.exists("month.bin").await);

        // Forever survives any amount of time
        let report = sweeper.sweep_at(now + Duration::days(3650)).await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(sweeper.storage.exists("forever.bin").await);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();
        add_file(&sweeper, "a.bin", ExpiryChoice::Days(1), now).await;
        add_file(&sweeper, "b.bin", ExpiryChoice::Days(3), now).await;

        let later = now + Duration::days(5);
        let first = sweeper.sweep_at(later).await.unwrap();
        let second = sweeper.sweep_at(later).await.unwrap();

        assert_eq!(first.reclaimed, 2);
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_tolerates_missing_object() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();
        let id = add_file(&sweeper, "vanished.bin", ExpiryChoice::Days(1), now).await;
        std::fs::remove_file(sweeper.storage.base_path().join("vanished.bin")).unwrap();

        let report = sweeper.sweep_at(now + Duration::days(2)).await.unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.disk_failures, 0);
        assert!(FileRepository::new(sweeper.db.pool())
            .get(id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweep_counts_disk_failures_and_still_deletes_record() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();

        // A directory in place of the object cannot be removed as a file
        std::fs::create_dir(sweeper.storage.base_path().join("stuck")).unwrap();
        FileRepository::new(sweeper.db.pool())
            .insert(&NewFileRecord {
                orig_name: "stuck".to_string(),
                stored_name: "stuck".to_string(),
                ext: String::new(),
                mime: "application/octet-stream".to_string(),
                category: Category::Other,
                size_bytes: 0,
                uploaded_at: now,
                expires_at: Some(now - Duration::seconds(1)),
                is_forever: false,
            })
            .await
            .unwrap();

        let report = sweeper.sweep_at(now).await.unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.disk_failures, 1);
        assert_eq!(
            FileRepository::new(sweeper.db.pool()).count().await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_sweep_continues_after_record_failure() {
        let (_temp_dir, sweeper) = setup().await;
        let now = Utc::now();
        let locked = add_file(&sweeper, "locked.bin", ExpiryChoice::Days(1), now).await;
        let free = add_file(&sweeper, "free.bin", ExpiryChoice::Days(1), now).await;

        sqlx::query(
            "CREATE TRIGGER keep_locked BEFORE DELETE ON files \
             WHEN OLD.stored_name = 'locked.bin' \
             BEGIN SELECT RAISE(ABORT, 'locked'); END",
        )
        .execute(sweeper.db.pool())
        .await
        .unwrap();

        let report = sweeper.sweep_at(now + Duration::days(2)).await.unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.record_failures, 1);
        let repo = FileRepository::new(sweeper.db.pool());
        assert!(repo.get(free).await.unwrap().is_none());
        assert!(repo.get(locked).await.unwrap().is_some());

        // Retried on the next pass once the record can go
        sqlx::query("DROP TRIGGER keep_locked")
            .execute(sweeper.db.pool())
            .await
            .unwrap();
        let report = sweeper.sweep_at(now + Duration::days(2)).await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.record_failures, 0);
        assert!(repo.get(locked).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_interval_reads_settings() {
        let (_temp_dir, sweeper) = setup().await;
        let settings = SettingsRepository::new(sweeper.db.pool());

        assert_eq!(
            sweeper.next_interval().await,
            std::time::Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS)
        );

        settings
            .set_u64(SettingKey::CleanupIntervalSeconds, 5)
            .await
            .unwrap();
        assert_eq!(sweeper.next_interval().await, std::time::Duration::from_secs(5));

        settings
            .set_u64(SettingKey::CleanupIntervalSeconds, 0)
            .await
            .unwrap();
        assert_eq!(sweeper.next_interval().await, std::time::Duration::from_secs(1));

        settings.set("cleanup_interval_seconds", "soon").await.unwrap();
        assert_eq!(
            sweeper.next_interval().await,
            std::time::Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS)
        );
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_immediately() {
        let (_temp_dir, sweeper) = setup().await;
        let past = Utc::now() - Duration::days(2);
        add_file(&sweeper, "old.bin", ExpiryChoice::Days(1), past).await;

        let handle = spawn_sweeper(sweeper.clone());

        let repo = FileRepository::new(sweeper.db.pool());
        for _ in 0..50 {
            if repo.count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        handle.abort();

        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
