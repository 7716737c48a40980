//! Storage quota accounting.
//!
//! Usage is always the sum of live record sizes, recomputed per decision.
//! Limits come from the settings table on every call.

use std::fmt;
use std::str::FromStr;

use crate::db::{Database, SettingsRepository};
use crate::error::CapacityError;
use crate::{LanshareError, Result};

use super::metadata::FileRepository;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Unit accepted by [`parse_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Mb,
    Gb,
}

impl SizeUnit {
    fn multiplier(&self) -> f64 {
        match self {
            SizeUnit::Mb => BYTES_PER_MB,
            SizeUnit::Gb => BYTES_PER_GB,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeUnit::Mb => f.write_str("mb"),
            SizeUnit::Gb => f.write_str("gb"),
        }
    }
}

impl FromStr for SizeUnit {
    type Err = LanshareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mb" => Ok(SizeUnit::Mb),
            "gb" => Ok(SizeUnit::Gb),
            _ => Err(LanshareError::Validation(format!("unknown size unit: {s}"))),
        }
    }
}

fn parse_amount(value: &str) -> Result<f64> {
    let amount: f64 = value
        .trim()
        .parse()
        .map_err(|_| LanshareError::Validation(format!("invalid size value: {value}")))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(LanshareError::Validation(format!(
            "invalid size value: {value}"
        )));
    }

    Ok(amount)
}

/// Convert a decimal amount and unit (`mb` or `gb`) into bytes.
///
/// Fractions are truncated to whole bytes.
pub fn parse_size(value: &str, unit: &str) -> Result<u64> {
    let unit: SizeUnit = unit.parse()?;
    let amount = parse_amount(value)?;

    Ok((amount * unit.multiplier()) as u64)
}

/// Convert a decimal GB amount into a quota in bytes. Must be positive.
pub fn quota_from_gb(value: &str) -> Result<u64> {
    let bytes = parse_size(value, "gb")?;
    if bytes == 0 {
        return Err(LanshareError::Validation(
            "quota must be greater than 0".to_string(),
        ));
    }
    Ok(bytes)
}

/// Quota checks against the live records.
pub struct QuotaAccountant<'a> {
    db: &'a Database,
}

impl<'a> QuotaAccountant<'a> {
    /// Create a new QuotaAccountant.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Bytes currently held by live records.
    pub async fn current_used(&self) -> Result<u64> {
        let used = FileRepository::new(self.db.pool()).sum_live_bytes().await?;
        Ok(used.max(0) as u64)
    }

    /// Current quota in bytes.
    pub async fn quota_bytes(&self) -> Result<u64> {
        SettingsRepository::new(self.db.pool()).quota_bytes().await
    }

    /// Whether the service is accepting uploads at all.
    ///
    /// Usage exactly at the quota still accepts (a zero-byte batch fits).
    pub async fn can_accept_uploads(&self) -> Result<bool> {
        let used = self.current_used().await?;
        let quota = self.quota_bytes().await?;
        Ok(used <= quota)
    }

    /// Fail with `UploadsDisabled` when usage is above the quota.
    pub async fn ensure_uploads_enabled(&self) -> Result<()> {
        if self.can_accept_uploads().await? {
            Ok(())
        } else {
            Err(CapacityError::UploadsDisabled.into())
        }
    }

    /// Admit or reject a whole batch of `(name, size)` candidates.
    ///
    /// The per-file limit is checked first (0 = unlimited), then the batch
    /// total against the remaining quota. Nothing is written either way.
    pub async fn admit_batch(&self, candidates: &[(&str, u64)]) -> Result<()> {
        let settings = SettingsRepository::new(self.db.pool());

        let max_file = settings.max_file_bytes().await?;
        if max_file > 0 {
            if let Some((name, size)) = candidates.iter().find(|(_, size)| *size > max_file) {
                return Err(CapacityError::FileTooLarge {
                    name: name.to_string(),
                    size: *size,
                    limit: max_file,
                }
                .into());
            }
        }

        let used = self.current_used().await?;
        let quota = settings.quota_bytes().await?;
        let requested: u64 = candidates.iter().map(|(_, size)| *size).sum();

        if used.saturating_add(requested) > quota {
            return Err(CapacityError::QuotaExceeded {
                used,
                requested,
                quota,
            }
            .into());
        }

        Ok(())
    }
}
