/**
 * Run configuration
 */

use chrono::{NaiveDate, NaiveDateTime};

use crate::datetime::Zone;
use crate::error::{RenameError, Result};

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
pub const DEFAULT_POSTFIX_FORMAT: &str = "_{}";
pub const DEFAULT_TOLERANCE_SECS: f64 = 10.0;
pub const DEFAULT_EARLIEST: &str = "2015-01-01 00:00:00";

#[derive(Debug, Clone)]
pub struct RenameOptions {
    /// Enter subdirectories, mirroring them into the target.
    pub recursive: bool,
    /// Remove source directories left empty after the run.
    pub delete_empty: bool,
    /// Put both datetimes into the name when they diverge.
    pub dual: bool,
    pub datetime_format: String,
    /// Postfix template; `{}` is replaced by the collision counter.
    pub postfix_format: String,
    pub tolerance_secs: f64,
    pub earliest: NaiveDateTime,
    /// Upper plausibility bound; `None` means the moment the run starts.
    pub latest: Option<NaiveDateTime>,
    pub zone: Zone,
    pub dry_run: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            delete_empty: false,
            dual: false,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            postfix_format: DEFAULT_POSTFIX_FORMAT.to_string(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            earliest: default_earliest(),
            latest: None,
            zone: Zone::Local,
            dry_run: false,
        }
    }
}

impl RenameOptions {
    /// Checks the fields that are not validated by the filename generator.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_secs.is_finite() || self.tolerance_secs < 0.0 {
            return Err(RenameError::invalid(
                "tolerance",
                format!("{} is not a non-negative number of seconds", self.tolerance_secs),
            ));
        }
        if let Some(latest) = self.latest {
            if latest < self.earliest {
                return Err(RenameError::invalid(
                    "latest",
                    format!("{} is before the earliest bound {}", latest, self.earliest),
                ));
            }
        }
        Ok(())
    }
}

pub fn parse_bound(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            RenameError::invalid(
                "earliest",
                format!("'{}' is neither YYYY-MM-DD nor YYYY-MM-DD HH:MM:SS", s),
            )
        })
}

fn default_earliest() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
