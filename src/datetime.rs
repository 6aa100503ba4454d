/**
 * Capture datetime resolution
 *
 * Source priority:
 * 1. Embedded metadata (EXIF for images, the container header for videos)
 * 2. File modification time (always read, used as fallback and for comparison)
 *
 * Both candidates are range checked against a plausibility window and
 * compared against each other; anomalies become warnings, never errors.
 */

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Timelike, Utc};
use log::debug;
use std::path::Path;
use std::time::SystemTime;

use crate::console::{MissingMetadata, Warning};
use crate::error::{RenameError, Result};
use crate::exif::ExifProcessor;
use crate::media::MediaKind;
use crate::options::RenameOptions;
use crate::video;

/// How zoned instants (file times, video headers) become wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn from_utc_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(Zone::Fixed)
    }

    pub fn wall_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    pub fn wall_time_from_system(&self, time: SystemTime) -> NaiveDateTime {
        self.wall_time(DateTime::<Utc>::from(time))
    }

    pub fn now(&self) -> NaiveDateTime {
        self.wall_time(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Filesystem,
    ExifDateTimeOriginal,
    ExifDateTimeDigitized,
    ExifDateTime,
    VideoHeader,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Filesystem => "filesystem_modified",
            DateSource::ExifDateTimeOriginal => "exif_datetime_original",
            DateSource::ExifDateTimeDigitized => "exif_datetime_digitized",
            DateSource::ExifDateTime => "exif_datetime",
            DateSource::VideoHeader => "video_header",
        }
    }
}

/// Outcome of asking a file for its embedded datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataLookup {
    Found {
        datetime: NaiveDateTime,
        source: DateSource,
    },
    Missing(MissingMetadata),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The datetime the file should be named after.
    pub chosen: NaiveDateTime,
    pub source: DateSource,
    pub filesystem: NaiveDateTime,
    /// Metadata and filesystem time disagree beyond the tolerance.
    pub diverged: bool,
    pub warnings: Vec<Warning>,
}

pub struct DatetimeResolver {
    exif_processor: ExifProcessor,
    zone: Zone,
    earliest: NaiveDateTime,
    /// Upper bound in the configured zone (filesystem and video times).
    latest: NaiveDateTime,
    /// Upper bound for EXIF, which is already local wall time.
    latest_local: NaiveDateTime,
    tolerance_secs: f64,
}

impl DatetimeResolver {
    pub fn new(options: &RenameOptions) -> Self {
        Self {
            exif_processor: ExifProcessor::new(),
            zone: options.zone,
            earliest: options.earliest,
            latest: options.latest.unwrap_or_else(|| options.zone.now()),
            latest_local: options.latest.unwrap_or_else(|| Zone::Local.now()),
            tolerance_secs: options.tolerance_secs,
        }
    }

    pub fn resolve(&self, file_path: &Path, kind: MediaKind) -> Result<Resolution> {
        let metadata = match kind {
            MediaKind::Image => self.exif_processor.read_capture_datetime(file_path)?,
            MediaKind::Video => video::read_creation_datetime(file_path, &self.zone)?,
        };
        let filesystem = self.filesystem_datetime(file_path)?;

        let resolution = self.choose(metadata, filesystem);
        debug!(
            "Resolved {} to {} from {}",
            file_path.display(),
            resolution.chosen,
            resolution.source.as_str()
        );
        Ok(resolution)
    }

    pub fn filesystem_datetime(&self, file_path: &Path) -> Result<NaiveDateTime> {
        let modified = std::fs::metadata(file_path)
            .and_then(|metadata| metadata.modified())
            .map_err(|e| RenameError::io(file_path, e))?;
        // Whole seconds, like every other candidate.
        let wall_time = self.zone.wall_time_from_system(modified);
        Ok(wall_time.with_nanosecond(0).unwrap_or(wall_time))
    }

    /// Applies the preference policy to already-read candidates.
    pub fn choose(&self, metadata: MetadataLookup, filesystem: NaiveDateTime) -> Resolution {
        let mut warnings = Vec::new();

        let found = match metadata {
            MetadataLookup::Found { datetime, source } => {
                let latest = match source {
                    DateSource::ExifDateTimeOriginal
                    | DateSource::ExifDateTimeDigitized
                    | DateSource::ExifDateTime => self.latest_local,
                    DateSource::Filesystem | DateSource::VideoHeader => self.latest,
                };
                if !self.in_range(datetime, latest) {
                    warnings.push(Warning::MetadataOutOfRange { datetime });
                }
                Some((datetime, source))
            }
            MetadataLookup::Missing(missing) => {
                warnings.push(Warning::MetadataMissing(missing));
                None
            }
        };

        if !self.in_range(filesystem, self.latest) {
            warnings.push(Warning::FilesystemOutOfRange {
                datetime: filesystem,
            });
        }

        match found {
            None => Resolution {
                chosen: filesystem,
                source: DateSource::Filesystem,
                filesystem,
                diverged: false,
                warnings,
            },
            Some((datetime, source)) => {
                let diverged = self.differ(datetime, filesystem);
                if diverged {
                    warnings.push(Warning::Diverged {
                        metadata: datetime,
                        filesystem,
                    });
                }
                Resolution {
                    chosen: datetime,
                    source,
                    filesystem,
                    diverged,
                    warnings,
                }
            }
        }
    }

    fn in_range(&self, datetime: NaiveDateTime, latest: NaiveDateTime) -> bool {
        datetime >= self.earliest && datetime <= latest
    }

    fn differ(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        let gap_ms = a.signed_duration_since(b).num_milliseconds().abs();
        gap_ms as f64 / 1000.0 > self.tolerance_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{datetime, jpeg_with_datetime_original, set_mtime};
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> DatetimeResolver {
        let options = RenameOptions {
            zone: Zone::Fixed(FixedOffset::east_opt(0).unwrap()),
            latest: Some(datetime("2024-12-31 23:59:59")),
            ..RenameOptions::default()
        };
        DatetimeResolver::new(&options)
    }

    fn found(s: &str) -> MetadataLookup {
        MetadataLookup::Found {
            datetime: datetime(s),
            source: DateSource::ExifDateTimeOriginal,
        }
    }

    #[test]
    fn metadata_within_tolerance_is_preferred_silently() {
        let resolution = resolver().choose(
            found("2020-05-01 10:00:00"),
            datetime("2020-05-01 10:00:07"),
        );

        assert_eq!(resolution.chosen, datetime("2020-05-01 10:00:00"));
        assert_eq!(resolution.source, DateSource::ExifDateTimeOriginal);
        assert!(!resolution.diverged);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn divergence_beyond_tolerance_warns_but_keeps_metadata() {
        let resolution = resolver().choose(
            found("2020-05-01 10:00:00"),
            datetime("2020-05-01 10:00:11"),
        );

        assert_eq!(resolution.chosen, datetime("2020-05-01 10:00:00"));
        assert!(resolution.diverged);
        assert_eq!(
            resolution.warnings,
            vec![Warning::Diverged {
                metadata: datetime("2020-05-01 10:00:00"),
                filesystem: datetime("2020-05-01 10:00:11"),
            }]
        );
    }

    #[test]
    fn gap_equal_to_tolerance_is_not_divergence() {
        let resolution = resolver().choose(
            found("2020-05-01 10:00:00"),
            datetime("2020-05-01 09:59:50"),
        );
        assert!(!resolution.diverged);
    }

    #[test]
    fn missing_metadata_falls_back_to_filesystem() {
        let resolution = resolver().choose(
            MetadataLookup::Missing(MissingMetadata::Exif),
            datetime("2019-03-03 03:03:03"),
        );

        assert_eq!(resolution.chosen, datetime("2019-03-03 03:03:03"));
        assert_eq!(resolution.source, DateSource::Filesystem);
        assert_eq!(
            resolution.warnings,
            vec![Warning::MetadataMissing(MissingMetadata::Exif)]
        );
    }

    #[test]
    fn out_of_range_times_warn_without_blocking() {
        let resolution = resolver().choose(
            found("2009-01-01 00:00:00"),
            datetime("2030-01-01 00:00:00"),
        );

        assert_eq!(resolution.chosen, datetime("2009-01-01 00:00:00"));
        assert_eq!(resolution.warnings.len(), 3);
        assert_eq!(
            resolution.warnings[0],
            Warning::MetadataOutOfRange {
                datetime: datetime("2009-01-01 00:00:00")
            }
        );
        assert_eq!(
            resolution.warnings[1],
            Warning::FilesystemOutOfRange {
                datetime: datetime("2030-01-01 00:00:00")
            }
        );
        assert!(matches!(resolution.warnings[2], Warning::Diverged { .. }));
    }

    #[test]
    fn fixed_zone_shifts_wall_time() {
        let zone = Zone::from_utc_offset_hours(3).unwrap();
        let instant = datetime("2020-01-01 22:30:00").and_utc();
        assert_eq!(zone.wall_time(instant), datetime("2020-01-02 01:30:00"));
        assert!(Zone::from_utc_offset_hours(30).is_none());
    }

    #[test]
    fn resolves_plain_file_from_modification_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, b"not really a png").unwrap();
        set_mtime(&path, "2021-07-04 12:00:00");

        let resolution = resolver().resolve(&path, MediaKind::Image).unwrap();

        assert_eq!(resolution.chosen, datetime("2021-07-04 12:00:00"));
        assert_eq!(resolution.source, DateSource::Filesystem);
        assert_eq!(
            resolution.warnings,
            vec![Warning::MetadataMissing(MissingMetadata::Exif)]
        );
    }

    #[test]
    fn resolves_exif_datetime_from_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_datetime_original("2020:05:01 10:00:00")).unwrap();
        set_mtime(&path, "2020-05-01 10:00:05");

        let resolution = resolver().resolve(&path, MediaKind::Image).unwrap();

        assert_eq!(resolution.chosen, datetime("2020-05-01 10:00:00"));
        assert_eq!(resolution.source, DateSource::ExifDateTimeOriginal);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn subsecond_mtime_does_not_widen_the_gap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with_datetime_original("2020:05:01 10:00:00")).unwrap();
        let seconds = datetime("2020-05-01 10:00:10").and_utc().timestamp();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(seconds, 500_000_000)).unwrap();

        let resolution = resolver().resolve(&path, MediaKind::Image).unwrap();

        assert_eq!(resolution.filesystem, datetime("2020-05-01 10:00:10"));
        assert!(!resolution.diverged);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn exif_upper_bound_ignores_the_configured_offset() {
        let just_taken = Local::now().naive_local() - chrono::Duration::minutes(5);
        let far_west = DatetimeResolver::new(&RenameOptions {
            zone: Zone::from_utc_offset_hours(-23).unwrap(),
            ..RenameOptions::default()
        });

        let resolution = far_west.choose(
            MetadataLookup::Found {
                datetime: just_taken,
                source: DateSource::ExifDateTimeOriginal,
            },
            just_taken,
        );

        assert!(!resolution
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::MetadataOutOfRange { .. })));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = resolver().resolve(&dir.path().join("gone.jpg"), MediaKind::Image);
        assert!(matches!(result, Err(RenameError::Io { .. })));
    }
}
