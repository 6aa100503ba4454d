/**
 * Video creation time from the QuickTime / MP4 movie metadata (nom-exif)
 *
 * Key priority:
 * 1. com.apple.quicktime.creationdate (camera wall time with zone)
 * 2. creation_time (movie header, UTC)
 */

use chrono::{DateTime, Utc};
use log::debug;
use nom_exif::EntryValue;
use std::fs::File;
use std::path::Path;

use crate::console::MissingMetadata;
use crate::datetime::{DateSource, MetadataLookup, Zone};
use crate::error::{RenameError, Result};

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
pub(crate) const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

const CREATION_KEYS: [&str; 2] = ["com.apple.quicktime.creationdate", "creation_time"];

pub fn read_creation_datetime(file_path: &Path, zone: &Zone) -> Result<MetadataLookup> {
    let file = File::open(file_path).map_err(|e| RenameError::io(file_path, e))?;

    #[allow(deprecated)]
    let entries = match nom_exif::parse_metadata(file) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("nom-exif found no movie metadata in {}: {}", file_path.display(), e);
            return Ok(MetadataLookup::Missing(MissingMetadata::VideoHeader));
        }
    };

    let instant = CREATION_KEYS.iter().find_map(|key| {
        entries
            .iter()
            .filter(|(k, _)| k == key)
            .find_map(|(_, value)| creation_instant(value))
    });

    Ok(match instant {
        Some(instant) => MetadataLookup::Found {
            datetime: zone.wall_time(instant),
            source: DateSource::VideoHeader,
        },
        None => {
            debug!("No creation time among {} entries in {}", entries.len(), file_path.display());
            MetadataLookup::Missing(MissingMetadata::VideoDatetime)
        }
    })
}

fn creation_instant(value: &EntryValue) -> Option<DateTime<Utc>> {
    let instant = match value.as_time() {
        Some(time) => time.with_timezone(&Utc),
        None => {
            let text = value.as_str()?.trim();
            DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z"))
                .ok()?
                .with_timezone(&Utc)
        }
    };
    // Encoders without a clock leave the header at zero, i.e. the epoch itself.
    (instant.timestamp() > -QUICKTIME_EPOCH_OFFSET).then_some(instant)
}
