/**
 * EXIF processing module built on kamadak-exif
 *
 * Tag priority:
 * 1. DateTimeOriginal (capture time)
 * 2. DateTimeDigitized
 * 3. DateTime (last resort, editors rewrite it)
 */

use chrono::NaiveDateTime;
use exif::{In, Reader as ExifReader, Tag, Value};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::console::MissingMetadata;
use crate::datetime::{DateSource, MetadataLookup};
use crate::error::{RenameError, Result};

const TIMESTAMP_FIELDS: [(Tag, DateSource); 3] = [
    (Tag::DateTimeOriginal, DateSource::ExifDateTimeOriginal),
    (Tag::DateTimeDigitized, DateSource::ExifDateTimeDigitized),
    (Tag::DateTime, DateSource::ExifDateTime),
];

#[derive(Debug, Default)]
pub struct ExifProcessor;

impl ExifProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Read the capture datetime of an image.
    ///
    /// Only failing to open the file is an error; unreadable or absent EXIF
    /// data is reported as [`MetadataLookup::Missing`].
    pub fn read_capture_datetime(&self, file_path: &Path) -> Result<MetadataLookup> {
        let file = File::open(file_path).map_err(|e| RenameError::io(file_path, e))?;
        let mut bufreader = BufReader::new(file);

        let exif = match ExifReader::new().read_from_container(&mut bufreader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!("kamadak-exif failed for {}: {}", file_path.display(), e);
                return Ok(MetadataLookup::Missing(MissingMetadata::Exif));
            }
        };

        for (tag, source) in TIMESTAMP_FIELDS {
            let Some(field) = exif.get_field(tag, In::PRIMARY) else {
                continue;
            };
            let Some(raw) = ascii_value(&field.value) else {
                continue;
            };
            if self.is_zero_timestamp(&raw) {
                debug!("Ignoring zeroed {} in {}", tag, file_path.display());
                continue;
            }
            match self.parse_timestamp(&raw) {
                Some(datetime) => return Ok(MetadataLookup::Found { datetime, source }),
                None => debug!(
                    "Unparseable {} '{}' in {}",
                    tag,
                    raw,
                    file_path.display()
                ),
            }
        }

        Ok(MetadataLookup::Missing(MissingMetadata::ExifDatetime))
    }

    pub fn parse_timestamp(&self, timestamp_str: &str) -> Option<NaiveDateTime> {
        let timestamp_str = timestamp_str.trim();

        // Subseconds are carried in separate tags; drop any fraction here.
        let main_part = timestamp_str
            .split_once('.')
            .map_or(timestamp_str, |(main, _)| main);

        ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(main_part, format).ok())
    }

    fn is_zero_timestamp(&self, timestamp_str: &str) -> bool {
        timestamp_str
            .chars()
            .all(|c| matches!(c, '0' | ':' | ' ' | '-'))
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        // Use the raw bytes; display_value() would quote the string.
        Value::Ascii(parts) => parts.first().map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}
