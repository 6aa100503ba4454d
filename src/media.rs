/**
 * Media classification by file extension
 */

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Supported source extensions (lowercase) with the extension the renamed file gets.
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "jpg"),
    ("jpeg", "jpg"),
    ("png", "png"),
    ("tif", "tiff"),
    ("tiff", "tiff"),
    ("webp", "webp"),
    ("heic", "heic"),
    ("heif", "heic"),
];

const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "mp4"),
    ("mov", "mov"),
    ("m4v", "m4v"),
    ("3gp", "3gp"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFile {
    Supported {
        kind: MediaKind,
        target_extension: &'static str,
    },
    Unsupported {
        extension: String,
    },
}

pub fn classify_file(path: &Path) -> MediaFile {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if let Some(target_extension) = lookup(IMAGE_EXTENSIONS, &extension) {
        MediaFile::Supported {
            kind: MediaKind::Image,
            target_extension,
        }
    } else if let Some(target_extension) = lookup(VIDEO_EXTENSIONS, &extension) {
        MediaFile::Supported {
            kind: MediaKind::Video,
            target_extension,
        }
    } else {
        MediaFile::Unsupported { extension }
    }
}

fn lookup(table: &[(&str, &'static str)], extension: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(source, _)| *source == extension)
        .map(|(_, target)| *target)
}
