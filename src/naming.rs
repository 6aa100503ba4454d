/**
 * File naming: datetime stamps and collision-safe postfixes
 */

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::datetime::{DateSource, Resolution};
use crate::error::{RenameError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedName {
    pub file_name: String,
    /// The postfix that had to be appended, if any.
    pub postfix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    datetime_format: String,
    postfix_format: String,
}

impl FilenameGenerator {
    pub fn new(datetime_format: &str, postfix_format: &str) -> Result<Self> {
        if datetime_format.is_empty() {
            return Err(RenameError::invalid("format", "must not be empty"));
        }
        if StrftimeItems::new(datetime_format).any(|item| matches!(item, Item::Error)) {
            return Err(RenameError::invalid(
                "format",
                format!("'{}' is not a valid strftime format", datetime_format),
            ));
        }
        if postfix_format.matches("{}").count() != 1 {
            return Err(RenameError::invalid(
                "postfix",
                format!("'{}' must contain exactly one {{}}", postfix_format),
            ));
        }

        let generator = Self {
            datetime_format: datetime_format.to_string(),
            postfix_format: postfix_format.to_string(),
        };
        // Zone specifiers such as %z cannot be rendered for a wall time.
        let Some(sample) = generator.try_format(NaiveDateTime::default()) else {
            return Err(RenameError::invalid(
                "format",
                format!("'{}' needs a time zone to render", datetime_format),
            ));
        };
        if format!("{}{}", sample, generator.postfix(1)).contains(['/', '\\']) {
            return Err(RenameError::invalid(
                "format",
                "names must not contain path separators",
            ));
        }
        Ok(generator)
    }

    pub fn format_datetime(&self, dt: NaiveDateTime) -> String {
        self.try_format(dt).unwrap_or_default()
    }

    fn try_format(&self, dt: NaiveDateTime) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", dt.format(&self.datetime_format)).ok()?;
        Some(out)
    }

    pub fn postfix(&self, counter: u32) -> String {
        self.postfix_format.replacen("{}", &counter.to_string(), 1)
    }

    /// The base name for a resolved file.
    ///
    /// Dual names read `<metadata> (<filesystem>)`.
    pub fn stamp(&self, resolution: &Resolution, dual: bool) -> String {
        let chosen = self.format_datetime(resolution.chosen);
        if dual && resolution.diverged && resolution.source != DateSource::Filesystem {
            format!("{} ({})", chosen, self.format_datetime(resolution.filesystem))
        } else {
            chosen
        }
    }

    /// First free `<stamp><postfix>.<extension>` in `target_dir`.
    ///
    /// `source_path` never collides with itself, and `claimed` holds names
    /// already handed out during this run.
    pub fn generate_filename(
        &self,
        stamp: &str,
        extension: &str,
        target_dir: &Path,
        source_path: &Path,
        claimed: &HashSet<PathBuf>,
    ) -> GeneratedName {
        let file_name = join_extension(stamp, extension);
        if is_available(&target_dir.join(&file_name), source_path, claimed) {
            return GeneratedName {
                file_name,
                postfix: None,
            };
        }

        let mut counter = 1;
        loop {
            let postfix = self.postfix(counter);
            let file_name = join_extension(&format!("{}{}", stamp, postfix), extension);
            if is_available(&target_dir.join(&file_name), source_path, claimed) {
                return GeneratedName {
                    file_name,
                    postfix: Some(postfix),
                };
            }
            counter += 1;
        }
    }
}

fn join_extension(base: &str, extension: &str) -> String {
    if extension.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, extension)
    }
}

fn is_available(candidate: &Path, source_path: &Path, claimed: &HashSet<PathBuf>) -> bool {
    if claimed.contains(candidate) {
        return false;
    }
    // symlink_metadata so that dangling links still count as taken.
    candidate == source_path || fs::symlink_metadata(candidate).is_err()
}
