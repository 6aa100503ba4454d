/**
 * Console output: the fixed warning vocabulary, per-entry messages and
 * the interactive directory prompt
 */

use chrono::NaiveDateTime;
use log::debug;
use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Four-letter codes identifying each warning kind, usable with `--mute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    Stps,
    Apfx,
    Wdor,
    E404,
    Edor,
    Diff,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::Stps => "STPS",
            WarningCode::Apfx => "APFX",
            WarningCode::Wdor => "WDOR",
            WarningCode::E404 => "E404",
            WarningCode::Edor => "EDOR",
            WarningCode::Diff => "DIFF",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarningCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STPS" => Ok(WarningCode::Stps),
            "APFX" => Ok(WarningCode::Apfx),
            "WDOR" => Ok(WarningCode::Wdor),
            "E404" => Ok(WarningCode::E404),
            "EDOR" => Ok(WarningCode::Edor),
            "DIFF" => Ok(WarningCode::Diff),
            other => Err(format!(
                "unknown warning code '{}' (expected STPS, APFX, WDOR, E404, EDOR or DIFF)",
                other
            )),
        }
    }
}

/// Which piece of embedded metadata could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMetadata {
    Exif,
    ExifDatetime,
    VideoHeader,
    VideoDatetime,
}

impl fmt::Display for MissingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            MissingMetadata::Exif => "Exif not found",
            MissingMetadata::ExifDatetime => "Exif datetime not found",
            MissingMetadata::VideoHeader => "Video header not found",
            MissingMetadata::VideoDatetime => "Video datetime not found",
        };
        f.write_str(what)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SamePaths,
    PostfixAdded { postfix: String },
    FilesystemOutOfRange { datetime: NaiveDateTime },
    MetadataMissing(MissingMetadata),
    MetadataOutOfRange { datetime: NaiveDateTime },
    Diverged {
        metadata: NaiveDateTime,
        filesystem: NaiveDateTime,
    },
}

impl Warning {
    pub fn code(&self) -> WarningCode {
        match self {
            Warning::SamePaths => WarningCode::Stps,
            Warning::PostfixAdded { .. } => WarningCode::Apfx,
            Warning::FilesystemOutOfRange { .. } => WarningCode::Wdor,
            Warning::MetadataMissing(_) => WarningCode::E404,
            Warning::MetadataOutOfRange { .. } => WarningCode::Edor,
            Warning::Diverged { .. } => WarningCode::Diff,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Warning: ", self.code())?;
        match self {
            Warning::SamePaths => f.write_str("the source and target paths are same"),
            Warning::PostfixAdded { postfix } => write!(f, "postfix added ({})", postfix),
            Warning::FilesystemOutOfRange { datetime } => write!(
                f,
                "filesystem datetime out of range ({})",
                datetime.format(DISPLAY_FORMAT)
            ),
            Warning::MetadataMissing(missing) => write!(f, "{}", missing),
            Warning::MetadataOutOfRange { datetime } => write!(
                f,
                "metadata datetime out of range ({})",
                datetime.format(DISPLAY_FORMAT)
            ),
            Warning::Diverged {
                metadata,
                filesystem,
            } => write!(
                f,
                "datetimes differ too much: [{}] [{}]",
                metadata.format(DISPLAY_FORMAT),
                filesystem.format(DISPLAY_FORMAT)
            ),
        }
    }
}

pub struct Console {
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
    muted: HashSet<WarningCode>,
    pause: bool,
    separator: Option<String>,
}

impl Console {
    pub fn new(out: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Self {
            out,
            input,
            muted: HashSet::new(),
            pause: false,
            separator: None,
        }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stdin().lock()))
    }

    pub fn with_muted(mut self, codes: impl IntoIterator<Item = WarningCode>) -> Self {
        self.muted.extend(codes);
        self
    }

    /// Wait for Enter after every warning that is shown.
    pub fn with_pause(mut self, pause: bool) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_separator(mut self, separator: Option<String>) -> Self {
        self.separator = separator;
        self
    }

    pub fn is_muted(&self, code: WarningCode) -> bool {
        self.muted.contains(&code)
    }

    pub fn warn(&mut self, warning: &Warning) {
        if self.is_muted(warning.code()) {
            debug!("Muted: {}", warning);
            return;
        }
        self.line(warning);
        if self.pause {
            self.wait_for_enter();
        }
    }

    pub fn line(&mut self, message: impl fmt::Display) {
        if let Err(e) = writeln!(self.out, "{}", message) {
            debug!("Failed to write console output: {}", e);
        }
    }

    pub fn separate(&mut self) {
        if let Some(separator) = self.separator.clone() {
            self.line(separator);
        }
    }

    pub fn flush(&mut self) {
        self.out.flush().ok();
    }

    fn wait_for_enter(&mut self) {
        if write!(self.out, "Press Enter to continue").is_ok() {
            self.out.flush().ok();
        }
        let mut discard = String::new();
        if let Err(e) = self.input.read_line(&mut discard) {
            debug!("Failed to read pause input: {}", e);
        }
    }

    /// Ask for a directory path; `Ok(None)` when the answer is empty.
    pub fn prompt_directory(&mut self, description: &str) -> io::Result<Option<PathBuf>> {
        write!(self.out, "Enter path to the {} directory: ", description)?;
        self.out.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(parse_path_answer(&answer))
    }
}

/// Strips the newline plus any quotes and spaces pasted around a path.
pub fn parse_path_answer(answer: &str) -> Option<PathBuf> {
    let cleaned = answer
        .trim_end_matches(['\r', '\n'])
        .trim_matches(|c| c == '"' || c == '\'' || c == ' ');
    if cleaned.is_empty() {
        None
    } else {
        Some(PathBuf::from(cleaned))
    }
}
