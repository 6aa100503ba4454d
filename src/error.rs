/**
 * Error types shared by the library
 */

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Source directory path is not specified")]
    SourceNotSpecified,

    #[error("Source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("Target path is not a directory: {}", .0.display())]
    TargetNotDirectory(PathBuf),

    #[error("Invalid option {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenameError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenameError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        RenameError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenameError>;
