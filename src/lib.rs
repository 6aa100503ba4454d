pub mod console;
pub mod datetime;
pub mod error;
pub mod exif;
pub mod file_ops;
pub mod media;
pub mod naming;
pub mod options;
pub mod video;

#[cfg(test)]
mod test_utils;

pub use console::{Console, Warning, WarningCode};
pub use error::{RenameError, Result};
pub use file_ops::{FileProcessor, Roots, RunSummary};
pub use options::RenameOptions;
