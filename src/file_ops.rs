/**
 * File operations module: walks the source tree, mirrors it into the
 * target and moves every supported file under its datetime name
 */

use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::console::{Console, Warning};
use crate::datetime::DatetimeResolver;
use crate::error::{RenameError, Result};
use crate::media::{classify_file, MediaFile};
use crate::naming::FilenameGenerator;
use crate::options::RenameOptions;

/// Move a file, falling back to copy + delete across filesystems.
fn move_file(source_path: &Path, target_path: &Path) -> io::Result<()> {
    if let Some(parent) = target_path.parent() {
        if !parent.exists() {
            debug!("Creating target directory: {}", parent.display());
            fs::create_dir_all(parent)?;
        }
    }

    match fs::rename(source_path, target_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Cross-device move detected, using copy+delete strategy");
            fs::copy(source_path, target_path)?;
            fs::remove_file(source_path)
        }
        Err(e) => Err(e),
    }
}

/// Source and target directories after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Roots {
    /// Validates the source, defaults the target to it and makes both absolute.
    ///
    /// A missing target is created unless `dry_run` is set.
    pub fn prepare(source: Option<PathBuf>, target: Option<PathBuf>, dry_run: bool) -> Result<Self> {
        let source = source.ok_or(RenameError::SourceNotSpecified)?;
        if !source.is_dir() {
            return Err(RenameError::SourceNotDirectory(source));
        }
        let source = source
            .canonicalize()
            .map_err(|e| RenameError::io(&source, e))?;

        let target = match target {
            None => source.clone(),
            Some(target) if target.is_dir() => target
                .canonicalize()
                .map_err(|e| RenameError::io(&target, e))?,
            Some(target) if target.exists() => return Err(RenameError::TargetNotDirectory(target)),
            Some(target) if dry_run => {
                std::path::absolute(&target).map_err(|e| RenameError::io(&target, e))?
            }
            Some(target) => {
                info!("Creating target directory: {}", target.display());
                fs::create_dir_all(&target).map_err(|e| RenameError::io(&target, e))?;
                target
                    .canonicalize()
                    .map_err(|e| RenameError::io(&target, e))?
            }
        };

        Ok(Self { source, target })
    }

    pub fn is_same(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub renamed: usize,
    /// Supported files whose name already matched.
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub directories_created: usize,
    pub directories_removed: usize,
    /// Warnings actually printed; muted codes are not counted.
    pub warnings: usize,
}

pub struct FileProcessor {
    options: RenameOptions,
    resolver: DatetimeResolver,
    filename_generator: FilenameGenerator,
    console: Console,
    claimed: HashSet<PathBuf>,
    summary: RunSummary,
}

impl FileProcessor {
    pub fn new(options: RenameOptions, console: Console) -> Result<Self> {
        options.validate()?;
        let filename_generator =
            FilenameGenerator::new(&options.datetime_format, &options.postfix_format)?;
        let resolver = DatetimeResolver::new(&options);

        Ok(Self {
            options,
            resolver,
            filename_generator,
            console,
            claimed: HashSet::new(),
            summary: RunSummary::default(),
        })
    }

    /// Rename every supported file under `roots.source` into `roots.target`.
    pub fn process(&mut self, roots: &Roots) -> RunSummary {
        info!(
            "Renaming {} -> {} (recursive: {}, dry run: {})",
            roots.source.display(),
            roots.target.display(),
            self.options.recursive,
            self.options.dry_run
        );

        if roots.is_same() {
            self.warn(&Warning::SamePaths);
        }

        let visited_dirs = self.walk(&roots.source, &roots.target);

        if self.options.delete_empty {
            // Pre-order reversed: children always come before their parent.
            for dir in visited_dirs.iter().rev() {
                self.remove_if_empty(dir);
            }
            self.remove_if_empty(&roots.source);
        }

        self.console.flush();
        std::mem::take(&mut self.summary)
    }

    fn walk(&mut self, source: &Path, target: &Path) -> Vec<PathBuf> {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        // Sorting makes walkdir read each directory in full before yielding
        // from it, so files renamed in place are not visited twice.
        let walker = WalkDir::new(source)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || entry.path() != target);

        let mut visited_dirs = Vec::new();
        for entry in walker {
            self.console.separate();

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.console.line(format!("Failed to read entry: {}", e));
                    self.summary.failed += 1;
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            let mirrored = target.join(relative);
            let file_type = entry.file_type();

            if file_type.is_file() {
                let target_dir = mirrored.parent().unwrap_or(target).to_path_buf();
                self.process_file(entry.path(), &name, &target_dir);
            } else if file_type.is_dir() {
                if !self.options.recursive {
                    debug!("Not entering {} (recursion disabled)", entry.path().display());
                    continue;
                }
                self.console.line(format!("Entering directory: \"{}\"", name));
                self.mirror_directory(&mirrored);
                visited_dirs.push(entry.into_path());
            } else {
                self.console
                    .line(format!("Not a file or directory: \"{}\"", name));
                self.summary.skipped += 1;
            }
        }
        visited_dirs
    }

    fn mirror_directory(&mut self, mirrored: &Path) {
        if mirrored.exists() || self.options.dry_run {
            return;
        }
        match fs::create_dir(mirrored) {
            Ok(()) => {
                debug!("Created {}", mirrored.display());
                self.summary.directories_created += 1;
            }
            Err(e) => {
                self.console.line(format!(
                    "Failed to create directory \"{}\": {}",
                    mirrored.display(),
                    e
                ));
                self.summary.failed += 1;
            }
        }
    }

    fn process_file(&mut self, file_path: &Path, name: &str, target_dir: &Path) {
        let (kind, target_extension) = match classify_file(file_path) {
            MediaFile::Supported {
                kind,
                target_extension,
            } => (kind, target_extension),
            MediaFile::Unsupported { .. } => {
                self.console
                    .line(format!("Unsupported extension: \"{}\"", name));
                self.summary.skipped += 1;
                return;
            }
        };

        let resolution = match self.resolver.resolve(file_path, kind) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.console.line(format!("Failed: \"{}\" ({})", name, e));
                self.summary.failed += 1;
                return;
            }
        };
        for warning in &resolution.warnings {
            self.warn(warning);
        }

        let stamp = self.filename_generator.stamp(&resolution, self.options.dual);
        let generated = self.filename_generator.generate_filename(
            &stamp,
            target_extension,
            target_dir,
            file_path,
            &self.claimed,
        );
        if let Some(postfix) = &generated.postfix {
            self.warn(&Warning::PostfixAdded {
                postfix: postfix.clone(),
            });
        }

        let target_path = target_dir.join(&generated.file_name);
        debug!("Generated filename: '{}'", generated.file_name);

        if target_path == file_path {
            self.console.line(format!("Already named: \"{}\"", name));
            self.summary.unchanged += 1;
            return;
        }

        let prefix = if self.options.dry_run { "[DRY RUN] " } else { "" };
        self.console.line(format!(
            "{}\t\"{}\" -> \"{}\"",
            prefix, name, generated.file_name
        ));

        if !self.options.dry_run {
            if let Err(e) = move_file(file_path, &target_path) {
                self.console.line(format!(
                    "Failed to move \"{}\" to \"{}\": {}",
                    name,
                    target_path.display(),
                    e
                ));
                self.summary.failed += 1;
                return;
            }
        }
        self.claimed.insert(target_path);
        self.summary.renamed += 1;
    }

    fn remove_if_empty(&mut self, dir: &Path) {
        let is_empty = match fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                debug!("Cannot inspect {}: {}", dir.display(), e);
                return;
            }
        };
        if !is_empty {
            return;
        }
        if self.options.dry_run {
            self.console.line(format!(
                "[DRY RUN] Removing empty directory: \"{}\"",
                dir.display()
            ));
            return;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                self.console
                    .line(format!("Removed empty directory: \"{}\"", dir.display()));
                self.summary.directories_removed += 1;
            }
            Err(e) => {
                self.console.line(format!(
                    "Failed to remove directory \"{}\": {}",
                    dir.display(),
                    e
                ));
                self.summary.failed += 1;
            }
        }
    }

    fn warn(&mut self, warning: &Warning) {
        if !self.console.is_muted(warning.code()) {
            self.summary.warnings += 1;
        }
        self.console.warn(warning);
    }
}
