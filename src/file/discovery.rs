//! Tree walking.
//!
//! Produces every non-directory entry under a root as a root-relative path.
//! Symbolic links are followed; whether a file can actually be read is only
//! found out when the build reads it. Entries the walker cannot stat are
//! logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::IGNORE_FILE;
use crate::error::TemplateError;
use crate::file::ignore::IgnoreRules;

/// Filters applied while walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend into directories whose name starts with a dot.
    pub include_hidden: bool,

    /// Archive the root's `.tdmignore` itself.
    pub include_ignore_file: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self { include_hidden: true, include_ignore_file: true }
    }
}

/// A file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path used to read the file.
    pub absolute: PathBuf,

    /// Path stored in the archive.
    pub relative: String,
}

/// Everything a walk found.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<SourceFile>,

    /// Directories with no visible children, root-relative.
    pub empty_dirs: Vec<String>,
}

/// Walks `root` recursively.
///
/// # Errors
///
/// [`TemplateError::NotFound`] when `root` is not a directory, or an I/O error
/// when the ignore file exists but cannot be read.
pub fn discover(root: &Path, options: &WalkOptions) -> Result<Discovery, TemplateError> {
    if !root.is_dir() {
        return Err(TemplateError::NotFound(root.to_path_buf()));
    }

    let rules = IgnoreRules::load(root)?;
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(root).follow_links(true).min_depth(1).into_iter().filter_entry(|entry| !is_pruned(entry, root, options, &rules));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let relative = relative_path(entry.path(), root);

        if entry.file_type().is_dir() {
            if is_empty_dir(entry.path(), root, options, &rules) {
                debug!(path = %relative, "empty directory");
                discovery.empty_dirs.push(relative);
            }
            continue;
        }

        if entry.depth() == 1 && entry.file_name() == IGNORE_FILE {
            if options.include_ignore_file {
                discovery.files.push(SourceFile { absolute: entry.into_path(), relative });
            }
            continue;
        }

        if rules.is_ignored(&relative) {
            debug!(path = %relative, "ignored");
            continue;
        }

        discovery.files.push(SourceFile { absolute: entry.into_path(), relative });
    }

    debug!(files = discovery.files.len(), empty_dirs = discovery.empty_dirs.len(), root = %root.display(), "walk finished");

    Ok(discovery)
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().into_owned()
}

#[inline]
fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Decides whether a directory is skipped together with its contents.
fn is_pruned(entry: &DirEntry, root: &Path, options: &WalkOptions, rules: &IgnoreRules) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    if !options.include_hidden && is_hidden_name(entry.file_name()) {
        return true;
    }

    rules.is_ignored(&relative_path(entry.path(), root))
}

fn is_empty_dir(path: &Path, root: &Path, options: &WalkOptions, rules: &IgnoreRules) -> bool {
    let Ok(children) = fs::read_dir(path) else {
        return false;
    };

    !children.flatten().any(|child| {
        if !options.include_hidden && is_hidden_name(&child.file_name()) && child.path().is_dir() {
            return false;
        }
        !rules.is_ignored(&relative_path(&child.path(), root))
    })
}
