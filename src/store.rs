//! Template store: the directory that holds named archives.
//!
//! Archives are stored as `<dir>/<name>.tdmcli`. Every operation here is a
//! plain filesystem copy, move or delete; the archive format is never read.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{APP_NAME, FILE_EXTENSION, Settings};
use crate::error::TemplateError;

/// A stored archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Opens `dir` as a store, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TemplateError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Opens the configured store: environment override, then settings, then the platform data directory.
    pub fn resolve(env_override: Option<OsString>, settings: &Settings) -> Result<Self, TemplateError> {
        Self::open(resolve_dir(env_override, settings))
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the archive called `name`, whether or not it exists.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, TemplateError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{FILE_EXTENSION}")))
    }

    /// Path of an existing archive.
    pub fn existing(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(TemplateError::NotFound(path));
        }
        Ok(path)
    }

    /// Every archive in the store, sorted by name.
    pub fn list(&self) -> Result<Vec<TemplateInfo>, TemplateError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| TemplateError::io(&self.dir, e))?;

        let mut templates: Vec<TemplateInfo> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != FILE_EXTENSION) {
                    return None;
                }
                let name = path.file_stem()?.to_string_lossy().into_owned();
                let size = entry.metadata().ok().filter(fs::Metadata::is_file)?.len();
                Some(TemplateInfo { name, path, size })
            })
            .collect();

        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    pub fn delete(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(name, "template deleted");
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TemplateError::NotFound(path)),
            Err(e) => Err(TemplateError::io(&path, e)),
        }
    }

    /// Copies an archive to `<output_dir>/<name>.tdmcli`, creating `output_dir`.
    pub fn export(&self, name: &str, output_dir: &Path) -> Result<PathBuf, TemplateError> {
        let source = self.existing(name)?;

        fs::create_dir_all(output_dir).map_err(|e| TemplateError::io(output_dir, e))?;
        let target = output_dir.join(format!("{name}.{FILE_EXTENSION}"));
        copy_archive(&source, &target)?;

        info!(name, target = %target.display(), "template exported");
        Ok(target)
    }

    /// Copies an external archive into the store. The name defaults to the file stem.
    pub fn import(&self, input: &Path, name: Option<&str>) -> Result<(String, PathBuf), TemplateError> {
        if !input.is_file() {
            return Err(TemplateError::NotFound(input.to_path_buf()));
        }

        let name = match name {
            Some(name) => name.to_owned(),
            None => input.file_stem().map(|s| s.to_string_lossy().into_owned()).ok_or_else(|| TemplateError::InvalidName(input.display().to_string()))?,
        };

        let target = self.path_of(&name)?;
        copy_archive(input, &target)?;

        info!(name, source = %input.display(), "template imported");
        Ok((name, target))
    }

    /// Opens `new_dir` as the store, optionally moving every archive across.
    ///
    /// Returns the new store and the number of archives moved.
    pub fn relocate(&self, new_dir: &Path, move_existing: bool) -> Result<(Self, usize), TemplateError> {
        let target = Self::open(new_dir)?;
        if !move_existing || same_location(&self.dir, &target.dir) {
            return Ok((target, 0));
        }

        let mut moved = 0;
        for template in self.list()? {
            let destination = target.dir.join(template.path.file_name().unwrap_or_default());
            move_file(&template.path, &destination)?;
            debug!(name = %template.name, "template moved");
            moved += 1;
        }

        info!(moved, dir = %target.dir.display(), "template directory changed");
        Ok((target, moved))
    }
}

/// Template directory selection without touching the filesystem.
pub fn resolve_dir(env_override: Option<OsString>, settings: &Settings) -> PathBuf {
    if let Some(dir) = env_override.filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(dir) = &settings.template_dir {
        return dir.clone();
    }

    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME).join("templates")
}

fn validate_name(name: &str) -> Result<(), TemplateError> {
    let invalid = name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) || name.contains('\0');
    if invalid {
        return Err(TemplateError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// True when both paths name the same file or directory.
fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copies an archive unless `from` and `to` are already the same file,
/// where copying would truncate it.
fn copy_archive(from: &Path, to: &Path) -> Result<(), TemplateError> {
    if same_location(from, to) {
        debug!(path = %to.display(), "source and target are the same file");
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| TemplateError::io(to, e))?;
    Ok(())
}

fn move_file(from: &Path, to: &Path) -> Result<(), TemplateError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    // Cross-device moves cannot be renamed.
    fs::copy(from, to).map_err(|e| TemplateError::io(to, e))?;
    fs::remove_file(from).map_err(|e| TemplateError::io(from, e))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn store_with(names: &[&str]) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("templates")).unwrap();
        for name in names {
            fs::write(store.path_of(name).unwrap(), name.as_bytes()).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("a/b")).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let (_dir, store) = store_with(&["web", "api"]);
        fs::write(store.dir().join("notes.txt"), b"not a template").unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store_with(&["old"]);
        store.delete("old").unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.delete("old"), Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_invalid_names() {
        let (_dir, store) = store_with(&[]);
        for name in ["", ".", "..", "a/b", r"a\b"] {
            assert!(matches!(store.path_of(name), Err(TemplateError::InvalidName(_))), "{name:?}");
        }
    }

    #[test]
    fn test_export_and_import() {
        let (dir, store) = store_with(&["proj"]);
        let exported = store.export("proj", &dir.path().join("out")).unwrap();
        assert_eq!(fs::read(&exported).unwrap(), b"proj");

        let (name, imported) = store.import(&exported, Some("copy")).unwrap();
        assert_eq!(name, "copy");
        assert_eq!(fs::read(imported).unwrap(), b"proj");

        let (name, _) = store.import(&exported, None).unwrap();
        assert_eq!(name, "proj");
    }

    #[test]
    fn test_import_and_export_in_place_keep_contents() {
        let (dir, store) = store_with(&["web"]);
        let stored = store.path_of("web").unwrap();

        let (name, imported) = store.import(&stored, None).unwrap();
        assert_eq!(name, "web");
        assert_eq!(imported, stored);
        assert_eq!(fs::read(&stored).unwrap(), b"web");

        let exported = store.export("web", store.dir()).unwrap();
        assert_eq!(exported, stored);
        assert_eq!(fs::read(&stored).unwrap(), b"web");

        // Same directory reached through a different spelling.
        let indirect = dir.path().join("templates/../templates");
        store.export("web", &indirect).unwrap();
        assert_eq!(fs::read(&stored).unwrap(), b"web");
    }

    #[test]
    fn test_export_missing() {
        let (dir, store) = store_with(&[]);
        assert!(matches!(store.export("ghost", dir.path()), Err(TemplateError::NotFound(_))));
        assert!(matches!(store.import(&dir.path().join("ghost.tdmcli"), None), Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_relocate() {
        let (dir, store) = store_with(&["a", "b"]);

        let (moved_store, moved) = store.relocate(&dir.path().join("new"), true).unwrap();
        assert_eq!(moved, 2);
        assert_eq!(moved_store.list().unwrap().len(), 2);
        assert!(store.list().unwrap().is_empty());

        let (kept_store, moved) = moved_store.relocate(&dir.path().join("other"), false).unwrap();
        assert_eq!(moved, 0);
        assert!(kept_store.list().unwrap().is_empty());
        assert_eq!(moved_store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_dir_precedence() {
        let settings = Settings { template_dir: Some(PathBuf::from("/from/config")), ..Settings::default() };

        assert_eq!(resolve_dir(Some(OsString::from("/from/env")), &settings), PathBuf::from("/from/env"));
        assert_eq!(resolve_dir(None, &settings), PathBuf::from("/from/config"));
        assert_eq!(resolve_dir(Some(OsString::new()), &settings), PathBuf::from("/from/config"));
        assert!(resolve_dir(None, &Settings::default()).ends_with("tdmcli/templates"));
    }
}
