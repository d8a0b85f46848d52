use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::TemplateError;

#[must_use = "the returned BufWriter should be used to write to the file"]
pub fn create_file(path: &Path) -> Result<BufWriter<File>, TemplateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TemplateError::io(parent, e))?;
    }

    let file = OpenOptions::new().write(true).create(true).truncate(true).open(path).map_err(|e| TemplateError::io(path, e))?;

    Ok(BufWriter::new(file))
}

/// Reads the whole contents of a source file.
pub fn read_source(path: &Path) -> Result<Vec<u8>, TemplateError> {
    fs::read(path).map_err(|e| TemplateError::io(path, e))
}

/// Joins an archive path onto the destination root.
///
/// Archive paths are validated by the decoder, so the result stays below `root`.
#[inline]
#[must_use]
pub fn resolve_output(root: &Path, relative: &str) -> PathBuf {
    root.join(relative)
}

/// Writes `contents` to `root/relative`, creating missing parent directories.
pub fn write_output(root: &Path, relative: &str, contents: &[u8]) -> Result<PathBuf, TemplateError> {
    let path = resolve_output(root, relative);

    let mut writer = create_file(&path)?;
    writer.write_all(contents).map_err(|e| TemplateError::io(&path, e))?;
    writer.flush().map_err(|e| TemplateError::io(&path, e))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = write_output(dir.path(), "a/b/c.txt", b"Hello, World!").unwrap();

        assert_eq!(path, dir.path().join("a/b/c.txt"));
        assert_eq!(fs::read(&path).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_write_truncates_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x"), b"a much longer previous body").unwrap();

        write_output(dir.path(), "x", b"short").unwrap();
        assert_eq!(fs::read(dir.path().join("x")).unwrap(), b"short");
    }

    #[test]
    fn test_write_empty_file() {
        let dir = tempdir().unwrap();
        write_output(dir.path(), "empty", b"").unwrap();
        assert_eq!(fs::metadata(dir.path().join("empty")).unwrap().len(), 0);
    }

    #[test]
    fn test_read_missing_source() {
        let err = read_source(Path::new("/nonexistent/path/file.txt")).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_FOUND);
    }
}
