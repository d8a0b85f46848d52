//! Template archive format.
//!
//! An archive is a flat sequence of records with no header or trailer:
//!
//! ```text
//! DIR: <relative path>\n          (one per preserved empty directory)
//! END_OF_DIR\n
//! FILE: <relative path>\n         (one per file)
//! SIZE: <ciphertext length>\n
//! <ciphertext>
//! \nEND_OF_FILE\n
//! ```
//!
//! Record order carries no meaning. The markers are textual, so a ciphertext
//! that itself contains `\nEND_OF_FILE\n` or a line starting with a marker is
//! ambiguous to a line-oriented reader; [`is_ambiguous`] detects those. The
//! [`decoder`] is driven by the `SIZE` field and checks the trailer at the
//! declared offset, which keeps intact archives readable.

use std::path::{Component, Path};

use crate::cipher::Cipher;
use crate::config::{DIR_MARKER, END_OF_FILE, FILE_MARKER, SIZE_MARKER};
use crate::error::TemplateError;

pub mod decoder;
pub mod encoder;

pub use decoder::parse;
pub use encoder::{frame_dir, frame_file};

/// One obfuscated file, ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the captured root, as produced by discovery.
    pub relative_path: String,

    /// Length of the original contents; always equals `ciphertext.len()`.
    pub plaintext_size: u64,

    pub ciphertext: Vec<u8>,
}

impl Entry {
    /// Obfuscates `plaintext` in place and wraps it.
    pub fn seal(relative_path: impl Into<String>, mut plaintext: Vec<u8>, cipher: &Cipher) -> Self {
        cipher.apply_in_place(&mut plaintext);
        Self { relative_path: relative_path.into(), plaintext_size: plaintext.len() as u64, ciphertext: plaintext }
    }

    /// True when the ciphertext could be misread by a line-oriented reader.
    #[inline]
    pub fn is_ambiguous(&self) -> bool {
        is_ambiguous(&self.ciphertext)
    }
}

/// A record borrowed from an archive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    File { path: &'a str, ciphertext: &'a [u8], offset: usize },
    Dir { path: &'a str, offset: usize },
}

impl<'a> Record<'a> {
    #[inline]
    pub fn path(&self) -> &'a str {
        match self {
            Self::File { path, .. } | Self::Dir { path, .. } => path,
        }
    }

    /// Byte offset of the record's first marker.
    #[inline]
    pub fn offset(&self) -> usize {
        match self {
            Self::File { offset, .. } | Self::Dir { offset, .. } => *offset,
        }
    }
}

/// Detects ciphertexts that contain the file trailer or a line that begins with a record marker.
pub fn is_ambiguous(ciphertext: &[u8]) -> bool {
    if ciphertext.windows(END_OF_FILE.len()).any(|w| w == END_OF_FILE) {
        return true;
    }

    let starts_marker = |line: &[u8]| [FILE_MARKER, SIZE_MARKER, DIR_MARKER].iter().any(|m| line.starts_with(m));
    ciphertext.split(|&b| b == b'\n').any(starts_marker)
}

/// Checks that a path can be written into a record.
pub(crate) fn check_framable(path: &str) -> Result<(), TemplateError> {
    if path.is_empty() || path.contains('\n') {
        return Err(TemplateError::Unframeable(path.to_owned()));
    }
    Ok(())
}

/// Validates a path read from an archive and returns it as text.
///
/// The path must be UTF-8, non-empty, relative and free of `..` so that
/// applying a template never writes outside the destination root.
pub(crate) fn checked_path(raw: &[u8], offset: usize) -> Result<&str, TemplateError> {
    let path = std::str::from_utf8(raw).map_err(|_| TemplateError::malformed(offset, "path is not valid UTF-8"))?;
    if path.is_empty() {
        return Err(TemplateError::malformed(offset, "empty path"));
    }

    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(TemplateError::malformed(offset, format!("path escapes destination: {path}"))),
            Component::RootDir | Component::Prefix(_) => return Err(TemplateError::malformed(offset, format!("absolute path: {path}"))),
        }
    }

    Ok(path)
}

/// Like [`checked_path`], and the path must also name a file: at least one
/// normal component and no trailing separator.
pub(crate) fn checked_file_path(raw: &[u8], offset: usize) -> Result<&str, TemplateError> {
    let path = checked_path(raw, offset)?;

    let has_name = Path::new(path).components().any(|c| matches!(c, Component::Normal(_)));
    if !has_name || path.ends_with(['/', '\\']) {
        return Err(TemplateError::malformed(offset, format!("not a file path: {path}")));
    }

    Ok(path)
}
