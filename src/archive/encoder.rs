//! Record framing for the build side.

use crate::archive::{Entry, check_framable};
use crate::config::{DIR_MARKER, END_OF_DIR, END_OF_FILE, FILE_MARKER, SIZE_MARKER};
use crate::error::TemplateError;

/// Builds the `FILE:` and `SIZE:` lines that precede a ciphertext.
pub fn file_header(relative_path: &str, ciphertext_len: usize) -> Result<Vec<u8>, TemplateError> {
    check_framable(relative_path)?;

    let size = ciphertext_len.to_string();
    let mut header = Vec::with_capacity(FILE_MARKER.len() + relative_path.len() + SIZE_MARKER.len() + size.len() + 2);
    header.extend_from_slice(FILE_MARKER);
    header.extend_from_slice(relative_path.as_bytes());
    header.push(b'\n');
    header.extend_from_slice(SIZE_MARKER);
    header.extend_from_slice(size.as_bytes());
    header.push(b'\n');

    Ok(header)
}

/// Frames a complete file record.
pub fn frame_file(entry: &Entry) -> Result<Vec<u8>, TemplateError> {
    let mut record = file_header(&entry.relative_path, entry.ciphertext.len())?;
    record.reserve(entry.ciphertext.len() + END_OF_FILE.len());
    record.extend_from_slice(&entry.ciphertext);
    record.extend_from_slice(END_OF_FILE);
    Ok(record)
}

/// Frames a directory record.
pub fn frame_dir(relative_path: &str) -> Result<Vec<u8>, TemplateError> {
    check_framable(relative_path)?;

    let mut record = Vec::with_capacity(DIR_MARKER.len() + relative_path.len() + 1 + END_OF_DIR.len());
    record.extend_from_slice(DIR_MARKER);
    record.extend_from_slice(relative_path.as_bytes());
    record.push(b'\n');
    record.extend_from_slice(END_OF_DIR);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{Cipher, Key};

    #[test]
    fn test_frame_file_layout() {
        let entry = Entry { relative_path: "src/main.rs".into(), plaintext_size: 3, ciphertext: b"xyz".to_vec() };
        assert_eq!(frame_file(&entry).unwrap(), b"FILE: src/main.rs\nSIZE: 3\nxyz\nEND_OF_FILE\n");
    }

    #[test]
    fn test_frame_empty_file() {
        let entry = Entry::seal("a.txt", Vec::new(), &Cipher::default());
        assert_eq!(frame_file(&entry).unwrap(), b"FILE: a.txt\nSIZE: 0\n\nEND_OF_FILE\n");
    }

    #[test]
    fn test_size_is_ciphertext_length() {
        let cipher = Cipher::new(Key::new(b"k").unwrap());
        let entry = Entry::seal("data.bin", vec![7; 1234], &cipher);
        let record = frame_file(&entry).unwrap();
        assert!(record.starts_with(b"FILE: data.bin\nSIZE: 1234\n"));
        assert_eq!(record.len(), b"FILE: data.bin\nSIZE: 1234\n".len() + 1234 + END_OF_FILE.len());
    }

    #[test]
    fn test_frame_dir() {
        assert_eq!(frame_dir("empty/dir").unwrap(), b"DIR: empty/dir\nEND_OF_DIR\n");
    }

    #[test]
    fn test_unframeable_paths() {
        assert!(matches!(file_header("a\nb", 0), Err(TemplateError::Unframeable(_))));
        assert!(matches!(frame_dir(""), Err(TemplateError::Unframeable(_))));
    }
}
