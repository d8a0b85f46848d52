//! Record scanning for the apply side.
//!
//! The whole archive is held in memory. Scanning walks it line by line until
//! it meets a record marker, then consumes the record using the declared
//! `SIZE` and resumes right after the record's trailer. Lines outside records
//! are skipped.

use tracing::trace;

use crate::archive::{Record, checked_file_path, checked_path};
use crate::config::{DIR_MARKER, END_OF_DIR, END_OF_FILE, FILE_MARKER, SIZE_MARKER};
use crate::error::TemplateError;

/// Parses every record of `data`.
///
/// # Errors
///
/// Returns [`TemplateError::Malformed`] for the first record that violates the
/// framing: a `FILE:` line not followed by `SIZE:`, a `SIZE:` line with no
/// `FILE:`, a size that is not a decimal number or exceeds the remaining
/// bytes, a missing trailer, or a path that is not a safe relative path.
pub fn parse(data: &[u8]) -> Result<Vec<Record<'_>>, TemplateError> {
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let (line, next) = line_at(data, pos);

        if let Some(raw_path) = line.strip_prefix(FILE_MARKER) {
            let (record, end) = parse_file(data, pos, raw_path, next)?;
            records.push(record);
            pos = end;
        } else if let Some(raw_path) = line.strip_prefix(DIR_MARKER) {
            let (record, end) = parse_dir(data, pos, raw_path, next)?;
            records.push(record);
            pos = end;
        } else if line.starts_with(SIZE_MARKER) {
            return Err(TemplateError::malformed(pos, "SIZE line without a preceding FILE line"));
        } else {
            trace!(offset = pos, len = line.len(), "skipping line outside a record");
            pos = next.unwrap_or(data.len());
        }
    }

    Ok(records)
}

fn parse_file<'a>(data: &'a [u8], offset: usize, raw_path: &'a [u8], next: Option<usize>) -> Result<(Record<'a>, usize), TemplateError> {
    let size_start = next.ok_or_else(|| TemplateError::malformed(offset, "archive ends inside a FILE line"))?;
    let path = checked_file_path(raw_path, offset)?;

    let (size_line, body_start) = line_at(data, size_start);
    let digits = size_line
        .strip_prefix(SIZE_MARKER)
        .ok_or_else(|| TemplateError::malformed(size_start, format!("expected SIZE line after FILE: {path}")))?;
    let body_start = body_start.ok_or_else(|| TemplateError::malformed(size_start, "archive ends inside a SIZE line"))?;
    let size = parse_size(digits, size_start)?;

    let remaining = data.len() - body_start;
    let body_end = body_start
        .checked_add(size)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| TemplateError::malformed(size_start, format!("declared SIZE {size} exceeds the {remaining} remaining bytes for {path}")))?;

    if !data[body_end..].starts_with(END_OF_FILE) {
        return Err(TemplateError::malformed(body_end, format!("missing END_OF_FILE after {size} bytes of {path}")));
    }

    let record = Record::File { path, ciphertext: &data[body_start..body_end], offset };
    Ok((record, body_end + END_OF_FILE.len()))
}

fn parse_dir<'a>(data: &'a [u8], offset: usize, raw_path: &'a [u8], next: Option<usize>) -> Result<(Record<'a>, usize), TemplateError> {
    let end_start = next.ok_or_else(|| TemplateError::malformed(offset, "archive ends inside a DIR line"))?;
    let path = checked_path(raw_path, offset)?;

    if !data[end_start..].starts_with(END_OF_DIR) {
        return Err(TemplateError::malformed(end_start, format!("missing END_OF_DIR after DIR: {path}")));
    }

    Ok((Record::Dir { path, offset }, end_start + END_OF_DIR.len()))
}

fn parse_size(digits: &[u8], offset: usize) -> Result<usize, TemplateError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(TemplateError::malformed(offset, format!("invalid SIZE value {:?}", String::from_utf8_lossy(digits))));
    }

    // ASCII digits are valid UTF-8.
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| TemplateError::malformed(offset, "SIZE value out of range"))
}

/// Returns the line starting at `pos` without its newline, and the offset of
/// the following line when the line is newline-terminated.
fn line_at(data: &[u8], pos: usize) -> (&[u8], Option<usize>) {
    let rest = &data[pos..];
    match rest.iter().position(|&b| b == b'\n') {
        Some(i) => (&rest[..i], Some(pos + i + 1)),
        None => (rest, None),
    }
}
