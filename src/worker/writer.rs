//! Archive output on the build side.
//!
//! The writer is the only owner of the archive handle. Workers hand it
//! finished [`Entry`] values through the batch and it appends them in the
//! order they complete.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::archive::{Entry, encoder};
use crate::config::END_OF_FILE;
use crate::error::{TaskFailure, TemplateError};
use crate::ui::progress::Bar;
use crate::worker::Batch;

/// What the writer produced.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// File records written.
    pub records: usize,

    /// Directory records written.
    pub dirs: usize,

    /// Plaintext bytes captured.
    pub bytes: u64,

    /// Files whose ciphertext contains record markers.
    pub ambiguous: Vec<String>,

    /// Files that could not be read or framed; they are absent from the output.
    pub failures: Vec<TaskFailure>,
}

pub struct Writer<W> {
    output: BufWriter<W>,
    path: PathBuf,
    report: WriteReport,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    /// Wraps `output`; `path` is only used in error messages.
    pub fn new(output: W, path: impl AsRef<Path>) -> Self {
        Self { output: BufWriter::new(output), path: path.as_ref().to_path_buf(), report: WriteReport::default() }
    }

    pub async fn write_dir(&mut self, relative: &str) -> Result<(), TemplateError> {
        let record = encoder::frame_dir(relative)?;
        self.output.write_all(&record).await.map_err(|e| TemplateError::io(&self.path, e))?;
        self.report.dirs += 1;
        Ok(())
    }

    pub async fn write_entry(&mut self, entry: &Entry) -> Result<(), TemplateError> {
        let header = encoder::file_header(&entry.relative_path, entry.ciphertext.len())?;

        let io = |e: std::io::Error| TemplateError::io(&self.path, e);
        self.output.write_all(&header).await.map_err(io)?;
        self.output.write_all(&entry.ciphertext).await.map_err(io)?;
        self.output.write_all(END_OF_FILE).await.map_err(io)?;

        self.report.records += 1;
        self.report.bytes += entry.plaintext_size;
        debug!(path = %entry.relative_path, size = entry.plaintext_size, "record written");
        Ok(())
    }

    /// Appends every successful entry of `batch` as it completes.
    ///
    /// Every task is awaited even after a failure. Task failures are returned
    /// in the report; an error writing the archive itself is returned as the
    /// error once the batch has drained.
    pub async fn write_all(mut self, mut batch: Batch<Entry>, progress: &Bar) -> Result<WriteReport, TemplateError> {
        let mut write_error = None;

        while let Some(result) = batch.next().await {
            progress.add(1);

            match result.into_outcome() {
                Ok((path, entry)) => {
                    if write_error.is_some() {
                        continue;
                    }

                    if entry.is_ambiguous() {
                        warn!(path = %path, "contents contain record markers; line-oriented readers will misparse this record");
                        self.report.ambiguous.push(path);
                    }

                    if let Err(e) = self.write_entry(&entry).await {
                        write_error = Some(e);
                    }
                }
                Err(failure) => {
                    warn!(path = %failure.path, error = %failure.error, "file skipped");
                    self.report.failures.push(failure);
                }
            }
        }

        self.report.failures.extend(batch.missing());
        self.report.failures.sort_by_key(|failure| failure.index);

        if let Some(e) = write_error {
            return Err(e);
        }

        self.output.flush().await.map_err(|e| TemplateError::io(&self.path, e))?;
        Ok(self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::parse;
    use crate::cipher::Cipher;
    use crate::types::Task;
    use crate::worker::Dispatcher;

    #[tokio::test]
    async fn test_write_dir_and_entry() {
        let mut output = Vec::new();
        let mut writer = Writer::new(&mut output, "memory");

        writer.write_dir("empty").await.unwrap();
        writer.write_entry(&Entry { relative_path: "a".into(), plaintext_size: 2, ciphertext: b"xy".to_vec() }).await.unwrap();
        writer.output.flush().await.unwrap();
        drop(writer);

        assert_eq!(output, b"DIR: empty\nEND_OF_DIR\nFILE: a\nSIZE: 2\nxy\nEND_OF_FILE\n");
    }

    #[tokio::test]
    async fn test_write_all_from_batch() {
        let dispatcher = Dispatcher::new(4).unwrap();
        let cipher = Cipher::default();
        let tasks: Vec<Task<Vec<u8>>> = (0..50u64).map(|i| Task::new(i, format!("dir/file-{i}.txt"), vec![b'x'; usize::try_from(i).unwrap()])).collect();
        let batch = dispatcher.dispatch(tasks, move |path, data| Ok(Entry::seal(path, data, &cipher)));

        let mut output = Vec::new();
        let report = Writer::new(&mut output, "memory").write_all(batch, &Bar::hidden()).await.unwrap();

        assert_eq!(report.records, 50);
        assert_eq!(report.bytes, (0..50).sum::<u64>());
        assert!(report.failures.is_empty());
        assert_eq!(parse(&output).unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_failed_tasks_reported_and_skipped() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let tasks = vec![Task::new(0, "ok", b"fine".to_vec()), Task::new(1, "bad\nname", b"x".to_vec())];
        let batch = dispatcher.dispatch(tasks, |path, data| {
            crate::archive::encoder::file_header(path, 0)?;
            Ok(Entry::seal(path, data, &Cipher::default()))
        });

        let mut output = Vec::new();
        let report = Writer::new(&mut output, "memory").write_all(batch, &Bar::hidden()).await.unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad\nname");
    }

    #[tokio::test]
    async fn test_ambiguous_entries_flagged() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let cipher = Cipher::default();
        // Plaintext chosen so the ciphertext is exactly the trailer.
        let plaintext = cipher.decode(END_OF_FILE);
        let batch = dispatcher.dispatch(vec![Task::new(0, "tricky.bin", plaintext)], move |path, data| Ok(Entry::seal(path, data, &cipher)));

        let mut output = Vec::new();
        let report = Writer::new(&mut output, "memory").write_all(batch, &Bar::hidden()).await.unwrap();
        assert_eq!(report.ambiguous, vec!["tricky.bin".to_owned()]);
    }
}
