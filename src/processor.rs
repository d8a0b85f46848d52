//! High-level template operations: building an archive from a tree and
//! applying an archive to a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry as Slot;
use tracing::{info, warn};

use crate::archive::{Entry, Record, check_framable, parse};
use crate::cipher::{Cipher, Key};
use crate::error::TemplateError;
use crate::file::{WalkOptions, discover, read_source, write_output};
use crate::types::{Operation, Task};
use crate::ui::progress::Bar;
use crate::worker::{Dispatcher, Writer};

/// Result of [`Processor::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSummary {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,

    /// Files whose ciphertext contains record markers.
    pub ambiguous: Vec<String>,
}

/// Result of [`Processor::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,

    /// File records dropped because a later record had the same path.
    pub duplicates: usize,
}

pub struct Processor {
    cipher: Cipher,
    dispatcher: Dispatcher,
    show_progress: bool,
}

impl Processor {
    /// Creates a processor with its own pool of `workers` threads.
    pub fn new(key: Key, workers: usize) -> Result<Self, TemplateError> {
        Ok(Self { cipher: Cipher::new(key), dispatcher: Dispatcher::new(workers)?, show_progress: false })
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress(&self, total: usize, operation: Operation) -> Bar {
        if self.show_progress { Bar::new(total as u64, operation.label()) } else { Bar::hidden() }
    }

    /// Builds an archive of `root` at `destination`.
    ///
    /// The archive is staged in a temporary file next to `destination` and
    /// only moved into place when every file was captured, so a failed build
    /// never leaves a partial archive behind. All read tasks are awaited
    /// before failures are reported together.
    pub async fn create(&self, root: &Path, destination: &Path, options: &WalkOptions) -> Result<CreateSummary, TemplateError> {
        let discovery = discover(root, options)?;

        let parent = destination.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let staging = tempfile::Builder::new().prefix(".tdmcli-").suffix(".partial").tempfile_in(parent).map_err(|e| TemplateError::io(parent, e))?;
        let handle = staging.reopen().map_err(|e| TemplateError::io(staging.path(), e))?;

        let mut writer = Writer::new(tokio::fs::File::from_std(handle), destination);
        for dir in &discovery.empty_dirs {
            writer.write_dir(dir).await?;
        }

        let tasks: Vec<Task<PathBuf>> = discovery.files.into_iter().enumerate().map(|(i, file)| Task::new(i as u64, file.relative, file.absolute)).collect();
        let progress = self.progress(tasks.len(), Operation::Create);

        let cipher = self.cipher.clone();
        let batch = self.dispatcher.dispatch(tasks, move |relative, absolute| {
            check_framable(relative)?;
            let plaintext = read_source(&absolute)?;
            Ok(Entry::seal(relative, plaintext, &cipher))
        });

        let report = writer.write_all(batch, &progress).await?;
        progress.finish();

        if !report.failures.is_empty() {
            warn!(failed = report.failures.len(), archive = %destination.display(), "archive discarded");
            return Err(TemplateError::TaskFailures(report.failures));
        }

        staging.persist(destination).map_err(|e| TemplateError::io(destination, e.error))?;
        info!(files = report.records, dirs = report.dirs, bytes = report.bytes, archive = %destination.display(), "archive created");

        Ok(CreateSummary { files: report.records, dirs: report.dirs, bytes: report.bytes, ambiguous: report.ambiguous })
    }

    /// Reconstitutes the tree stored in `archive` under `destination`.
    ///
    /// The whole archive is parsed before anything is written, so a malformed
    /// archive leaves the destination untouched. When several records share a
    /// path only the last one in archive order is written.
    pub async fn apply(&self, archive: &Path, destination: &Path) -> Result<ApplySummary, TemplateError> {
        let data = match tokio::fs::read(archive).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(TemplateError::NotFound(archive.to_path_buf())),
            Err(e) => return Err(TemplateError::io(archive, e)),
        };

        let (dirs, tasks, duplicates) = plan(&data)?;
        drop(data);

        for dir in &dirs {
            let path = destination.join(dir);
            tokio::fs::create_dir_all(&path).await.map_err(|e| TemplateError::io(&path, e))?;
        }

        let progress = self.progress(tasks.len(), Operation::Apply);
        let cipher = self.cipher.clone();
        let root = destination.to_path_buf();
        let batch = self.dispatcher.dispatch(tasks, move |relative, mut contents: Vec<u8>| {
            cipher.apply_in_place(&mut contents);
            write_output(&root, relative, &contents)?;
            Ok(contents.len() as u64)
        });

        let outcomes = batch.drain(&progress).await;
        progress.finish();
        let written = outcomes.into_result()?;

        let bytes = written.iter().map(|(_, size)| size).sum();
        info!(files = written.len(), dirs = dirs.len(), bytes, destination = %destination.display(), "archive applied");

        Ok(ApplySummary { files: written.len(), dirs: dirs.len(), bytes, duplicates })
    }
}

/// Parses an archive into directories to create and one owned decode task
/// per distinct file path, the last record winning.
fn plan(data: &[u8]) -> Result<(Vec<String>, Vec<Task<Vec<u8>>>, usize), TemplateError> {
    let records = parse(data)?;

    let mut dirs = Vec::new();
    let mut files: Vec<(&str, &[u8])> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = 0;

    for record in records {
        match record {
            Record::Dir { path, .. } => dirs.push(path.to_owned()),
            Record::File { path, ciphertext, offset } => match slots.entry(path) {
                Slot::Occupied(slot) => {
                    warn!(path, offset, "duplicate path, keeping the later record");
                    files[*slot.get()] = (path, ciphertext);
                    duplicates += 1;
                }
                Slot::Vacant(slot) => {
                    slot.insert(files.len());
                    files.push((path, ciphertext));
                }
            },
        }
    }

    let tasks = files.into_iter().enumerate().map(|(i, (path, ciphertext))| Task::new(i as u64, path, ciphertext.to_vec())).collect();

    Ok((dirs, tasks, duplicates))
}
