//! Error taxonomy for archive operations.
//!
//! Library code returns [`TemplateError`]; the command layer wraps it in
//! `anyhow` for context and maps it back to a process exit code with
//! [`TemplateError::exit_code`].

use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Exit status for success.
pub const EXIT_OK: u8 = 0;

/// Exit status when a template or source path does not exist.
pub const EXIT_NOT_FOUND: u8 = 1;

/// Exit status when an archive violates the record framing.
pub const EXIT_MALFORMED: u8 = 2;

/// Exit status for I/O and every other failure.
pub const EXIT_IO: u8 = 3;

/// One failed task of a dispatched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Submission order of the task. Failures are reported in this order.
    pub index: u64,

    /// Relative path the task was working on.
    pub path: String,

    /// Rendered error of the task.
    pub error: String,
}

impl Display for TaskFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed archive at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} task(s) failed: {}", .0.len(), join_failures(.0))]
    TaskFailures(Vec<TaskFailure>),

    #[error("path cannot be stored in an archive: {0:?}")]
    Unframeable(String),

    #[error("invalid template name: {0:?}")]
    InvalidName(String),

    #[error("obfuscation key must not be empty")]
    EmptyKey,

    #[error("configuration error: {0}")]
    Config(String),
}

impl TemplateError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::Malformed { offset, reason: reason.into() }
    }

    /// Process exit status for this error category.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => EXIT_NOT_FOUND,
            Self::Malformed { .. } => EXIT_MALFORMED,
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            _ => EXIT_IO,
        }
    }
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Maps an `anyhow` chain to an exit status by looking for a [`TemplateError`].
#[must_use]
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
    err.chain().find_map(|cause| cause.downcast_ref::<TemplateError>()).map_or(EXIT_IO, TemplateError::exit_code)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TemplateError::NotFound(PathBuf::from("x")).exit_code(), EXIT_NOT_FOUND);
        assert_eq!(TemplateError::malformed(4, "bad size").exit_code(), EXIT_MALFORMED);
        assert_eq!(TemplateError::io("x", io::Error::from(io::ErrorKind::PermissionDenied)).exit_code(), EXIT_IO);
        assert_eq!(TemplateError::TaskFailures(Vec::new()).exit_code(), EXIT_IO);
    }

    #[test]
    fn test_exit_code_through_context() {
        let err = Err::<(), _>(TemplateError::malformed(0, "orphan SIZE line")).context("apply failed").unwrap_err();
        assert_eq!(exit_code_of(&err), EXIT_MALFORMED);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code_of(&plain), EXIT_IO);
    }

    #[test]
    fn test_task_failures_message() {
        let err = TemplateError::TaskFailures(vec![
            TaskFailure { index: 0, path: "a.txt".into(), error: "denied".into() },
            TaskFailure { index: 4, path: "b/c".into(), error: "gone".into() },
        ]);
        assert_eq!(err.to_string(), "2 task(s) failed: a.txt: denied; b/c: gone");
    }
}
