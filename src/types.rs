//! Common type definitions for tdmcli.
//!
//! - [`Operation`]: which pipeline is running, with its labels
//! - [`Task`]: one unit of per-file work handed to the dispatcher
//! - [`TaskResult`]: the tagged outcome of a task

use std::fmt::{Display, Formatter, Result};

use crate::error::{TaskFailure, TemplateError};

/// The two archive pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Building an archive from a directory tree.
    Create,

    /// Reconstituting a tree from an archive.
    Apply,
}

impl Operation {
    /// Progress label for the operation.
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "Creating template",
            Self::Apply => "Applying template",
        }
    }
}

impl Display for Operation {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.label())
    }
}

/// A unit of work: one file to encode or one record to decode.
#[derive(Debug)]
pub struct Task<T> {
    /// Submission order, kept for diagnostics.
    pub index: u64,

    /// Relative path the task concerns.
    pub path: String,

    pub payload: T,
}

impl<T> Task<T> {
    #[inline]
    pub fn new(index: u64, path: impl Into<String>, payload: T) -> Self {
        Self { index, path: path.into(), payload }
    }
}

/// Outcome of a [`Task`]. Failures travel as values so the collector can
/// keep receiving after one task went wrong.
#[derive(Debug)]
pub struct TaskResult<R> {
    pub index: u64,

    pub path: String,

    pub outcome: std::result::Result<R, TemplateError>,
}

impl<R> TaskResult<R> {
    #[inline]
    pub fn ok(index: u64, path: String, value: R) -> Self {
        Self { index, path, outcome: Ok(value) }
    }

    #[inline]
    pub fn err(index: u64, path: String, error: TemplateError) -> Self {
        Self { index, path, outcome: Err(error) }
    }

    /// Splits into the value or a reportable failure.
    pub fn into_outcome(self) -> std::result::Result<(String, R), TaskFailure> {
        match self.outcome {
            Ok(value) => Ok((self.path, value)),
            Err(e) => Err(TaskFailure { index: self.index, path: self.path, error: e.to_string() }),
        }
    }
}
