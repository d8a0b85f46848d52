use flume::{Receiver, bounded};
use tracing::{debug, warn};

use crate::config::CHANNEL_DEPTH;
use crate::error::{TaskFailure, TemplateError};
use crate::types::{Task, TaskResult};
use crate::ui::progress::Bar;
use crate::worker::executor::Executor;

pub mod executor;
pub mod writer;

pub use writer::{WriteReport, Writer};

/// Bounded worker pool for per-file work.
///
/// Workers never touch shared output. Each task reports back through a
/// [`Batch`], and the single caller that owns the batch is the only place
/// where results are consumed. Once submitted, tasks always run to
/// completion; a failing task does not cancel its siblings.
pub struct Dispatcher {
    executor: Executor,
    concurrency: usize,
}

impl Dispatcher {
    /// Creates a pool of `concurrency` threads (at least one).
    pub fn new(concurrency: usize) -> Result<Self, TemplateError> {
        let concurrency = concurrency.max(1);
        let executor = Executor::new(concurrency)?;
        debug!(concurrency, "worker pool started");

        Ok(Self { executor, concurrency })
    }

    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Submits every task and returns the handle their results arrive on.
    pub fn dispatch<T, R, F>(&self, tasks: Vec<Task<T>>, job: F) -> Batch<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&str, T) -> Result<R, TemplateError> + Send + Sync + 'static,
    {
        let total = tasks.len();
        let (sender, receiver) = bounded(self.concurrency * CHANNEL_DEPTH);
        self.executor.spawn(tasks, job, sender);

        Batch { receiver, total, received: 0 }
    }
}

/// Results of one dispatched batch, in completion order.
pub struct Batch<R> {
    receiver: Receiver<TaskResult<R>>,
    total: usize,
    received: usize,
}

impl<R> Batch<R> {
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Waits for the next completed task; `None` once every task has reported.
    pub async fn next(&mut self) -> Option<TaskResult<R>> {
        let result = self.receiver.recv_async().await.ok()?;
        self.received += 1;
        Some(result)
    }

    /// Failure for tasks that never reported, which only happens when a worker panicked.
    pub fn missing(&self) -> Option<TaskFailure> {
        let lost = self.total.saturating_sub(self.received);
        (lost > 0).then(|| {
            warn!(lost, "tasks ended without reporting");
            TaskFailure { index: u64::MAX, path: format!("<{lost} task(s)>"), error: "worker panicked before reporting".to_owned() }
        })
    }

    /// Awaits every task, then splits successes from failures.
    pub async fn drain(mut self, progress: &Bar) -> Outcomes<R> {
        let mut outcomes = Outcomes { successes: Vec::with_capacity(self.total), failures: Vec::new() };

        while let Some(result) = self.next().await {
            progress.add(1);
            match result.into_outcome() {
                Ok(success) => outcomes.successes.push(success),
                Err(failure) => {
                    warn!(path = %failure.path, error = %failure.error, "task failed");
                    outcomes.failures.push(failure);
                }
            }
        }

        outcomes.failures.extend(self.missing());
        outcomes.failures.sort_by_key(|failure| failure.index);
        outcomes
    }
}

/// Aggregated results of a drained batch.
#[derive(Debug)]
pub struct Outcomes<R> {
    pub successes: Vec<(String, R)>,
    pub failures: Vec<TaskFailure>,
}

impl<R> Outcomes<R> {
    /// Fails with every collected failure, or yields the successes.
    pub fn into_result(self) -> Result<Vec<(String, R)>, TemplateError> {
        if self.failures.is_empty() { Ok(self.successes) } else { Err(TemplateError::TaskFailures(self.failures)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(n: u64) -> Vec<Task<u64>> {
        (0..n).map(|i| Task::new(i, format!("file-{i}"), i)).collect()
    }

    #[tokio::test]
    async fn test_dispatch_collects_all() {
        let dispatcher = Dispatcher::new(4).unwrap();
        let batch = dispatcher.dispatch(tasks(1000), |_, n| Ok(n + 1));
        assert_eq!(batch.total(), 1000);

        let outcomes = batch.drain(&Bar::hidden()).await;
        assert!(outcomes.failures.is_empty());
        assert_eq!(outcomes.successes.len(), 1000);

        let sum: u64 = outcomes.successes.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, (1..=1000).sum());
    }

    #[tokio::test]
    async fn test_all_tasks_awaited_despite_failures() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let batch = dispatcher.dispatch(tasks(20), |path, n| if n == 0 || n == 7 || n == 19 { Err(TemplateError::Unframeable(path.to_owned())) } else { Ok(n) });

        let outcomes = batch.drain(&Bar::hidden()).await;
        assert_eq!(outcomes.successes.len(), 17);

        // Reported in submission order, not completion order.
        let failed: Vec<&str> = outcomes.failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec!["file-0", "file-7", "file-19"]);

        match outcomes.into_result() {
            Err(TemplateError::TaskFailures(failures)) => assert_eq!(failures.len(), 3),
            other => panic!("expected task failures, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let dispatcher = Dispatcher::new(0).unwrap();
        assert_eq!(dispatcher.concurrency(), 1);

        let outcomes = dispatcher.dispatch(tasks(3), |_, n| Ok(n)).drain(&Bar::hidden()).await;
        assert_eq!(outcomes.successes.len(), 3);
    }
}
