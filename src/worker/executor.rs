//! Parallel task execution on a dedicated Rayon pool.
//!
//! Tasks are spread over the pool's work-stealing threads. Every task sends
//! exactly one [`TaskResult`] back, success or failure, so the collector on
//! the other end of the channel always sees the whole batch.

use flume::Sender;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::error;

use crate::error::TemplateError;
use crate::types::{Task, TaskResult};

pub struct Executor {
    pool: ThreadPool,
}

impl Executor {
    /// Starts a pool with exactly `threads` workers.
    pub fn new(threads: usize) -> Result<Self, TemplateError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tdmcli-worker-{i}"))
            .panic_handler(|_| error!("worker thread panicked"))
            .build()
            .map_err(|e| TemplateError::Config(format!("cannot start worker pool: {e}")))?;

        Ok(Self { pool })
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `job` for every task in the background and returns immediately.
    ///
    /// The channel closes once the last task has reported, which is how the
    /// collector learns that the batch is finished.
    pub fn spawn<T, R, F>(&self, tasks: Vec<Task<T>>, job: F, results: Sender<TaskResult<R>>)
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&str, T) -> Result<R, TemplateError> + Send + Sync + 'static,
    {
        self.pool.spawn(move || {
            tasks.into_par_iter().for_each_with(results, |results, task| {
                let Task { index, path, payload } = task;
                let result = match job(&path, payload) {
                    Ok(value) => TaskResult::ok(index, path, value),
                    Err(e) => TaskResult::err(index, path, e),
                };

                // The collector only hangs up when it has given up on the batch.
                let _ = results.send(result);
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use flume::unbounded;

    use super::*;

    #[test]
    fn test_runs_every_task() {
        let executor = Executor::new(3).unwrap();
        assert_eq!(executor.threads(), 3);

        let tasks: Vec<Task<u64>> = (0..100).map(|i| Task::new(i, format!("f{i}"), i)).collect();
        let (tx, rx) = unbounded();
        executor.spawn(tasks, |_, n| Ok(n * 2), tx);

        let mut doubled: Vec<u64> = rx.iter().map(|r| r.outcome.unwrap()).collect();
        doubled.sort_unstable();
        assert_eq!(doubled, (0..100).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let executor = Executor::new(2).unwrap();
        let tasks: Vec<Task<u64>> = (0..10).map(|i| Task::new(i, format!("f{i}"), i)).collect();
        let (tx, rx) = unbounded();
        executor.spawn(tasks, |path, n| if n % 3 == 0 { Err(TemplateError::Unframeable(path.to_owned())) } else { Ok(n) }, tx);

        let results: Vec<TaskResult<u64>> = rx.iter().collect();
        assert_eq!(results.len(), 10);
        assert_eq!(results.iter().filter(|r| r.outcome.is_err()).count(), 4);
    }

    #[test]
    fn test_empty_batch_closes_channel() {
        let executor = Executor::new(1).unwrap();
        let (tx, rx) = unbounded::<TaskResult<()>>();
        executor.spawn(Vec::<Task<()>>::new(), |_, ()| Ok(()), tx);
        assert_eq!(rx.iter().count(), 0);
    }
}
