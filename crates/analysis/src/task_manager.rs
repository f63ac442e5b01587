// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Task manager
//!
//! A fixed-size worker pool with per-task result handles and a FIFO queue of
//! finalizers.
//!
//! Tasks run on the pool and only compute. Their results travel back over a
//! oneshot channel and are consumed on the draining thread, in submission
//! order, by the finalizer registered with each task. Finalizers are the only
//! code that touches shared state, so the drain is the only synchronisation
//! point.
//!
//! ```rust
//! use schemadiff_analysis::{TaskManager, TaskQueue};
//!
//! let manager = TaskManager::new(2).unwrap();
//! let mut queue = TaskQueue::new();
//! for n in 1..=3u32 {
//!     manager.submit_with_finalizer(&mut queue, move || n * 10, |value, out: &mut Vec<u32>| {
//!         out.push(value)
//!     });
//! }
//!
//! let mut out = Vec::new();
//! assert_eq!(manager.finish(queue, &mut out).unwrap(), 3);
//! assert_eq!(out, vec![10, 20, 30]);
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TaskError;

/// Bounded worker pool with cooperative cancellation
pub struct TaskManager {
    pool: ThreadPool,
    cancel: CancellationToken,
}

impl TaskManager {
    /// Create a pool with `threads` workers (at least one)
    pub fn new(threads: usize) -> Result<Self, TaskError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("schemadiff-analysis-{}", index))
            .build()
            .map_err(|e| TaskError::PoolBuild(e.to_string()))?;
        debug!(threads, "Created analysis worker pool");
        Ok(Self {
            pool,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `task` on the pool
    ///
    /// The task does not start if cancellation was requested before a worker
    /// picked it up; its handle then yields `TaskError::Cancelled`.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let cancel = self.cancel.clone();
        self.pool.spawn(move || {
            let result = if cancel.is_cancelled() {
                Err(TaskError::Cancelled)
            } else {
                panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|payload| TaskError::WorkerPanicked(panic_message(payload.as_ref())))
            };
            if sender.send(result).is_err() {
                debug!("Task result dropped, handle no longer awaited");
            }
        });
        TaskHandle { receiver }
    }

    /// Run `task` on the pool and queue `finalizer` for its result
    pub fn submit_with_finalizer<'f, T, S, F, G>(
        &self,
        queue: &mut TaskQueue<'f, T, S>,
        task: F,
        finalizer: G,
    ) where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        G: FnOnce(T, &mut S) + 'f,
    {
        let handle = self.submit(task);
        queue.entries.push_back((handle, Box::new(finalizer)));
    }

    /// Drain `queue` in submission order, running each finalizer on `state`
    ///
    /// Returns the number of finalizers run.
    ///
    /// # Errors
    ///
    /// `TaskError::Cancelled` once cancellation is observed; remaining entries
    /// are dropped. `TaskError::WorkerPanicked` or `TaskError::Disconnected`
    /// for an infrastructure failure, which also stops the drain.
    pub fn finish<'f, T, S>(
        &self,
        mut queue: TaskQueue<'f, T, S>,
        state: &mut S,
    ) -> Result<usize, TaskError> {
        let mut drained = 0;
        while let Some((handle, finalizer)) = queue.entries.pop_front() {
            if self.cancel.is_cancelled() {
                warn!(
                    drained,
                    dropped = queue.entries.len() + 1,
                    "Cancellation requested, abandoning queued tasks"
                );
                return Err(TaskError::Cancelled);
            }
            match handle.join() {
                Ok(value) => {
                    finalizer(value, state);
                    drained += 1;
                }
                Err(TaskError::Cancelled) => {
                    warn!(drained, "Queued task was cancelled before it started");
                    return Err(TaskError::Cancelled);
                }
                Err(err) => {
                    error!(error = %err, drained, "Worker failure, aborting drain");
                    return Err(err);
                }
            }
        }
        Ok(drained)
    }
}

/// Pending result of one submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has run
    ///
    /// Must not be called from inside an async runtime.
    pub fn join(self) -> Result<T, TaskError> {
        self.receiver
            .blocking_recv()
            .map_err(|_| TaskError::Disconnected)?
    }
}

type Finalizer<'f, T, S> = Box<dyn FnOnce(T, &mut S) + 'f>;

/// FIFO of submitted tasks and the finalizers for their results
pub struct TaskQueue<'f, T, S> {
    entries: VecDeque<(TaskHandle<T>, Finalizer<'f, T, S>)>,
}

impl<'f, T, S> TaskQueue<'f, T, S> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'f, T, S> Default for TaskQueue<'f, T, S> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_submit_and_join() {
        let manager = TaskManager::new(2).unwrap();
        assert_eq!(manager.threads(), 2);
        let handle = manager.submit(|| 6 * 7);
        assert_eq!(handle.join(), Ok(42));
    }

    #[test]
    fn test_zero_threads_means_one() {
        let manager = TaskManager::new(0).unwrap();
        assert_eq!(manager.threads(), 1);
    }

    #[test]
    fn test_panic_becomes_error() {
        let manager = TaskManager::new(1).unwrap();
        let handle = manager.submit(|| -> u32 { panic!("walker exploded") });
        assert_eq!(
            handle.join(),
            Err(TaskError::WorkerPanicked("walker exploded".to_string()))
        );
    }

    #[test]
    fn test_cancelled_task_does_not_run() {
        let token = CancellationToken::new();
        token.cancel();
        let manager = TaskManager::new(1).unwrap().with_cancellation(token);
        let handle = manager.submit(|| 1);
        assert_eq!(handle.join(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_finish_keeps_submission_order() {
        let manager = TaskManager::new(4).unwrap();
        let mut queue = TaskQueue::new();
        for n in 0..8u64 {
            manager.submit_with_finalizer(
                &mut queue,
                move || {
                    // Earlier tasks finish later
                    thread::sleep(Duration::from_millis(8 - n));
                    n
                },
                |value, seen: &mut Vec<u64>| seen.push(value),
            );
        }
        assert_eq!(queue.len(), 8);

        let mut seen = Vec::new();
        assert_eq!(manager.finish(queue, &mut seen).unwrap(), 8);
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_finish_stops_on_cancellation() {
        let token = CancellationToken::new();
        let manager = TaskManager::new(1).unwrap().with_cancellation(token.clone());
        let mut queue = TaskQueue::new();

        let trigger = token.clone();
        manager.submit_with_finalizer(&mut queue, || 1, move |value, seen: &mut Vec<i32>| {
            seen.push(value);
            trigger.cancel();
        });
        manager.submit_with_finalizer(&mut queue, || 2, |value, seen: &mut Vec<i32>| {
            seen.push(value)
        });

        let mut seen = Vec::new();
        assert_eq!(manager.finish(queue, &mut seen), Err(TaskError::Cancelled));
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn test_finish_stops_on_panic() {
        let manager = TaskManager::new(2).unwrap();
        let mut queue = TaskQueue::new();
        manager.submit_with_finalizer(&mut queue, || panic!("boom"), |_: (), count: &mut u32| {
            *count += 1
        });
        manager.submit_with_finalizer(&mut queue, || (), |_: (), count: &mut u32| *count += 1);

        let mut count = 0;
        let err = manager.finish(queue, &mut count).unwrap_err();
        assert!(matches!(err, TaskError::WorkerPanicked(ref message) if message == "boom"));
        assert_eq!(count, 0);
    }
}
