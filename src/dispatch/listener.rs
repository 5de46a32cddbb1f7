//! Task queue listener: the dispatch loop.
//!
//! Each iteration is in one of two states:
//! - **waiting for a slot**: every slot is busy; sleep for the poll interval
//!   (or until an execution finishes) and re-check
//! - **waiting for work**: a slot is free; block on the queue for the next id
//!
//! A dequeued id is dropped without consuming a slot when it is marked
//! cancelled or its status is no longer `Queued`. Otherwise one slot is
//! reserved and the execution handler is spawned; the slot is released when
//! that execution finishes, whatever its outcome. The slot counter is owned by
//! the loop and only touched from it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::ExecutionHandler;
use crate::error::{Error, TaskError};
use crate::queue::TaskQueue;
use crate::store::TaskStore;
use crate::task::{TaskId, TaskStatus};

/// Bounded count of in-flight executions.
#[derive(Debug)]
pub struct SlotCounter {
    max: usize,
    current: usize,
}

impl SlotCounter {
    pub fn new(max: usize) -> Self {
        Self { max, current: 0 }
    }

    pub fn has_free(&self) -> bool {
        self.current < self.max
    }

    pub fn acquire(&mut self) {
        debug_assert!(self.has_free());
        self.current += 1;
    }

    pub fn release(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.current
    }
}

/// The dispatch loop. Consumed by [`TaskQueueListener::run`].
pub struct TaskQueueListener {
    queue: Arc<TaskQueue>,
    store: Arc<dyn TaskStore>,
    handler: Arc<ExecutionHandler>,
    slots: SlotCounter,
    poll_interval: Duration,
}

impl TaskQueueListener {
    pub fn new(
        queue: Arc<TaskQueue>,
        store: Arc<dyn TaskStore>,
        handler: Arc<ExecutionHandler>,
        max_running_tasks: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            handler,
            slots: SlotCounter::new(max_running_tasks),
            poll_interval,
        }
    }

    /// Spawn the loop onto the runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Dispatch until `shutdown` is cancelled, then wait for in-flight
    /// executions to finish.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut running: JoinSet<TaskId> = JoinSet::new();
        info!(max_running_tasks = self.slots.max, "Task queue listener started");

        loop {
            while let Some(done) = running.try_join_next() {
                self.release(done);
            }

            if !self.slots.has_free() {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    Some(done) = running.join_next() => self.release(done),
                    _ = tokio::time::sleep(self.poll_interval) => {
                        if !self.queue.is_empty() {
                            debug!(
                                queued = self.queue.len(),
                                in_flight = self.slots.in_flight(),
                                "All slots busy, tasks waiting"
                            );
                        }
                    }
                }
                continue;
            }

            let task_id = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(done) = running.join_next() => {
                    self.release(done);
                    continue;
                }
                task_id = self.queue.get() => task_id,
            };

            if self.queue.is_task_cancelled(task_id) {
                info!(task_id, "Skipping cancelled task");
                continue;
            }

            if !self.is_still_queued(task_id).await {
                continue;
            }

            self.slots.acquire();
            info!(task_id, in_flight = self.slots.in_flight(), "Task admitted");

            let handler = Arc::clone(&self.handler);
            running.spawn(async move {
                match handler.handle(task_id).await {
                    Ok(status) => debug!(task_id, status = %status, "Task handled"),
                    Err(Error::Task(e @ TaskError::IncorrectOperation { .. })) => {
                        info!(task_id, reason = %e, "Task left the queue before it could run");
                    }
                    Err(e) => error!(task_id, error = %e, "Task handling failed"),
                }
                task_id
            });
        }

        info!(in_flight = running.len(), "Task queue listener stopping, draining executions");
        while let Some(done) = running.join_next().await {
            self.release(done);
        }
        info!("Task queue listener stopped");
    }

    async fn is_still_queued(&self, task_id: TaskId) -> bool {
        match self.store.get_status(task_id).await {
            Ok(TaskStatus::Queued) => true,
            Ok(status) => {
                debug!(task_id, status = %status, "Dropping stale queue entry");
                false
            }
            Err(e) => {
                warn!(task_id, error = %e, "Dropping queue entry with no task record");
                false
            }
        }
    }

    fn release(&mut self, done: Result<TaskId, JoinError>) {
        self.slots.release();
        match done {
            Ok(task_id) => debug!(task_id, in_flight = self.slots.in_flight(), "Slot released"),
            Err(e) => error!(error = %e, "Task execution panicked"),
        }
    }
}
