//! Execution handler: runs one admitted task end to end.
//!
//! 1. read the task record
//! 2. stage its input in the payload store
//! 3. Queued → Running (compare-and-swap; loses to a concurrent cancel)
//! 4. execute inside the worker pool
//! 5. on success copy output into the record, then Running → Success;
//!    otherwise Running → Failure

use std::sync::Arc;

use tracing::{error, info, warn};

use super::pool::WorkerPool;
use super::worker::ExecutionResult;
use crate::error::Error;
use crate::payload::PayloadStore;
use crate::store::TaskStore;
use crate::task::{TaskId, TaskStatus};

/// Executes admitted tasks against the store, payloads and pool.
pub struct ExecutionHandler {
    store: Arc<dyn TaskStore>,
    payloads: PayloadStore,
    pool: Arc<dyn WorkerPool>,
}

impl ExecutionHandler {
    pub fn new(store: Arc<dyn TaskStore>, payloads: PayloadStore, pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            store,
            payloads,
            pool,
        }
    }

    /// Run `task_id` and return its final status.
    ///
    /// Fails without executing if the task is missing or is no longer queued.
    pub async fn handle(&self, task_id: TaskId) -> Result<TaskStatus, Error> {
        let task = self.store.get(task_id).await?;

        if let Err(e) = self.payloads.set_input(task_id, &task.input_data) {
            error!(task_id, error = %e, "Unable to stage task input");
            self.store
                .transition(task_id, TaskStatus::Running, &[TaskStatus::Queued])
                .await?;
            self.finish(task_id, TaskStatus::Failure).await?;
            return Err(e.into());
        }

        self.store
            .transition(task_id, TaskStatus::Running, &[TaskStatus::Queued])
            .await?;
        info!(task_id, "Task running");

        let status = match self.pool.execute(task_id).await {
            ExecutionResult::Success => match self.payloads.get_output(task_id) {
                Ok(output) => {
                    self.store.add_output(task_id, &output).await?;
                    TaskStatus::Success
                }
                Err(e) => {
                    warn!(task_id, error = %e, "Worker reported success without output");
                    TaskStatus::Failure
                }
            },
            ExecutionResult::Failure => TaskStatus::Failure,
        };

        self.finish(task_id, status).await?;
        Ok(status)
    }

    async fn finish(&self, task_id: TaskId, status: TaskStatus) -> Result<(), Error> {
        debug_assert!(status.is_terminal());
        self.store
            .transition(task_id, status, &[TaskStatus::Running])
            .await?;
        match status {
            TaskStatus::Success => info!(task_id, "Execution of task completed successfully"),
            _ => info!(task_id, status = %status, "Execution of task failed"),
        }
        Ok(())
    }
}
