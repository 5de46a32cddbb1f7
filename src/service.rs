//! Task lifecycle service: the operations behind the HTTP surface.
//!
//! Status changes go through the store's compare-and-swap, so a cancel
//! racing the dispatcher either lands while the task is still `Queued` or
//! fails with `IncorrectOperation`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TaskError;
use crate::queue::TaskQueue;
use crate::store::TaskStore;
use crate::task::{TaskId, TaskStatus};

/// Id and status of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Output of a finished task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutputData {
    pub task_id: TaskId,
    pub output_data: String,
}

/// Create, run, cancel and inspect tasks.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    queue: Arc<TaskQueue>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, queue: Arc<TaskQueue>) -> Self {
        Self { store, queue }
    }

    pub async fn create_task(&self, input_data: &str) -> Result<TaskInfo, TaskError> {
        let task = self.store.create(input_data).await?;
        info!(task_id = task.task_id, "Task created");
        Ok(TaskInfo {
            task_id: task.task_id,
            status: task.status,
        })
    }

    /// Queue a task that is `Created` or `Cancelled`.
    ///
    /// Waits for queue space before touching the status, so abandoning the
    /// call while a bounded queue is full leaves the task as it was.
    pub async fn run_task(&self, task_id: TaskId) -> Result<TaskInfo, TaskError> {
        let status = self.store.get_status(task_id).await?;
        if !status.can_run() {
            return Err(TaskError::IncorrectOperation {
                task_id,
                status,
                operation: "run".to_string(),
            });
        }

        let reservation = self.queue.reserve().await;
        self.store
            .transition(
                task_id,
                TaskStatus::Queued,
                &[TaskStatus::Created, TaskStatus::Cancelled],
            )
            .await
            .map_err(|e| rename_operation(e, "run"))?;
        reservation.push(task_id);

        Ok(TaskInfo {
            task_id,
            status: TaskStatus::Queued,
        })
    }

    /// Cancel a `Queued` task. Running tasks cannot be cancelled.
    pub async fn cancel_task(&self, task_id: TaskId) -> Result<TaskInfo, TaskError> {
        self.store
            .transition(task_id, TaskStatus::Cancelled, &[TaskStatus::Queued])
            .await
            .map_err(|e| rename_operation(e, "cancel"))?;
        self.queue.cancel(task_id);
        info!(task_id, "Task cancelled");

        Ok(TaskInfo {
            task_id,
            status: TaskStatus::Cancelled,
        })
    }

    pub async fn get_task_status(&self, task_id: TaskId) -> Result<TaskInfo, TaskError> {
        let status = self.store.get_status(task_id).await?;
        Ok(TaskInfo { task_id, status })
    }

    pub async fn get_task_output(&self, task_id: TaskId) -> Result<TaskOutputData, TaskError> {
        let output_data = self.store.get_output(task_id).await?;
        Ok(TaskOutputData {
            task_id,
            output_data,
        })
    }
}

fn rename_operation(err: TaskError, operation: &str) -> TaskError {
    match err {
        TaskError::IncorrectOperation {
            task_id, status, ..
        } => TaskError::IncorrectOperation {
            task_id,
            status,
            operation: operation.to_string(),
        },
        other => other,
    }
}
