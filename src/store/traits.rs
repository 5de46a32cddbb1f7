//! `TaskStore` trait: the single async contract for task records.
//!
//! The store is the source of truth for status. Status read-modify-write
//! goes through [`TaskStore::transition`], a compare-and-swap under the
//! backend's lock, so a cancel request and the dispatcher cannot both win.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::task::{Task, TaskId, TaskStatus};

/// Backend-agnostic task record store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a new task in `Created` status with the next id.
    async fn create(&self, input_data: &str) -> Result<Task, TaskError>;

    /// Get a full task record.
    async fn get(&self, task_id: TaskId) -> Result<Task, TaskError>;

    /// Get only the status of a task.
    async fn get_status(&self, task_id: TaskId) -> Result<TaskStatus, TaskError>;

    /// Overwrite the status (last writer wins).
    async fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), TaskError>;

    /// Atomically move to `to` if the current status is one of `from` and the
    /// move is legal. Returns the previous status.
    async fn transition(
        &self,
        task_id: TaskId,
        to: TaskStatus,
        from: &[TaskStatus],
    ) -> Result<TaskStatus, TaskError>;

    /// Output of a successful task; `NoOutputAvailable` for any other status.
    async fn get_output(&self, task_id: TaskId) -> Result<String, TaskError>;

    /// Attach output data to a task.
    async fn add_output(&self, task_id: TaskId, output_data: &str) -> Result<(), TaskError>;
}
