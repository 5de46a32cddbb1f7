//! In-memory task store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::TaskStore;
use crate::error::TaskError;
use crate::task::{Task, TaskId, TaskStatus};

/// Task records held in a map behind a single lock.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    next_id: AtomicU64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, input_data: &str) -> Result<Task, TaskError> {
        let task_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Task::new(task_id, input_data);
        self.tasks.write().await.insert(task_id, task.clone());
        debug!(task_id, "Task created");
        Ok(task)
    }

    async fn get(&self, task_id: TaskId) -> Result<Task, TaskError> {
        self.tasks
            .read()
            .await
            .get(&task_id)
            .cloned()
            .ok_or(TaskError::NotFound { task_id })
    }

    async fn get_status(&self, task_id: TaskId) -> Result<TaskStatus, TaskError> {
        self.tasks
            .read()
            .await
            .get(&task_id)
            .map(|t| t.status)
            .ok_or(TaskError::NotFound { task_id })
    }

    async fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(TaskError::NotFound { task_id })?;
        task.set_status(status);
        Ok(())
    }

    async fn transition(
        &self,
        task_id: TaskId,
        to: TaskStatus,
        from: &[TaskStatus],
    ) -> Result<TaskStatus, TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(TaskError::NotFound { task_id })?;

        let current = task.status;
        if !from.contains(&current) || !current.can_transition_to(to) {
            return Err(TaskError::IncorrectOperation {
                task_id,
                status: current,
                operation: format!("move to {to}"),
            });
        }

        task.set_status(to);
        debug!(task_id, from = %current, to = %to, "Task status changed");
        Ok(current)
    }

    async fn get_output(&self, task_id: TaskId) -> Result<String, TaskError> {
        let tasks = self.tasks.read().await;
        let task = tasks.get(&task_id).ok_or(TaskError::NotFound { task_id })?;
        match (&task.status, &task.output_data) {
            (TaskStatus::Success, Some(output)) => Ok(output.clone()),
            _ => Err(TaskError::NoOutputAvailable { task_id }),
        }
    }

    async fn add_output(&self, task_id: TaskId, output_data: &str) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(TaskError::NotFound { task_id })?;
        task.output_data = Some(output_data.to_string());
        task.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_monotonic_ids() {
        let store = InMemoryTaskStore::new();
        let a = store.create("a").await.unwrap();
        let b = store.create("b").await.unwrap();

        assert_eq!(a.task_id, 0);
        assert_eq!(b.task_id, 1);
        assert_eq!(a.status, TaskStatus::Created);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let store = InMemoryTaskStore::new();
        assert_eq!(
            store.get_status(9999).await,
            Err(TaskError::NotFound { task_id: 9999 })
        );
        assert_eq!(
            store.get_output(9999).await,
            Err(TaskError::NotFound { task_id: 9999 })
        );
        assert!(store.set_status(9999, TaskStatus::Queued).await.is_err());
    }

    #[tokio::test]
    async fn output_gated_by_status() {
        let store = InMemoryTaskStore::new();
        let task = store.create("hello").await.unwrap();
        let id = task.task_id;

        store.add_output(id, "done").await.unwrap();
        assert_eq!(
            store.get_output(id).await,
            Err(TaskError::NoOutputAvailable { task_id: id })
        );

        store.set_status(id, TaskStatus::Success).await.unwrap();
        assert_eq!(store.get_output(id).await.unwrap(), "done");
    }

    #[tokio::test]
    async fn success_without_output_is_not_available() {
        let store = InMemoryTaskStore::new();
        let id = store.create("x").await.unwrap().task_id;
        store.set_status(id, TaskStatus::Success).await.unwrap();
        assert_eq!(
            store.get_output(id).await,
            Err(TaskError::NoOutputAvailable { task_id: id })
        );
    }

    #[tokio::test]
    async fn transition_is_compare_and_swap() {
        let store = InMemoryTaskStore::new();
        let id = store.create("x").await.unwrap().task_id;

        let prev = store
            .transition(id, TaskStatus::Queued, &[TaskStatus::Created])
            .await
            .unwrap();
        assert_eq!(prev, TaskStatus::Created);

        // Second attempt from Created loses.
        let err = store
            .transition(id, TaskStatus::Queued, &[TaskStatus::Created])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::IncorrectOperation { status: TaskStatus::Queued, .. }
        ));
    }

    #[tokio::test]
    async fn transition_rejects_illegal_move() {
        let store = InMemoryTaskStore::new();
        let id = store.create("x").await.unwrap().task_id;
        store.set_status(id, TaskStatus::Running).await.unwrap();

        let err = store
            .transition(id, TaskStatus::Cancelled, &[TaskStatus::Running])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::IncorrectOperation { .. }));
        assert_eq!(store.get_status(id).await.unwrap(), TaskStatus::Running);
    }
}
