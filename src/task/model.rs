//! Task record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{StatusTransition, TaskStatus};

/// Monotonically assigned task identifier.
pub type TaskId = u64;

/// Cap on recorded transitions per task.
const MAX_TRANSITIONS: usize = 32;

/// A unit of submitted work.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub input_data: String,
    /// Present only after successful completion.
    pub output_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Status history, oldest first.
    pub transitions: Vec<StatusTransition>,
}

impl Task {
    /// Create a fresh task in `Created` status.
    pub fn new(task_id: TaskId, input_data: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            status: TaskStatus::Created,
            input_data: input_data.into(),
            output_data: None,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// Move to `status` unconditionally, recording the change.
    pub fn set_status(&mut self, status: TaskStatus) {
        let now = Utc::now();
        self.transitions.push(StatusTransition {
            from: self.status,
            to: status,
            at: now,
        });
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Whether the task has ever been in `status`.
    pub fn has_visited(&self, status: TaskStatus) -> bool {
        self.status == status || self.transitions.iter().any(|t| t.from == status || t.to == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_created() {
        let task = Task::new(7, "hello");
        assert_eq!(task.task_id, 7);
        assert_eq!(task.status, TaskStatus::Created);
        assert!(task.output_data.is_none());
        assert!(task.transitions.is_empty());
    }

    #[test]
    fn set_status_records_history() {
        let mut task = Task::new(1, "x");
        task.set_status(TaskStatus::Queued);
        task.set_status(TaskStatus::Cancelled);

        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.transitions.len(), 2);
        assert_eq!(task.transitions[0].from, TaskStatus::Created);
        assert_eq!(task.transitions[1].to, TaskStatus::Cancelled);
        assert!(task.has_visited(TaskStatus::Queued));
        assert!(!task.has_visited(TaskStatus::Running));
    }

    #[test]
    fn transition_history_capped() {
        let mut task = Task::new(1, "x");
        for _ in 0..50 {
            task.set_status(TaskStatus::Queued);
            task.set_status(TaskStatus::Cancelled);
        }
        assert_eq!(task.transitions.len(), MAX_TRANSITIONS);
    }
}
