//! Task status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task exists but was never queued.
    Created,
    /// Task is waiting in the queue for a slot.
    Queued,
    /// Task was admitted and is executing inside the worker pool.
    Running,
    /// Execution finished and output is available.
    Success,
    /// Execution failed; no output.
    Failure,
    /// Task was cancelled while queued.
    Cancelled,
}

impl TaskStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Created, Queued) | (Cancelled, Queued) |
            (Queued, Running) | (Queued, Cancelled) |
            (Running, Success) | (Running, Failure)
        )
    }

    /// Whether a run may be requested from this status.
    pub fn can_run(&self) -> bool {
        matches!(self, Self::Created | Self::Cancelled)
    }

    /// Whether a cancel may be requested from this status.
    ///
    /// Only queued tasks: a running task cannot be preempted.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Queued)
    }

    /// Check if this is a terminal execution status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Previous status.
    pub from: TaskStatus,
    /// New status.
    pub to: TaskStatus,
    /// When the transition occurred.
    pub at: DateTime<Utc>,
}
