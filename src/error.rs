//! Error types for taskq.

use std::path::PathBuf;

use crate::task::{TaskId, TaskStatus};

/// Top-level error type for the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the task data store and the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("There is no task with such id = `{task_id}`")]
    NotFound { task_id: TaskId },

    #[error("There is no output data for task with id = `{task_id}`")]
    NoOutputAvailable { task_id: TaskId },

    #[error("Task id = `{task_id}` has status {status}, cannot {operation}")]
    IncorrectOperation {
        task_id: TaskId,
        status: TaskStatus,
        operation: String,
    },
}

/// Worker-side payload store errors.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("No input payload for task {task_id}")]
    InputMissing { task_id: TaskId },

    #[error("No output payload for task {task_id}")]
    OutputMissing { task_id: TaskId },

    #[error("Payload root {0} must be a directory, not a file")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures inside or at the edge of the isolation boundary.
///
/// These never reach the dispatch loop as errors: the pool logs them and
/// reports `ExecutionResult::Failure`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Computation for task {task_id} failed: {reason}")]
    Computation { task_id: TaskId, reason: String },

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Worker for task {task_id} panicked: {message}")]
    Panicked { task_id: TaskId, message: String },

    #[error("Failed to spawn worker for task {task_id}: {reason}")]
    Spawn { task_id: TaskId, reason: String },

    #[error("Worker for task {task_id} exited abnormally: {reason}")]
    WorkerExit { task_id: TaskId, reason: String },

    #[error("Worker pool is shut down")]
    PoolClosed,
}

/// Result type alias for taskq.
pub type Result<T> = std::result::Result<T, Error>;
