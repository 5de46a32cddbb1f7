//! Worker-side payload store.
//!
//! Holds task input and output payloads outside the task record store so the
//! isolated worker only ever sees raw strings keyed by task id. Two backends,
//! picked at construction time:
//! - `Memory`: process-local maps; only usable by in-process workers
//! - `File`: one directory per task id containing `input.txt` and `output.txt`
//!
//! All operations are blocking: they run inside pool workers.

mod file;
mod memory;

use std::path::{Path, PathBuf};

pub use file::FilePayloads;
pub use memory::MemoryPayloads;

use crate::error::PayloadError;
use crate::task::TaskId;

/// Payload store backend.
#[derive(Debug, Clone)]
pub enum PayloadStore {
    Memory(MemoryPayloads),
    File(FilePayloads),
}

impl PayloadStore {
    /// In-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryPayloads::default())
    }

    /// File-backed store rooted at `root`; creates the directory if missing.
    pub fn file(root: impl Into<PathBuf>) -> Result<Self, PayloadError> {
        Ok(Self::File(FilePayloads::open(root)?))
    }

    /// Root directory of a file-backed store.
    pub fn root(&self) -> Option<&Path> {
        match self {
            Self::Memory(_) => None,
            Self::File(f) => Some(f.root()),
        }
    }

    pub fn get_input(&self, task_id: TaskId) -> Result<String, PayloadError> {
        match self {
            Self::Memory(m) => m.get_input(task_id),
            Self::File(f) => f.get_input(task_id),
        }
    }

    pub fn set_input(&self, task_id: TaskId, input_data: &str) -> Result<(), PayloadError> {
        match self {
            Self::Memory(m) => m.set_input(task_id, input_data),
            Self::File(f) => f.set_input(task_id, input_data),
        }
    }

    pub fn get_output(&self, task_id: TaskId) -> Result<String, PayloadError> {
        match self {
            Self::Memory(m) => m.get_output(task_id),
            Self::File(f) => f.get_output(task_id),
        }
    }

    pub fn set_output(&self, task_id: TaskId, output_data: &str) -> Result<(), PayloadError> {
        match self {
            Self::Memory(m) => m.set_output(task_id, output_data),
            Self::File(f) => f.set_output(task_id, output_data),
        }
    }
}
