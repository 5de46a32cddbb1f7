//! Process-local payload maps for in-process workers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PayloadError;
use crate::task::TaskId;

#[derive(Debug, Default)]
struct Maps {
    inputs: HashMap<TaskId, String>,
    outputs: HashMap<TaskId, String>,
}

/// Process-local payload maps. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPayloads {
    maps: Arc<Mutex<Maps>>,
}

impl MemoryPayloads {
    // A panicking computation never holds this lock, so recover from poison.
    fn lock(&self) -> MutexGuard<'_, Maps> {
        self.maps.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_input(&self, task_id: TaskId) -> Result<String, PayloadError> {
        self.lock()
            .inputs
            .get(&task_id)
            .cloned()
            .ok_or(PayloadError::InputMissing { task_id })
    }

    pub fn set_input(&self, task_id: TaskId, input_data: &str) -> Result<(), PayloadError> {
        self.lock().inputs.insert(task_id, input_data.to_string());
        Ok(())
    }

    pub fn get_output(&self, task_id: TaskId) -> Result<String, PayloadError> {
        self.lock()
            .outputs
            .get(&task_id)
            .cloned()
            .ok_or(PayloadError::OutputMissing { task_id })
    }

    pub fn set_output(&self, task_id: TaskId, output_data: &str) -> Result<(), PayloadError> {
        self.lock().outputs.insert(task_id, output_data.to_string());
        Ok(())
    }
}
