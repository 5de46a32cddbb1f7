//! File-backed payloads: `<root>/<task_id>/input.txt` and `<root>/<task_id>/output.txt`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::PayloadError;
use crate::task::TaskId;

const INPUT_FILE: &str = "input.txt";
const OUTPUT_FILE: &str = "output.txt";

/// Payload tree on disk. Shareable with worker processes by root path.
#[derive(Debug, Clone)]
pub struct FilePayloads {
    root: PathBuf,
}

impl FilePayloads {
    /// Open (creating if needed) a payload tree at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PayloadError> {
        let root = root.into();
        if root.is_file() {
            error!(path = %root.display(), "Payload root is a file, not a directory");
            return Err(PayloadError::NotADirectory(root));
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn task_dir(&self, task_id: TaskId) -> PathBuf {
        self.root.join(task_id.to_string())
    }

    fn save(&self, task_id: TaskId, file: &str, data: &str) -> Result<(), PayloadError> {
        let dir = self.task_dir(task_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(file);
        debug!(task_id, path = %path.display(), "Saving payload");
        fs::write(&path, data)?;
        Ok(())
    }

    fn load(&self, task_id: TaskId, file: &str) -> Result<Option<String>, PayloadError> {
        match fs::read_to_string(self.task_dir(task_id).join(file)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_input(&self, task_id: TaskId) -> Result<String, PayloadError> {
        self.load(task_id, INPUT_FILE)?
            .ok_or(PayloadError::InputMissing { task_id })
    }

    pub fn set_input(&self, task_id: TaskId, input_data: &str) -> Result<(), PayloadError> {
        self.save(task_id, INPUT_FILE, input_data)
    }

    pub fn get_output(&self, task_id: TaskId) -> Result<String, PayloadError> {
        self.load(task_id, OUTPUT_FILE)?
            .ok_or(PayloadError::OutputMissing { task_id })
    }

    pub fn set_output(&self, task_id: TaskId, output_data: &str) -> Result<(), PayloadError> {
        self.save(task_id, OUTPUT_FILE, output_data)
    }
}
