//! Worker pools: the isolation boundary for CPU-bound task execution.
//!
//! A pool runs at most `max_workers` executions at once. Whatever happens
//! inside (errors, panics, a crashed process) comes back as
//! [`ExecutionResult::Failure`]; nothing crosses the boundary as an error.
//! An admitted execution cannot be interrupted. `shutdown()` refuses new work
//! and waits for every in-flight execution to finish.
//!
//! - [`ProcessPool`]: one OS process per execution (`taskq worker ...`)
//! - [`ThreadPool`]: blocking threads with panic capture; in-process payloads

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use super::worker::{ComputeFn, ExecutionResult, execute_task};
use crate::error::{ConfigError, ExecutionError};
use crate::payload::PayloadStore;
use crate::task::TaskId;

/// Largest pool the semaphore bookkeeping supports.
pub const MAX_POOL_WORKERS: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Bounded executor for isolated task runs.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Run `task_id` to completion inside the pool.
    async fn execute(&self, task_id: TaskId) -> ExecutionResult;

    /// Stop accepting work and wait for in-flight executions to drain.
    async fn shutdown(&self);

    /// Upper bound on concurrent executions.
    fn max_workers(&self) -> usize;
}

/// Worker-count bound shared by both pools.
struct Capacity {
    permits: Arc<Semaphore>,
    max_workers: usize,
    closed: AtomicBool,
}

impl Capacity {
    fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.clamp(1, MAX_POOL_WORKERS);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            closed: AtomicBool::new(false),
        }
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, ExecutionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExecutionError::PoolClosed);
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ExecutionError::PoolClosed)
    }

    async fn drain(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let busy = self.max_workers - self.permits.available_permits();
        info!(busy, "Shutting down worker pool, waiting for in-flight executions");
        // Holding every permit means nothing is running.
        let all = u32::try_from(self.max_workers).unwrap_or(u32::MAX);
        if let Ok(permits) = self.permits.acquire_many(all).await {
            permits.forget();
        }
        self.permits.close();
        info!("Worker pool drained");
    }
}

/// Spawns one worker process per execution.
pub struct ProcessPool {
    capacity: Capacity,
    program: PathBuf,
    args: Vec<String>,
    payload_dir: PathBuf,
    work_delay: Duration,
}

impl ProcessPool {
    /// Pool that re-executes the current binary as `<exe> worker ...`.
    pub fn new(
        max_workers: usize,
        payloads: &PayloadStore,
        work_delay: Duration,
    ) -> Result<Self, ConfigError> {
        let program = std::env::current_exe()?;
        Self::with_program(max_workers, program, vec!["worker".to_string()], payloads, work_delay)
    }

    /// Pool running `program args... --task-id N --payload-dir DIR --delay-ms MS`.
    pub fn with_program(
        max_workers: usize,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        payloads: &PayloadStore,
        work_delay: Duration,
    ) -> Result<Self, ConfigError> {
        let payload_dir = payloads.root().map(PathBuf::from).ok_or_else(|| {
            ConfigError::Incompatible(
                "process workers need a file-backed payload store".to_string(),
            )
        })?;
        Ok(Self {
            capacity: Capacity::new(max_workers),
            program: program.into(),
            args,
            payload_dir,
            work_delay,
        })
    }

    async fn run_child(&self, task_id: TaskId) -> Result<(), ExecutionError> {
        let _permit = self.capacity.acquire().await?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--task-id")
            .arg(task_id.to_string())
            .arg("--payload-dir")
            .arg(&self.payload_dir)
            .arg("--delay-ms")
            .arg(self.work_delay.as_millis().to_string())
            .stdin(Stdio::null());

        debug!(task_id, program = %self.program.display(), "Spawning worker process");

        let status = cmd
            .status()
            .await
            .map_err(|e| ExecutionError::Spawn {
                task_id,
                reason: e.to_string(),
            })?;

        if status.success() {
            return Ok(());
        }
        let reason = match status.code() {
            Some(code) => format!("exit code: {code}"),
            None => "terminated by signal".to_string(),
        };
        Err(ExecutionError::WorkerExit { task_id, reason })
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    async fn execute(&self, task_id: TaskId) -> ExecutionResult {
        match self.run_child(task_id).await {
            Ok(()) => ExecutionResult::Success,
            Err(e) => {
                warn!(task_id, error = %e, "Worker process failed");
                ExecutionResult::Failure
            }
        }
    }

    async fn shutdown(&self) {
        self.capacity.drain().await;
    }

    fn max_workers(&self) -> usize {
        self.capacity.max_workers
    }
}

/// Runs executions on tokio's blocking threads.
///
/// Panics are contained, but a computation that aborts the process takes the
/// dispatcher with it; prefer [`ProcessPool`] for untrusted work.
pub struct ThreadPool {
    capacity: Capacity,
    payloads: PayloadStore,
    compute: ComputeFn,
}

impl ThreadPool {
    pub fn new(max_workers: usize, payloads: PayloadStore, compute: ComputeFn) -> Self {
        Self {
            capacity: Capacity::new(max_workers),
            payloads,
            compute,
        }
    }

    async fn run_blocking(&self, task_id: TaskId) -> Result<(), ExecutionError> {
        let _permit = self.capacity.acquire().await?;

        let payloads = self.payloads.clone();
        let compute = Arc::clone(&self.compute);
        tokio::task::spawn_blocking(move || execute_task(&payloads, &compute, task_id))
            .await
            .map_err(|e| ExecutionError::Panicked {
                task_id,
                message: e.to_string(),
            })?
    }
}

#[async_trait]
impl WorkerPool for ThreadPool {
    async fn execute(&self, task_id: TaskId) -> ExecutionResult {
        match self.run_blocking(task_id).await {
            Ok(()) => ExecutionResult::Success,
            Err(e) => {
                error!(task_id, error = %e, "Unable to handle task");
                ExecutionResult::Failure
            }
        }
    }

    async fn shutdown(&self) {
        self.capacity.drain().await;
    }

    fn max_workers(&self) -> usize {
        self.capacity.max_workers
    }
}
