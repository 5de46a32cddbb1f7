//! The offloaded task function and the `taskq worker` process entry point.
//!
//! Everything here runs on the far side of the isolation boundary: it reads
//! input from the payload store, computes, writes output back, and reports a
//! binary [`ExecutionResult`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::error::{ConfigError, ExecutionError};
use crate::payload::PayloadStore;
use crate::task::TaskId;

/// Outcome of one isolated execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Failure,
}

/// Task-specific computation: input payload in, output payload out.
pub type ComputeFn = Arc<dyn Fn(TaskId, &str) -> Result<String, ExecutionError> + Send + Sync>;

/// Suffix appended to the input by the built-in computation.
pub const OUTPUT_SUFFIX: &str = " - successfully executed";

/// The built-in computation: simulated CPU work, then a deterministic
/// transformation of the input.
pub fn simulated_work(delay: Duration) -> ComputeFn {
    Arc::new(move |_task_id: TaskId, input: &str| {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(format!("{input}{OUTPUT_SUFFIX}"))
    })
}

/// Run one task against the payload store.
pub fn execute_task(
    payloads: &PayloadStore,
    compute: &ComputeFn,
    task_id: TaskId,
) -> Result<(), ExecutionError> {
    info!(task_id, pid = std::process::id(), "Executing task");

    let input = payloads.get_input(task_id)?;
    let output = compute(task_id, &input)?;
    payloads.set_output(task_id, &output)?;

    info!(task_id, "Task execution completed");
    Ok(())
}

/// Arguments of `taskq worker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    pub task_id: TaskId,
    pub payload_dir: PathBuf,
    pub delay: Duration,
}

impl WorkerArgs {
    /// Parse `--task-id N --payload-dir DIR [--delay-ms MS]`.
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut task_id = None;
        let mut payload_dir = None;
        let mut delay = Duration::ZERO;

        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let value = args
                .next()
                .ok_or_else(|| ConfigError::MissingArgument(format!("value for {flag}")))?;
            match flag.as_str() {
                "--task-id" => {
                    task_id = Some(value.parse::<TaskId>().map_err(|e| {
                        ConfigError::InvalidValue {
                            key: flag.clone(),
                            message: e.to_string(),
                        }
                    })?);
                }
                "--payload-dir" => payload_dir = Some(PathBuf::from(value)),
                "--delay-ms" => {
                    let ms = value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                        key: flag.clone(),
                        message: e.to_string(),
                    })?;
                    delay = Duration::from_millis(ms);
                }
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: other.to_string(),
                        message: "unknown worker argument".to_string(),
                    });
                }
            }
        }

        Ok(Self {
            task_id: task_id.ok_or_else(|| ConfigError::MissingArgument("--task-id".into()))?,
            payload_dir: payload_dir
                .ok_or_else(|| ConfigError::MissingArgument("--payload-dir".into()))?,
            delay,
        })
    }
}

/// Body of a worker process. Errors are logged and reported as `Failure`.
pub fn run_worker(args: &WorkerArgs) -> ExecutionResult {
    let outcome = PayloadStore::file(&args.payload_dir)
        .map_err(ExecutionError::from)
        .and_then(|payloads| execute_task(&payloads, &simulated_work(args.delay), args.task_id));

    match outcome {
        Ok(()) => ExecutionResult::Success,
        Err(e) => {
            error!(task_id = args.task_id, error = %e, "Unable to handle task");
            ExecutionResult::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn execute_task_writes_output() {
        let payloads = PayloadStore::memory();
        payloads.set_input(1, "hello").unwrap();

        execute_task(&payloads, &simulated_work(Duration::ZERO), 1).unwrap();
        assert_eq!(
            payloads.get_output(1).unwrap(),
            "hello - successfully executed"
        );
    }

    #[test]
    fn execute_task_without_input_fails() {
        let payloads = PayloadStore::memory();
        let err = execute_task(&payloads, &simulated_work(Duration::ZERO), 5).unwrap_err();
        assert!(matches!(err, ExecutionError::Payload(_)));
        assert!(payloads.get_output(5).is_err());
    }

    #[test]
    fn computation_error_leaves_no_output() {
        let payloads = PayloadStore::memory();
        payloads.set_input(2, "x").unwrap();
        let failing: ComputeFn = Arc::new(|task_id: TaskId, _: &str| {
            Err(ExecutionError::Computation {
                task_id,
                reason: "boom".into(),
            })
        });

        assert!(execute_task(&payloads, &failing, 2).is_err());
        assert!(payloads.get_output(2).is_err());
    }

    #[test]
    fn parse_worker_args() {
        let args = WorkerArgs::parse(strings(&[
            "--task-id",
            "12",
            "--payload-dir",
            "/tmp/p",
            "--delay-ms",
            "250",
        ]))
        .unwrap();
        assert_eq!(args.task_id, 12);
        assert_eq!(args.payload_dir, PathBuf::from("/tmp/p"));
        assert_eq!(args.delay, Duration::from_millis(250));
    }

    #[test]
    fn parse_worker_args_errors() {
        assert!(matches!(
            WorkerArgs::parse(strings(&["--payload-dir", "/tmp"])),
            Err(ConfigError::MissingArgument(_))
        ));
        assert!(matches!(
            WorkerArgs::parse(strings(&["--task-id", "abc", "--payload-dir", "/tmp"])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            WorkerArgs::parse(strings(&["--task-id"])),
            Err(ConfigError::MissingArgument(_))
        ));
        assert!(matches!(
            WorkerArgs::parse(strings(&["--bogus", "1"])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn run_worker_against_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let payloads = PayloadStore::file(tmp.path()).unwrap();
        payloads.set_input(3, "abc").unwrap();

        let args = WorkerArgs {
            task_id: 3,
            payload_dir: tmp.path().to_path_buf(),
            delay: Duration::ZERO,
        };
        assert_eq!(run_worker(&args), ExecutionResult::Success);
        assert_eq!(payloads.get_output(3).unwrap(), "abc - successfully executed");

        let missing = WorkerArgs { task_id: 4, ..args };
        assert_eq!(run_worker(&missing), ExecutionResult::Failure);
    }
}
