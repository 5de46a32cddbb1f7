//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::MAX_POOL_WORKERS;
use crate::error::ConfigError;

/// How isolated executions are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// One OS process per execution.
    Process,
    /// Blocking threads inside the dispatcher process. No fault boundary;
    /// meant for tests and embedding.
    Thread,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "thread" => Ok(Self::Thread),
            other => Err(format!("expected `process` or `thread`, got `{other}`")),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum concurrently running tasks (slots).
    pub max_running_tasks: usize,
    /// Maximum workers in the isolation pool.
    pub pool_workers: usize,
    /// Backoff while every slot is busy.
    pub slot_poll_interval: Duration,
    /// Queue capacity; `None` is unbounded.
    pub queue_capacity: Option<usize>,
    /// Root of the file-backed payload store; `None` keeps payloads in memory
    /// (thread executor only).
    pub payload_dir: Option<PathBuf>,
    pub executor: ExecutorKind,
    /// Simulated CPU time per task.
    pub work_delay: Duration,
    /// HTTP listen address.
    pub http_addr: SocketAddr,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_running_tasks: 2,
            pool_workers: 2,
            slot_poll_interval: Duration::from_secs(2),
            queue_capacity: None,
            payload_dir: Some(default_payload_dir()),
            executor: ExecutorKind::Process,
            work_delay: Duration::from_secs(2),
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: None,
        }
    }
}

impl Config {
    /// Read configuration from `TASKQ_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let executor = parse(&lookup, "TASKQ_EXECUTOR", defaults.executor)?;
        let payload_dir = match lookup("TASKQ_PAYLOAD_DIR").filter(|s| !s.trim().is_empty()) {
            Some(dir) => Some(PathBuf::from(dir)),
            None if executor == ExecutorKind::Process => defaults.payload_dir,
            None => None,
        };

        let queue_capacity = match parse(&lookup, "TASKQ_QUEUE_CAPACITY", 0usize)? {
            0 => None,
            n => Some(n),
        };

        let config = Self {
            max_running_tasks: parse(&lookup, "TASKQ_MAX_RUNNING_TASKS", defaults.max_running_tasks)?,
            pool_workers: parse(&lookup, "TASKQ_POOL_WORKERS", defaults.pool_workers)?,
            slot_poll_interval: Duration::from_millis(parse(
                &lookup,
                "TASKQ_SLOT_POLL_MS",
                defaults.slot_poll_interval.as_millis() as u64,
            )?),
            queue_capacity,
            payload_dir,
            executor,
            work_delay: Duration::from_millis(parse(
                &lookup,
                "TASKQ_WORK_DELAY_MS",
                defaults.work_delay.as_millis() as u64,
            )?),
            http_addr: parse(&lookup, "TASKQ_HTTP_ADDR", defaults.http_addr)?,
            log_dir: lookup("TASKQ_LOG_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_running_tasks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TASKQ_MAX_RUNNING_TASKS".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.pool_workers == 0 || self.pool_workers > MAX_POOL_WORKERS {
            return Err(ConfigError::InvalidValue {
                key: "TASKQ_POOL_WORKERS".into(),
                message: format!("must be between 1 and {MAX_POOL_WORKERS}"),
            });
        }
        if self.slot_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TASKQ_SLOT_POLL_MS".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.executor == ExecutorKind::Process && self.payload_dir.is_none() {
            return Err(ConfigError::Incompatible(
                "TASKQ_EXECUTOR=process requires TASKQ_PAYLOAD_DIR".into(),
            ));
        }
        Ok(())
    }
}

/// `<tmp>/taskq`, used by the process executor when no root is configured.
pub fn default_payload_dir() -> PathBuf {
    std::env::temp_dir().join("taskq")
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
