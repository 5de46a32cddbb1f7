//! Dispatch engine: admits queued tasks into a bounded worker pool.
//!
//! Core components:
//! - `listener`: dispatch loop with the slot counter
//! - `handler`: runs one admitted task and reconciles its status/output
//! - `pool`: isolation boundary (process or thread workers)
//! - `worker`: the offloaded function and the worker process entry point

pub mod handler;
pub mod listener;
pub mod pool;
pub mod worker;

pub use handler::ExecutionHandler;
pub use listener::{SlotCounter, TaskQueueListener};
pub use pool::{MAX_POOL_WORKERS, ProcessPool, ThreadPool, WorkerPool};
pub use worker::{ComputeFn, ExecutionResult, WorkerArgs, run_worker, simulated_work};
