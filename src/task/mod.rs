//! Task record and status machine.
//!
//! - `state`: status machine (Created → Queued → Running → Success/Failure, Queued → Cancelled)
//! - `model`: the task record owned by the task store

pub mod model;
pub mod state;

pub use model::{Task, TaskId};
pub use state::{StatusTransition, TaskStatus};
