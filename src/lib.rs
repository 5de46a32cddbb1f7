//! taskq: a bounded-concurrency task dispatcher with process-isolated workers.

pub mod api;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod payload;
pub mod queue;
pub mod service;
pub mod store;
pub mod task;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
