//! Task data store: task records keyed by id.

pub mod memory;
pub mod traits;

pub use memory::InMemoryTaskStore;
pub use traits::TaskStore;
