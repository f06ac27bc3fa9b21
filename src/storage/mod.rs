//! Statement storage for Tempora.
//!
//! The statement-store collaborator is defined by [`StatementStore`]; the
//! in-memory backend and the indexed [`Graph`] it is built from live here too.

mod graph;
mod memory;
mod traits;

pub use graph::Graph;
pub use memory::InMemoryStatementStore;
pub use traits::{ContainerId, Quad, StatementStore, StorageError};
