//! # tempora - time-partitioned statement storage and entity materialization
//!
//! tempora stores subject/predicate/object statements that are each valid
//! during some interval of time, and answers two questions: "what was true at
//! instant T?" and "give me a fully linked object graph for these facts."
//!
//! ## Core Concepts
//!
//! - **TimeInstant / TimeSpan**: possibly imprecise points and intervals in time
//! - **TemporalStore**: partitions statements into one container per canonical
//!   span, plus a global container for time-invariant facts
//! - **TimeDimensionIndexer**: interval index over partition metadata
//! - **Snapshot**: a flat, read-only merge of chosen partitions
//! - **EntityPool**: typed entities resolved from a snapshot, including
//!   forward and cyclic references
//! - **UpdateBus**: ordered insert/remove notifications per store
//!
//! ## Usage
//!
//! ```rust
//! use tempora::{PoolConfig, Statement, StoreConfig, TemporalStore, Term, TimeInstant, TimeSpan};
//!
//! let store = TemporalStore::in_memory(StoreConfig::default())?;
//! let fifties = TimeSpan::between(TimeInstant::year(1950)?, TimeInstant::year(1960)?)?;
//!
//! store.add(Some(&fifties), Statement::type_assertion("http://ex/hall", "http://ex/Building"))?;
//! store.add(None, Statement::new("http://ex/hall", "http://purl.org/dc/terms/title", Term::literal("Old Hall")))?;
//!
//! let snapshot = store.snapshot_at(&TimeInstant::year(1955)?)?;
//! let pool = snapshot.build_pool(&PoolConfig::new())?;
//! assert_eq!(pool.entities_of_type("http://ex/Building").len(), 1);
//! # Ok::<(), tempora::TemporaError>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Values and time
pub mod error;
pub mod statement;
pub mod time;
pub mod value;
pub mod vocab;

// Storage, partitioning and indexing
pub mod config;
pub mod index;
pub mod monitor;
pub mod storage;
pub mod store;

// Read side
pub mod pool;
pub mod snapshot;

pub use config::StoreConfig;
pub use error::{ExecutionError, TemporaError, TemporaResult, ValidationError};
pub use index::{IntervalIndex, TimeDimensionIndexer};
pub use monitor::{ListenerId, SubscriptionId, UpdateBus, UpdateEvent, UpdateKind, UpdateStream};
pub use pool::{
    Entity, EntityFilter, EntityPool, EntitySchema, EntityVersion, Link, PoolConfig, PoolStats, PropertyKind,
    PropertySpec, ResourceFilter, SchemaRegistry, SlotValue, TimeBasedEntity, UnresolvedLink,
};
pub use snapshot::{Bindings, PatternTerm, Snapshot, TriplePattern};
pub use statement::{Literal, Statement, StatementPattern, Term};
pub use storage::{ContainerId, Graph, InMemoryStatementStore, Quad, StatementStore, StorageError};
pub use store::{IdAllocator, SequentialAllocator, TemporalStore, UuidAllocator};
pub use time::{Extent, Precision, SpanDuration, Temporal, TimeInstant, TimeSpan};
pub use value::{LiteralKind, Value};
