//! Runtime infrastructure: configuration, durable stores, persistence
//! models, and the workflow executor.
//!
//! # Architecture
//!
//! - [`WorkflowExecutor`]: the checkpointed stepper over persisted contexts
//! - [`ContextStore`]: trait for pluggable context persistence
//! - [`RuntimeConfig`]: store/event-bus selection with env resolution
//! - Persistence models: serde-friendly shapes for store backends
//!
//! # Store Backends
//!
//! - [`InMemoryContextStore`]: volatile storage for tests and development
//! - [`SqliteContextStore`]: durable SQLite-backed persistence (feature
//!   `sqlite`, on by default)

pub mod config;
pub mod executor;
pub mod persistence;
pub mod store;
#[cfg(feature = "sqlite")]
pub mod store_sqlite;

pub use config::{EventBusConfig, RuntimeConfig, SinkConfig, StoreType};
pub use executor::{
    DelayScheduler, ExecutionReport, ExecutorError, TokioDelayScheduler, WorkflowExecutor,
};
pub use persistence::{PersistedContext, PersistenceError};
pub use store::{ContextStore, InMemoryContextStore, StoreError};
#[cfg(feature = "sqlite")]
pub use store_sqlite::SqliteContextStore;
