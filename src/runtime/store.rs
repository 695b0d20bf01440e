//! Durable store boundary for execution contexts.
//!
//! The store is the single source of truth for a context's durable state and
//! its cancellation flag. The engine only ever addresses contexts by id (at
//! most one live execution per context id is a caller-enforced invariant), so
//! the trait exposes keyed verbs: `save` is an upsert by id, `load` a lookup
//! by id. External actors cancel a run through
//! [`ContextStore::request_cancellation`]; the executor re-reads the flag
//! from the store immediately before each dispatch via
//! [`ContextStore::cancellation_requested`], so a cancellation survives
//! process restarts instead of living only in memory.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use super::persistence::{PersistedContext, PersistenceError};
use crate::context::ExecutionContext;

/// Errors surfaced by store backends.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("context not found: {id}")]
    #[diagnostic(code(reportflow::store::not_found))]
    NotFound { id: String },

    #[error("store backend error: {message}")]
    #[diagnostic(code(reportflow::store::backend))]
    Backend { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Keyed persistence for execution contexts.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Upsert the context under its id. Stores the latest state; a checkpoint
    /// write must complete before the next step dispatches.
    async fn save(&self, context: &ExecutionContext) -> Result<()>;

    /// Load the latest persisted state of a context.
    async fn load(&self, id: &str) -> Result<Option<ExecutionContext>>;

    /// Ids of all stored contexts.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Read the cancellation flag from durable state.
    ///
    /// Best-effort semantics: the check and the subsequent step advancement
    /// are not transactional, so a cancellation that lands while a step's
    /// final persist is in flight may only be observed by the next step (or
    /// not at all when the run already completed).
    async fn cancellation_requested(&self, id: &str) -> Result<bool>;

    /// Mark the context cancelled. Called by external actors; the executor
    /// observes the flag before its next dispatch.
    async fn request_cancellation(&self, id: &str) -> Result<()>;
}

/// Volatile store for tests and development.
///
/// Contexts round-trip through [`PersistedContext`] on save/load so the
/// in-memory backend exercises the same serialization path as durable ones.
#[derive(Default)]
pub struct InMemoryContextStore {
    contexts: RwLock<FxHashMap<String, PersistedContext>>,
}

impl InMemoryContextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn save(&self, context: &ExecutionContext) -> Result<()> {
        let mut persisted = PersistedContext::from(context);
        let mut guard = self.contexts.write().await;
        // Cancellation is sticky: an executor save must not clobber a
        // cancellation requested by an external actor in the meantime.
        if let Some(existing) = guard.get(&context.id) {
            persisted.cancelled = persisted.cancelled || existing.cancelled;
        }
        guard.insert(context.id.clone(), persisted);
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<ExecutionContext>> {
        let guard = self.contexts.read().await;
        match guard.get(id) {
            None => Ok(None),
            Some(persisted) => Ok(Some(ExecutionContext::try_from(persisted.clone())?)),
        }
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.contexts.read().await.keys().cloned().collect())
    }

    async fn cancellation_requested(&self, id: &str) -> Result<bool> {
        let guard = self.contexts.read().await;
        let persisted = guard.get(id).ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;
        Ok(persisted.cancelled)
    }

    async fn request_cancellation(&self, id: &str) -> Result<()> {
        let mut guard = self.contexts.write().await;
        let persisted = guard.get_mut(id).ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;
        persisted.cancelled = true;
        Ok(())
    }
}
