//! Test actions, schedulers, and store instrumentation shared across the
//! integration suite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use reportflow::action::{Action, ActionError};
use reportflow::context::ExecutionContext;
use reportflow::runtime::executor::DelayScheduler;
use reportflow::runtime::store::{ContextStore, InMemoryContextStore, Result as StoreResult};

/// Sets the content artifact to a zeroed counter.
pub struct InitCounter;

#[async_trait]
impl Action for InitCounter {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        ctx.content = Some(json!({ "counter": 0 }));
        Ok(())
    }
}

/// Increments the counter in the content artifact.
pub struct IncrementCounter;

#[async_trait]
impl Action for IncrementCounter {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        let current = counter_value(ctx).ok_or(ActionError::MissingInput { what: "counter" })?;
        ctx.content = Some(json!({ "counter": current + 1 }));
        Ok(())
    }
}

/// Read the counter from a context's content artifact.
pub fn counter_value(ctx: &ExecutionContext) -> Option<i64> {
    ctx.content.as_ref()?.get("counter")?.as_i64()
}

/// Records a named boolean flag.
pub struct FlagAction {
    pub name: &'static str,
}

#[async_trait]
impl Action for FlagAction {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        ctx.set_flag(self.name, true);
        Ok(())
    }
}

/// Always fails with an [`ActionError`].
pub struct FailingAction;

#[async_trait]
impl Action for FailingAction {
    async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        Err(ActionError::failed("failing", "intentional test failure"))
    }
}

/// Panics instead of returning; exercises dispatch-boundary containment.
pub struct PanickingAction;

#[async_trait]
impl Action for PanickingAction {
    async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        panic!("intentional test panic");
    }
}

/// Requests early termination of the run.
pub struct ExitAction;

#[async_trait]
impl Action for ExitAction {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        ctx.request_exit("test-exit");
        Ok(())
    }
}

/// Cancels its own run through the store, simulating an external actor
/// landing a cancellation between checkpoints.
pub struct CancelSelfAction {
    pub store: Arc<dyn ContextStore>,
}

#[async_trait]
impl Action for CancelSelfAction {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        self.store
            .request_cancellation(&ctx.id)
            .await
            .map_err(|e| ActionError::failed("cancel-self", e.to_string()))?;
        Ok(())
    }
}

/// Delay scheduler that records requested waits and returns immediately.
#[derive(Clone, Default)]
pub struct InstantDelayScheduler {
    waits: Arc<Mutex<Vec<u64>>>,
}

impl InstantDelayScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<u64> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl DelayScheduler for InstantDelayScheduler {
    async fn wait(&self, millis: u64) {
        self.waits.lock().unwrap().push(millis);
    }
}

/// Store wrapper that records every persisted `(step, status)` pair per
/// context, for asserting checkpoint monotonicity.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryContextStore,
    saves: Arc<Mutex<Vec<(String, usize, String)>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded saves, in order: (context id, step index, status).
    pub fn saves(&self) -> Vec<(String, usize, String)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextStore for RecordingStore {
    async fn save(&self, context: &ExecutionContext) -> StoreResult<()> {
        self.saves.lock().unwrap().push((
            context.id.clone(),
            context.current_step,
            context.status.encode().to_string(),
        ));
        self.inner.save(context).await
    }

    async fn load(&self, id: &str) -> StoreResult<Option<ExecutionContext>> {
        self.inner.load(id).await
    }

    async fn list_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.list_ids().await
    }

    async fn cancellation_requested(&self, id: &str) -> StoreResult<bool> {
        self.inner.cancellation_requested(id).await
    }

    async fn request_cancellation(&self, id: &str) -> StoreResult<()> {
        self.inner.request_cancellation(id).await
    }
}
