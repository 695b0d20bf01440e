//! The workflow executor: a checkpointed stepper over a persisted context.
//!
//! Given a context id, the executor restores the context from the store and
//! drives it through its precomputed sequence one step at a time:
//!
//! 1. Checkpoint before acting on the step, so "what was I about to do" is
//!    always recoverable.
//! 2. A delay node advances the step, persists, schedules a timed resumption,
//!    and yields with status `Delaying`; no thread blocks.
//! 3. For a real action: set it active, re-read the cancellation flag from
//!    the store, resolve the implementation by `(profile, code)`, await it,
//!    persist, honor the exit status, advance.
//!
//! Per-step problems (dispatch misses, action failures, even panics) are
//! contained at the dispatch boundary: recorded on the context, emitted
//! through the event bus, and the run continues. Only configuration and
//! store errors surface to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::FutureExt;
use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use super::store::{ContextStore, StoreError};
use crate::context::ExecutionContext;
use crate::events::EngineEvent;
use crate::profile::{self, ProfileError};
use crate::registry::ActionRegistry;
use crate::types::{SequenceNode, WorkflowStatus};

/// The timer facility delays suspend on, injected as a seam so tests can
/// substitute an instant scheduler.
#[async_trait]
pub trait DelayScheduler: Send + Sync {
    /// Complete after `millis` milliseconds elapse, without blocking a thread.
    async fn wait(&self, millis: u64);
}

/// Production scheduler backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioDelayScheduler;

#[async_trait]
impl DelayScheduler for TokioDelayScheduler {
    async fn wait(&self, millis: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
    }
}

/// Errors surfaced to the caller of an execution entry point.
///
/// Per-step action problems never appear here; they are contained inside the
/// run and observable through the event bus and the context's own records.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    #[error("context not found: {context_id}")]
    #[diagnostic(code(reportflow::executor::context_not_found))]
    ContextNotFound { context_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Profile(#[from] ProfileError),
}

/// Summary returned by an execution entry point.
#[derive(Clone, Debug)]
pub struct ExecutionReport {
    pub context_id: String,
    /// Status at the point control returned to the caller.
    pub status: WorkflowStatus,
    /// The persisted step index when control returned.
    pub steps_completed: usize,
    /// For a `Delaying` report: how long until the scheduled resumption.
    pub resume_after_ms: Option<u64>,
}

/// Stateless stepper over persisted contexts. Cheap to clone; all state lives
/// in the store, so any clone can resume any context by id.
#[derive(Clone)]
pub struct WorkflowExecutor {
    registry: Arc<ActionRegistry>,
    store: Arc<dyn ContextStore>,
    events: flume::Sender<EngineEvent>,
    delays: Arc<dyn DelayScheduler>,
}

impl WorkflowExecutor {
    pub fn new(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn ContextStore>,
        events: flume::Sender<EngineEvent>,
        delays: Arc<dyn DelayScheduler>,
    ) -> Self {
        Self {
            registry,
            store,
            events,
            delays,
        }
    }

    /// Convenience constructor using the tokio timer for delays.
    pub fn with_tokio_delays(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn ContextStore>,
        events: flume::Sender<EngineEvent>,
    ) -> Self {
        Self::new(registry, store, events, Arc::new(TokioDelayScheduler))
    }

    /// Drive the context until it completes, exits, cancels, or hits a delay
    /// node. On a delay the context is persisted as `Delaying`, a resumption
    /// is scheduled on the runtime, and the report returns immediately with
    /// `resume_after_ms` set.
    #[instrument(skip(self), err)]
    pub async fn execute(&self, context_id: &str) -> Result<ExecutionReport, ExecutorError> {
        self.step_loop(context_id, false).await
    }

    /// Same stepping loop, but delay waits are awaited in-line so the future
    /// resolves only once the run reaches a terminal state. Used by tests and
    /// batch callers.
    #[instrument(skip(self), err)]
    pub async fn run_to_completion(
        &self,
        context_id: &str,
    ) -> Result<ExecutionReport, ExecutorError> {
        self.step_loop(context_id, true).await
    }

    async fn step_loop(
        &self,
        context_id: &str,
        inline_delays: bool,
    ) -> Result<ExecutionReport, ExecutorError> {
        let mut ctx = self
            .store
            .load(context_id)
            .await?
            .ok_or_else(|| ExecutorError::ContextNotFound {
                context_id: context_id.to_string(),
            })?;

        // The profile is fixed for the whole run; resolution is pure and
        // deterministic over the immutable plan, so a resumed run always pins
        // the same profile without persisting it.
        let reporting_profile = profile::resolve_reporting_profile(&ctx.plan)?;

        if ctx.is_terminal() {
            return Ok(report_of(&ctx, None));
        }

        loop {
            if ctx.current_step >= ctx.sequence.len() {
                self.finish(&mut ctx, WorkflowStatus::Completed).await?;
                return Ok(report_of(&ctx, None));
            }

            // Checkpoint before acting on this step.
            ctx.status = WorkflowStatus::Running;
            self.checkpoint(&mut ctx).await?;

            let node = ctx.sequence[ctx.current_step].clone();
            match node {
                SequenceNode::Delay { millis, .. } => {
                    let delayed_step = ctx.current_step;
                    ctx.current_step += 1;
                    ctx.status = WorkflowStatus::Delaying;
                    self.checkpoint(&mut ctx).await?;
                    self.emit(EngineEvent::step(
                        &ctx.id,
                        delayed_step,
                        node.to_string(),
                        format!("suspending for {millis}ms"),
                    ));
                    tracing::info!(context = %ctx.id, step = delayed_step, millis, "delay step");

                    if inline_delays {
                        self.delays.wait(millis).await;
                        continue;
                    }
                    self.spawn_resumption(ctx.id.clone(), millis);
                    return Ok(report_of(&ctx, Some(millis)));
                }
                SequenceNode::Action(ref action_id) => {
                    if let Some(report) = self
                        .run_action_step(&mut ctx, &reporting_profile, action_id)
                        .await?
                    {
                        return Ok(report);
                    }
                }
            }
        }
    }

    /// Execute one real-action step. Returns `Some(report)` when the run
    /// reached a terminal state, `None` when the loop should continue.
    async fn run_action_step(
        &self,
        ctx: &mut ExecutionContext,
        reporting_profile: &str,
        action_id: &str,
    ) -> Result<Option<ExecutionReport>, ExecutorError> {
        let action = ctx.plan.action(action_id).cloned();
        ctx.current_action = action.clone();

        // Re-read cancellation from the store, not the in-memory copy, so an
        // external actor can cancel between persisted checkpoints.
        if self.store.cancellation_requested(&ctx.id).await? {
            ctx.cancelled = true;
            self.finish(ctx, WorkflowStatus::Cancelled).await?;
            self.emit(EngineEvent::step(
                &ctx.id,
                ctx.current_step,
                action_id,
                "cancellation observed before dispatch",
            ));
            tracing::info!(context = %ctx.id, step = ctx.current_step, "run cancelled");
            return Ok(Some(report_of(ctx, None)));
        }

        let code = action.as_ref().and_then(|a| a.code.clone());
        let implementation = code
            .as_deref()
            .and_then(|c| self.registry.get(reporting_profile, c));

        match implementation {
            None => {
                // Non-fatal by contract: the step is a no-op, but the miss
                // must always be observable.
                let missed = code.unwrap_or_else(|| action_id.to_string());
                self.emit(EngineEvent::dispatch_miss(
                    &ctx.id,
                    ctx.current_step,
                    reporting_profile,
                    &missed,
                ));
                tracing::warn!(
                    context = %ctx.id,
                    step = ctx.current_step,
                    profile = reporting_profile,
                    code = %missed,
                    "no action implementation registered; step skipped"
                );
            }
            Some(implementation) => {
                let step = ctx.current_step;
                let invocation =
                    AssertUnwindSafe(implementation.execute(ctx)).catch_unwind().await;
                match invocation {
                    Ok(Ok(())) => {
                        self.emit(EngineEvent::step(&ctx.id, step, action_id, "action completed"));
                        tracing::debug!(context = %ctx.id, step, action = action_id, "action completed");
                    }
                    Ok(Err(err)) => {
                        let message = err.to_string();
                        ctx.record_failure(action_id, code, &message);
                        self.emit(EngineEvent::action_failure(&ctx.id, step, action_id, &message));
                        tracing::error!(
                            context = %ctx.id,
                            step,
                            action = action_id,
                            error = %message,
                            "action failed; contained at dispatch boundary"
                        );
                    }
                    Err(panic) => {
                        let message = panic_message(panic);
                        ctx.record_failure(action_id, code, &message);
                        self.emit(EngineEvent::action_failure(&ctx.id, step, action_id, &message));
                        tracing::error!(
                            context = %ctx.id,
                            step,
                            action = action_id,
                            error = %message,
                            "action panicked; contained at dispatch boundary"
                        );
                    }
                }
            }
        }

        // Persist the possibly action-mutated context.
        self.checkpoint(ctx).await?;

        if ctx.exit_status.is_some() {
            self.finish(ctx, WorkflowStatus::ExitedEarly).await?;
            tracing::info!(
                context = %ctx.id,
                step = ctx.current_step,
                exit_status = ctx.exit_status.as_deref(),
                "run exited early"
            );
            return Ok(Some(report_of(ctx, None)));
        }

        ctx.current_step += 1;
        if ctx.current_step == ctx.sequence.len() {
            self.finish(ctx, WorkflowStatus::Completed).await?;
            tracing::info!(context = %ctx.id, steps = ctx.current_step, "run completed");
            return Ok(Some(report_of(ctx, None)));
        }
        Ok(None)
    }

    async fn checkpoint(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutorError> {
        ctx.updated_at = Utc::now();
        self.store.save(ctx).await?;
        Ok(())
    }

    async fn finish(
        &self,
        ctx: &mut ExecutionContext,
        status: WorkflowStatus,
    ) -> Result<(), ExecutorError> {
        ctx.status = status;
        self.checkpoint(ctx).await
    }

    /// Schedule a resumption of the stepping loop once the delay elapses.
    /// The continuation restores the context from the store, so only the id
    /// is captured.
    fn spawn_resumption(&self, context_id: String, millis: u64) {
        let executor = self.clone();
        tokio::spawn(async move {
            executor.delays.wait(millis).await;
            if let Err(err) = executor.execute(&context_id).await {
                executor.emit(EngineEvent::diagnostic(
                    "resume",
                    format!("resumption of {context_id} failed: {err}"),
                ));
                tracing::error!(context = %context_id, error = %err, "delayed resumption failed");
            }
        });
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("event bus unavailable; event dropped");
        }
    }
}

fn report_of(ctx: &ExecutionContext, resume_after_ms: Option<u64>) -> ExecutionReport {
    ExecutionReport {
        context_id: ctx.id.clone(),
        status: ctx.status,
        steps_completed: ctx.current_step,
        resume_after_ms,
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}
