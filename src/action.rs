//! The action boundary: pluggable units of work dispatched per step.
//!
//! An action implementation is anything async that takes the mutable
//! [`ExecutionContext`] and returns a completion signal. Implementations may
//! mutate `records`, `flags`, the content/report artifacts, and may set the
//! exit status to terminate the run early.
//!
//! # Error Handling
//!
//! An `Err` from [`Action::execute`] is contained at the dispatch boundary:
//! the executor records it on the context, emits it through the event bus,
//! and continues with the next step. The convention for recoverable business
//! failures is to record a boolean outcome flag (e.g. `submitted = false`)
//! and return `Ok`, so downstream actions can react.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::context::ExecutionContext;

/// A single unit of work resolvable by `(profile, code)`.
#[async_trait]
pub trait Action: Send + Sync {
    /// Execute this action against the run's context. The executor awaits
    /// completion before checkpointing and moving to the next step.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError>;
}

/// Errors an action implementation can signal to the dispatch boundary.
///
/// These never crash the engine or surface to the run's caller; they are
/// recorded on the context and through the observability sink.
#[derive(Debug, Error, Diagnostic)]
pub enum ActionError {
    /// The action failed outright.
    #[error("action {code} failed: {message}")]
    #[diagnostic(code(reportflow::action::failed))]
    Failed { code: String, message: String },

    /// Expected context data was missing.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(reportflow::action::missing_input),
        help("Check that an earlier step produced the required artifact or flag.")
    )]
    MissingInput { what: &'static str },

    /// JSON serialization/deserialization error while shaping an artifact.
    #[error(transparent)]
    #[diagnostic(code(reportflow::action::serde_json))]
    Serde(#[from] serde_json::Error),
}

impl ActionError {
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Failed {
            code: code.into(),
            message: message.into(),
        }
    }
}
