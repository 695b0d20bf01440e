//! Persistence models for execution contexts.
//!
//! Explicit serde-friendly structs decoupled from the in-memory types, with
//! conversion logic localized in `From`/`TryFrom` impls so store backends
//! stay lean. Sequence nodes and status are stored in their stable string
//! encodings; unknown encodings round-trip through the decoders' forward-
//! compatible fallbacks. This module performs no I/O.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::context::{ExecutionContext, FailureRecord};
use crate::plan::Plan;
use crate::types::{SequenceNode, WorkflowStatus};

/// Serialization and conversion errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(reportflow::persistence::serde),
        help("Ensure the stored JSON matches the PersistedContext shape.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("persistence error: {0}")]
    #[diagnostic(code(reportflow::persistence::other))]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Complete persisted shape of an [`ExecutionContext`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersistedContext {
    pub id: String,
    pub plan: Plan,
    #[serde(default)]
    pub records: Vec<Value>,
    /// Sequence encoded as string vector using `SequenceNode::encode()`.
    #[serde(default)]
    pub sequence: Vec<String>,
    pub current_step: usize,
    #[serde(default)]
    pub flags: FxHashMap<String, bool>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub report: Option<Value>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub exit_status: Option<String>,
    /// Id of the action active at checkpoint time; the full declaration is
    /// re-resolved from the plan on load.
    #[serde(default)]
    pub current_action_id: Option<String>,
    /// Status encoded via `WorkflowStatus::encode()`.
    pub status: String,
    #[serde(default)]
    pub errors: Vec<FailureRecord>,
    /// RFC3339 string form (keeps chrono::DateTime out of the stored shape).
    pub created_at: String,
    pub updated_at: String,
}

impl PersistedContext {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Serde { source: e })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PersistenceError::Serde { source: e })
    }
}

impl From<&ExecutionContext> for PersistedContext {
    fn from(ctx: &ExecutionContext) -> Self {
        PersistedContext {
            id: ctx.id.clone(),
            plan: ctx.plan.clone(),
            records: ctx.records.clone(),
            sequence: ctx.sequence.iter().map(SequenceNode::encode).collect(),
            current_step: ctx.current_step,
            flags: ctx.flags.clone(),
            content: ctx.content.clone(),
            report: ctx.report.clone(),
            cancelled: ctx.cancelled,
            exit_status: ctx.exit_status.clone(),
            current_action_id: ctx.current_action.as_ref().map(|a| a.id.clone()),
            status: ctx.status.encode().to_string(),
            errors: ctx.errors.clone(),
            created_at: ctx.created_at.to_rfc3339(),
            updated_at: ctx.updated_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedContext> for ExecutionContext {
    type Error = PersistenceError;

    fn try_from(p: PersistedContext) -> Result<Self> {
        let sequence: Vec<SequenceNode> =
            p.sequence.iter().map(|s| SequenceNode::decode(s)).collect();
        let current_action = p
            .current_action_id
            .as_deref()
            .and_then(|id| p.plan.action(id).cloned());
        let created_at = parse_rfc3339(&p.created_at);
        let updated_at = parse_rfc3339(&p.updated_at);
        Ok(ExecutionContext {
            id: p.id,
            plan: p.plan,
            records: p.records,
            sequence,
            current_step: p.current_step,
            flags: p.flags,
            content: p.content,
            report: p.report,
            cancelled: p.cancelled,
            exit_status: p.exit_status,
            current_action,
            status: WorkflowStatus::decode(&p.status),
            errors: p.errors,
            created_at,
            updated_at,
        })
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
