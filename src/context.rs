//! Execution context: the persisted, resumable state of one workflow run.
//!
//! A context is created once by [`ExecutionContext::initialize`] when a
//! triggering event arrives, persisted immediately, and then mutated
//! step-by-step by the executor, which re-persists it after every single step.
//! Everything needed to resume (the plan, the precomputed action sequence,
//! the step index, flags, and artifacts) lives here, so a run can be picked
//! up from the store after a process restart or a scheduled delay.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::graph::{self, PlanSequenceError};
use crate::plan::{Plan, PlanAction};
use crate::types::{SequenceNode, WorkflowStatus};

/// The resource that triggered a workflow run, with whatever related
/// patient/encounter resources the upstream handler could resolve.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    /// The clinical resource whose arrival started the run.
    pub resource: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Value>,
}

impl WorkflowTrigger {
    pub fn from_resource(resource: Value) -> Self {
        Self {
            resource,
            patient: None,
            encounter: None,
        }
    }

    #[must_use]
    pub fn with_patient(mut self, patient: Value) -> Self {
        self.patient = Some(patient);
        self
    }

    #[must_use]
    pub fn with_encounter(mut self, encounter: Value) -> Self {
        self.encounter = Some(encounter);
        self
    }
}

/// A contained action failure, recorded on the context so checkpoints expose
/// the run's failure history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FailureRecord {
    /// Step index at which the failure occurred.
    pub step: usize,
    /// Id of the action that failed.
    pub action: String,
    /// The action's code, when it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    pub when: DateTime<Utc>,
}

/// Full persisted state of one in-progress or completed workflow run.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Unique identifier of this run.
    pub id: String,
    /// The plan driving the run, embedded so the context is self-contained.
    pub plan: Plan,
    /// Clinical resources relevant to this run. Order-preserving; duplicates
    /// permitted.
    pub records: Vec<Value>,
    /// The action sequence, computed once at initialization and stored for
    /// resumability.
    pub sequence: Vec<SequenceNode>,
    /// 0-based index of the next step to execute. Monotonically increasing.
    pub current_step: usize,
    /// Boolean side-channel between actions (e.g. "validated", "submitted").
    pub flags: FxHashMap<String, bool>,
    /// Intermediate work product, opaque to the engine.
    pub content: Option<Value>,
    /// The assembled report artifact, opaque to the engine.
    pub report: Option<Value>,
    /// Cancellation indicator. The authoritative copy lives in the store and
    /// is re-read before each dispatch; this field mirrors the last read.
    pub cancelled: bool,
    /// Terminal marker set by an action to force early termination. Any value
    /// is terminal; the set of reasons belongs to action authors.
    pub exit_status: Option<String>,
    /// The action the executor is currently dispatching, set immediately
    /// before invocation so implementations can inspect their own declaration.
    pub current_action: Option<PlanAction>,
    pub status: WorkflowStatus,
    /// Contained action failures, in occurrence order.
    pub errors: Vec<FailureRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Build the initial context for a plan and its triggering event.
    ///
    /// Assigns a fresh id, seeds the records with whatever of
    /// {patient, encounter} the trigger resolved, and computes the action
    /// sequence once. Does not start execution; handing the context to the
    /// executor is a separate, explicit call.
    pub fn initialize(plan: Plan, trigger: &WorkflowTrigger) -> Result<Self, PlanSequenceError> {
        let sequence = graph::plan_sequence(&plan)?;
        let mut records = Vec::new();
        if let Some(patient) = &trigger.patient {
            records.push(patient.clone());
        }
        if let Some(encounter) = &trigger.encounter {
            records.push(encounter.clone());
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            plan,
            records,
            sequence,
            current_step: 0,
            flags: FxHashMap::default(),
            content: None,
            report: None,
            cancelled: false,
            exit_status: None,
            current_action: None,
            status: WorkflowStatus::Running,
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Set a named boolean flag.
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Read a named flag; unset flags read as `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Append a clinical resource to the run's records.
    pub fn add_record(&mut self, record: Value) {
        self.records.push(record);
    }

    /// Request early termination after the current step completes.
    pub fn request_exit(&mut self, reason: impl Into<String>) {
        self.exit_status = Some(reason.into());
    }

    /// Record a contained action failure.
    pub fn record_failure(
        &mut self,
        action: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FailureRecord {
            step: self.current_step,
            action: action.into(),
            code,
            message: message.into(),
            when: Utc::now(),
        });
    }

    /// Whether the run has reached a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
