//! # Reportflow: Plan-Driven Reporting Workflow Engine
//!
//! Reportflow compiles a declarative plan (an ordered list of named actions
//! with optional timing dependencies) into a
//! deterministic linear sequence, and steps a durable execution context
//! through it one checkpointed action at a time. Runs survive process
//! restarts, time delays, and external cancellation.
//!
//! ## Core Concepts
//!
//! - **Plan**: the declarative input; actions, dependencies, timing offsets
//! - **Sequence**: the stable topological order computed once per run
//! - **Execution Context**: the persisted, resumable state of one run
//! - **Action Registry**: runtime-extensible `(profile, code)` dispatch
//! - **Context Store**: the durable source of truth for state and cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reportflow::baseline::{self, BASE_PROFILE};
//! use reportflow::context::{ExecutionContext, WorkflowTrigger};
//! use reportflow::events::EventBus;
//! use reportflow::plan::{ActionOutput, Plan, PlanAction};
//! use reportflow::registry::ActionRegistry;
//! use reportflow::runtime::{ContextStore, InMemoryContextStore, WorkflowExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Register the baseline profile once at startup.
//! let mut registry = ActionRegistry::new();
//! baseline::register_baseline(&mut registry);
//!
//! // A plan whose create-report action selects the baseline profile.
//! let mut create = PlanAction::new("report", "create-report");
//! create.outputs.push(ActionOutput::bundle(vec![BASE_PROFILE.to_string()]));
//! let plan = Plan { id: "demo".into(), title: None, actions: vec![create] };
//!
//! // Initialize a context from the triggering resource, persist it, run it.
//! let trigger = WorkflowTrigger::from_resource(serde_json::json!({"resourceType": "Condition"}));
//! let context = ExecutionContext::initialize(plan, &trigger)?;
//!
//! let store = Arc::new(InMemoryContextStore::new());
//! let bus = EventBus::default();
//! bus.listen_for_events();
//!
//! store.save(&context).await?;
//! let executor = WorkflowExecutor::with_tokio_delays(
//!     Arc::new(registry),
//!     store.clone(),
//!     bus.get_sender(),
//! );
//! let report = executor.run_to_completion(&context.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`plan`] - Plan, actions, related-action and output declarations
//! - [`duration`] - Timing-offset conversion to milliseconds
//! - [`types`] - Sequence nodes and workflow status
//! - [`graph`] - Dependency graph construction and stable sequencing
//! - [`action`] - The pluggable action trait and its error taxonomy
//! - [`registry`] - Profile-scoped action registry
//! - [`profile`] - Reporting-profile resolution from a plan
//! - [`context`] - The persisted execution context
//! - [`events`] - Engine events, sinks, and the event bus
//! - [`runtime`] - Stores, persistence models, and the workflow executor
//! - [`baseline`] - The baseline reporting profile
//! - [`telemetry`] - Tracing subscriber helpers

pub mod action;
pub mod baseline;
pub mod context;
pub mod duration;
pub mod events;
pub mod graph;
pub mod plan;
pub mod profile;
pub mod registry;
pub mod runtime;
pub mod telemetry;
pub mod types;

pub use action::{Action, ActionError};
pub use context::{ExecutionContext, WorkflowTrigger};
pub use plan::{Plan, PlanAction};
pub use registry::{ActionRegistry, ActionSet};
pub use runtime::{ContextStore, ExecutionReport, WorkflowExecutor};
pub use types::{SequenceNode, WorkflowStatus};
