//! Dependency graph construction and topological sequencing.
//!
//! The graph layer turns a [`Plan`](crate::plan::Plan) into a deterministic
//! linear execution order, computed once per context and persisted with it:
//!
//! 1. [`DependencyGraph::from_plan`] registers every action as a node and
//!    wires the related-action edges, synthesizing delay nodes for timing
//!    offsets.
//! 2. [`sequencer::sequence`] produces a stable topological order, rejecting
//!    cyclic graphs.

pub mod builder;
pub mod sequencer;

use miette::Diagnostic;
use thiserror::Error;

pub use builder::{DependencyGraph, GraphError};
pub use sequencer::{SequenceError, sequence};

use crate::plan::Plan;
use crate::types::SequenceNode;

/// Errors from the combined build-then-sequence path.
#[derive(Debug, Error, Diagnostic)]
pub enum PlanSequenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sequence(#[from] SequenceError),
}

/// Compile a plan straight into its linear action sequence.
pub fn plan_sequence(plan: &Plan) -> Result<Vec<SequenceNode>, PlanSequenceError> {
    let graph = DependencyGraph::from_plan(plan)?;
    Ok(sequence(&graph)?)
}
