//! Dependency graph construction from a plan.
//!
//! Every declared action becomes a node even when it has no edges, so that
//! actions without dependencies still appear in the final sequence. A
//! related-action declaration with an offset synthesizes a delay node between
//! the two actions; its identity is derived deterministically from
//! `(millis, predecessor, dependent)` so rebuilding the graph is idempotent.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::duration::{self, DurationError};
use crate::plan::{Plan, RelatedAction};
use crate::types::SequenceNode;

/// Configuration errors raised while building a dependency graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("duplicate action id in plan {plan:?}: {id:?}")]
    #[diagnostic(
        code(reportflow::graph::duplicate_action_id),
        help("Action ids must be unique within a plan.")
    )]
    DuplicateActionId { plan: String, id: String },

    #[error("unsupported relationship {relationship:?} on action {action:?}")]
    #[diagnostic(
        code(reportflow::graph::unsupported_relationship),
        help("Only the \"before-start\" relationship kind is supported.")
    )]
    UnsupportedRelationship { action: String, relationship: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Duration(#[from] DurationError),
}

/// Directed graph over a plan's action ids plus synthetic delay nodes.
///
/// Edges encode "must happen no later than" ordering: an edge `u → v` means
/// `u` completes before `v` starts. Nodes are kept in discovery order, which
/// for declared actions is declaration order, the tie-break the sequencer
/// relies on for stability.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<SequenceNode>,
    edges: FxHashMap<SequenceNode, Vec<SequenceNode>>,
}

impl DependencyGraph {
    /// Build the graph for a plan.
    ///
    /// Two passes: first register every declared action as a node (declaration
    /// order), then wire edges and synthesize delay nodes. A related-action
    /// target that was never declared is created implicitly on first edge
    /// reference; a target declared later in the plan coalesces with the node
    /// registered in the first pass.
    pub fn from_plan(plan: &Plan) -> Result<Self, GraphError> {
        let mut graph = Self::default();

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for action in &plan.actions {
            if !seen.insert(action.id.as_str()) {
                return Err(GraphError::DuplicateActionId {
                    plan: plan.id.clone(),
                    id: action.id.clone(),
                });
            }
            graph.add_node(SequenceNode::action(&action.id));
        }

        for action in &plan.actions {
            for related in &action.related {
                if related.relationship != RelatedAction::BEFORE_START {
                    return Err(GraphError::UnsupportedRelationship {
                        action: action.id.clone(),
                        relationship: related.relationship.clone(),
                    });
                }
                let source = SequenceNode::action(&action.id);
                let target = SequenceNode::action(&related.target);
                match &related.offset {
                    None => graph.add_edge(source, target),
                    Some(offset) => {
                        let millis = duration::to_millis(offset.value, &offset.unit)?;
                        let delay = SequenceNode::delay(millis, &action.id, &related.target);
                        graph.add_edge(source, delay.clone());
                        graph.add_edge(delay, target);
                    }
                }
            }
        }

        Ok(graph)
    }

    /// Nodes in discovery order (declared actions first, in declaration
    /// order, then implicitly referenced targets and delay nodes).
    #[must_use]
    pub fn nodes(&self) -> &[SequenceNode] {
        &self.nodes
    }

    /// Outgoing adjacency: `u → [v, ...]` means `u` precedes each `v`.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<SequenceNode, Vec<SequenceNode>> {
        &self.edges
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    fn add_node(&mut self, node: SequenceNode) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    fn add_edge(&mut self, from: SequenceNode, to: SequenceNode) {
        self.add_node(from.clone());
        self.add_node(to.clone());
        let targets = self.edges.entry(from).or_default();
        // Duplicate declarations coalesce into a single edge.
        if !targets.contains(&to) {
            targets.push(to);
        }
    }
}
