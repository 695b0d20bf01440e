//! Stable topological sequencing of a dependency graph.
//!
//! Kahn's algorithm with a min-heap keyed on node discovery index: among the
//! nodes whose dependencies are all satisfied, the earliest-declared one runs
//! next. A plan with no related-action entries therefore executes in exact
//! declaration order, and identical input always yields identical output.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::builder::DependencyGraph;
use crate::types::SequenceNode;

/// Sequencing failures.
#[derive(Debug, Error, Diagnostic)]
pub enum SequenceError {
    #[error("dependency cycle detected; unresolved nodes: {unresolved:?}")]
    #[diagnostic(
        code(reportflow::sequence::cycle),
        help("Remove the circular relatedAction declarations; a cycle is a plan configuration error.")
    )]
    CycleDetected { unresolved: Vec<String> },
}

/// Order the graph's nodes into a single linear execution sequence.
///
/// Returns a total order in which every edge `u → v` places `u` before `v`.
/// Never returns a partial order: a cycle fails with
/// [`SequenceError::CycleDetected`] listing the nodes left unresolved.
pub fn sequence(graph: &DependencyGraph) -> Result<Vec<SequenceNode>, SequenceError> {
    let nodes = graph.nodes();
    let position: FxHashMap<&SequenceNode, usize> =
        nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut indegree: FxHashMap<usize, usize> = (0..nodes.len()).map(|i| (i, 0)).collect();
    for targets in graph.edges().values() {
        for target in targets {
            *indegree.entry(position[target]).or_insert(0) += 1;
        }
    }

    // Min-heap on discovery index keeps the sort stable and deterministic.
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| Reverse(*i))
        .collect();

    let mut ordered = Vec::with_capacity(nodes.len());
    while let Some(Reverse(index)) = ready.pop() {
        let node = &nodes[index];
        ordered.push(node.clone());
        if let Some(targets) = graph.edges().get(node) {
            for target in targets {
                let target_index = position[target];
                let deg = indegree
                    .get_mut(&target_index)
                    .expect("every node has an indegree entry");
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(target_index));
                }
            }
        }
    }

    if ordered.len() != nodes.len() {
        let unresolved = indegree
            .iter()
            .filter(|(_, deg)| **deg > 0)
            .map(|(i, _)| nodes[*i].encode())
            .collect();
        return Err(SequenceError::CycleDetected { unresolved });
    }

    Ok(ordered)
}
