mod common;
use common::*;

use reportflow::graph::{DependencyGraph, GraphError, SequenceError, plan_sequence, sequence};
use reportflow::plan::{Plan, PlanAction, RelatedAction};
use reportflow::types::SequenceNode;

fn action_ids(sequence: &[SequenceNode]) -> Vec<String> {
    sequence
        .iter()
        .filter_map(|n| match n {
            SequenceNode::Action(id) => Some(id.clone()),
            SequenceNode::Delay { .. } => None,
        })
        .collect()
}

#[test]
fn plan_without_edges_keeps_declaration_order() {
    let sequence = plan_sequence(&counter_plan()).unwrap();
    assert_eq!(
        sequence,
        vec![
            SequenceNode::action("a"),
            SequenceNode::action("b"),
            SequenceNode::action("c"),
            SequenceNode::action("d"),
        ]
    );
}

#[test]
fn offset_inserts_single_delay_node_between_actions() {
    let sequence = plan_sequence(&offset_counter_plan()).unwrap();

    let delays: Vec<&SequenceNode> = sequence.iter().filter(|n| n.is_delay()).collect();
    assert_eq!(delays.len(), 1);
    assert_eq!(
        *delays[0],
        SequenceNode::delay(60_000, "a", "b"),
        "one minute is exactly 60000 ms"
    );

    let pos = |node: &SequenceNode| sequence.iter().position(|n| n == node).unwrap();
    let a = pos(&SequenceNode::action("a"));
    let delay = pos(delays[0]);
    let b = pos(&SequenceNode::action("b"));
    assert!(a < delay && delay < b, "delay lies strictly between a and b");
}

#[test]
fn graph_construction_is_idempotent() {
    let plan = offset_counter_plan();
    let first = plan_sequence(&plan).unwrap();
    let second = plan_sequence(&plan).unwrap();
    assert_eq!(first, second, "same plan reproduces identical node identities");
}

#[test]
fn dependency_edges_are_respected() {
    // Declared out of order: d depends on nothing, but c must precede a.
    let mut c = PlanAction::new("c", "x");
    c.related.push(RelatedAction::before("a"));
    let plan = Plan {
        id: "edges".into(),
        title: None,
        actions: vec![
            PlanAction::new("a", "x"),
            PlanAction::new("b", "x"),
            c,
            PlanAction::new("d", "x"),
        ],
    };
    let ids = action_ids(&plan_sequence(&plan).unwrap());
    let pos = |id: &str| ids.iter().position(|i| i == id).unwrap();
    assert!(pos("c") < pos("a"));
    // Unconstrained pairs keep declaration order.
    assert!(pos("b") < pos("d"));
}

#[test]
fn forward_reference_to_undeclared_action_is_tolerated() {
    let mut a = PlanAction::new("a", "x");
    a.related.push(RelatedAction::before("ghost"));
    let plan = Plan {
        id: "forward".into(),
        title: None,
        actions: vec![a],
    };
    let sequence = plan_sequence(&plan).unwrap();
    assert_eq!(
        sequence,
        vec![SequenceNode::action("a"), SequenceNode::action("ghost")]
    );
}

#[test]
fn cycle_is_rejected_with_distinct_error() {
    let graph = DependencyGraph::from_plan(&cyclic_plan()).unwrap();
    match sequence(&graph) {
        Err(SequenceError::CycleDetected { unresolved }) => {
            assert!(!unresolved.is_empty(), "cycle error names the stuck nodes");
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn duplicate_action_id_is_a_configuration_error() {
    let plan = Plan {
        id: "dup".into(),
        title: None,
        actions: vec![PlanAction::new("a", "x"), PlanAction::new("a", "y")],
    };
    assert!(matches!(
        DependencyGraph::from_plan(&plan),
        Err(GraphError::DuplicateActionId { .. })
    ));
}

#[test]
fn unsupported_relationship_kind_is_a_configuration_error() {
    let mut a = PlanAction::new("a", "x");
    a.related.push(RelatedAction {
        target: "b".into(),
        relationship: "after-end".into(),
        offset: None,
    });
    let plan = Plan {
        id: "bad-kind".into(),
        title: None,
        actions: vec![a, PlanAction::new("b", "y")],
    };
    match DependencyGraph::from_plan(&plan) {
        Err(GraphError::UnsupportedRelationship {
            action,
            relationship,
        }) => {
            assert_eq!(action, "a");
            assert_eq!(relationship, "after-end");
        }
        other => panic!("expected UnsupportedRelationship, got {other:?}"),
    }
}

#[test]
fn unknown_offset_unit_propagates_as_graph_error() {
    let mut a = PlanAction::new("a", "x");
    a.related
        .push(RelatedAction::before("b").with_offset(2, "mo"));
    let plan = Plan {
        id: "bad-unit".into(),
        title: None,
        actions: vec![a, PlanAction::new("b", "y")],
    };
    assert!(matches!(
        DependencyGraph::from_plan(&plan),
        Err(GraphError::Duration(_))
    ));
}

#[test]
fn duplicate_related_declarations_coalesce() {
    let mut a = PlanAction::new("a", "x");
    a.related.push(RelatedAction::before("b"));
    a.related.push(RelatedAction::before("b"));
    let plan = Plan {
        id: "dup-edge".into(),
        title: None,
        actions: vec![a, PlanAction::new("b", "y")],
    };
    let graph = DependencyGraph::from_plan(&plan).unwrap();
    assert_eq!(graph.edge_count(), 1);
    let ordered = sequence(&graph).unwrap();
    assert_eq!(ordered.len(), 2);
}
