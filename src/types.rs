//! Core types for the reportflow engine: sequence nodes and workflow status.
//!
//! Both types support a stable, human-readable string encoding used by the
//! persistence layer. Delay-node identity is fully determined by
//! `(millis, predecessor, dependent)`, so rebuilding the graph for the same
//! plan reproduces identical node ids, a requirement for resuming a run from
//! a persisted sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a computed action sequence: either a real plan action or a
/// synthetic delay inserted between two actions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceNode {
    /// A real action, identified by its plan-local id.
    Action(String),
    /// A pure time wait of `millis` between action `after` and action
    /// `before`. Not part of the original plan.
    Delay {
        millis: u64,
        after: String,
        before: String,
    },
}

impl SequenceNode {
    pub fn action(id: impl Into<String>) -> Self {
        SequenceNode::Action(id.into())
    }

    /// Deterministic delay-node constructor; the same inputs always yield the
    /// same identity.
    pub fn delay(millis: u64, after: impl Into<String>, before: impl Into<String>) -> Self {
        SequenceNode::Delay {
            millis,
            after: after.into(),
            before: before.into(),
        }
    }

    /// Returns `true` if this is a delay node.
    #[must_use]
    pub fn is_delay(&self) -> bool {
        matches!(self, SequenceNode::Delay { .. })
    }

    /// Encode into the persisted string form:
    /// - `Action("a")` → `"Action:a"`
    /// - `Delay { 60000, "a", "b" }` → `"Delay:60000:a:b"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            SequenceNode::Action(id) => format!("Action:{id}"),
            SequenceNode::Delay {
                millis,
                after,
                before,
            } => format!("Delay:{millis}:{after}:{before}"),
        }
    }

    /// Decode a persisted string form. Unrecognized encodings fall back to
    /// `Action` carrying the raw string, keeping old sequences loadable.
    pub fn decode(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix("Action:") {
            return SequenceNode::Action(rest.to_string());
        }
        if let Some(rest) = s.strip_prefix("Delay:") {
            let mut parts = rest.splitn(3, ':');
            if let (Some(ms), Some(after), Some(before)) =
                (parts.next(), parts.next(), parts.next())
                && let Ok(millis) = ms.parse::<u64>()
            {
                return SequenceNode::Delay {
                    millis,
                    after: after.to_string(),
                    before: before.to_string(),
                };
            }
        }
        SequenceNode::Action(s.to_string())
    }
}

impl fmt::Display for SequenceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceNode::Action(id) => write!(f, "{id}"),
            SequenceNode::Delay { millis, .. } => write!(f, "delay({millis}ms)"),
        }
    }
}

/// Terminal and in-flight states of a workflow run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    /// Stepping through the sequence.
    Running,
    /// The last advanced step was a delay node; a resumption has been
    /// scheduled and control has been yielded.
    Delaying,
    /// The step index reached the sequence length.
    Completed,
    /// An action set the exit-status field.
    ExitedEarly,
    /// The cancellation indicator was observed before a step dispatched.
    Cancelled,
}

impl WorkflowStatus {
    /// Returns `true` if no further steps will execute.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::ExitedEarly | WorkflowStatus::Cancelled
        )
    }

    #[must_use]
    pub fn encode(self) -> &'static str {
        match self {
            WorkflowStatus::Running => "Running",
            WorkflowStatus::Delaying => "Delaying",
            WorkflowStatus::Completed => "Completed",
            WorkflowStatus::ExitedEarly => "ExitedEarly",
            WorkflowStatus::Cancelled => "Cancelled",
        }
    }

    /// Decode a persisted status string; unknown strings fall back to
    /// `Running` so stale rows stay loadable.
    pub fn decode(s: &str) -> Self {
        match s {
            "Delaying" => WorkflowStatus::Delaying,
            "Completed" => WorkflowStatus::Completed,
            "ExitedEarly" => WorkflowStatus::ExitedEarly,
            "Cancelled" => WorkflowStatus::Cancelled,
            _ => WorkflowStatus::Running,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_node_encoding_round_trips() {
        let action = SequenceNode::action("validate");
        assert_eq!(action.encode(), "Action:validate");
        assert_eq!(SequenceNode::decode(&action.encode()), action);

        let delay = SequenceNode::delay(60_000, "a", "b");
        assert_eq!(delay.encode(), "Delay:60000:a:b");
        assert_eq!(SequenceNode::decode(&delay.encode()), delay);
    }

    #[test]
    fn unknown_encoding_falls_back_to_action() {
        assert_eq!(
            SequenceNode::decode("Delay:not-a-number"),
            SequenceNode::Action("Delay:not-a-number".to_string())
        );
        assert_eq!(
            SequenceNode::decode("bare-id"),
            SequenceNode::Action("bare-id".to_string())
        );
    }

    #[test]
    fn delay_identity_is_deterministic() {
        assert_eq!(
            SequenceNode::delay(1000, "x", "y"),
            SequenceNode::delay(1000, "x", "y")
        );
        assert_ne!(
            SequenceNode::delay(1000, "x", "y"),
            SequenceNode::delay(1000, "y", "x")
        );
    }

    #[test]
    fn status_decode_defaults_to_running() {
        assert_eq!(WorkflowStatus::decode("Cancelled"), WorkflowStatus::Cancelled);
        assert_eq!(WorkflowStatus::decode("???"), WorkflowStatus::Running);
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(!WorkflowStatus::Delaying.is_terminal());
    }
}
