//! Plan data model: the declarative input that drives a workflow run.
//!
//! A [`Plan`] is an ordered list of [`PlanAction`]s, each optionally carrying a
//! code (used to resolve its implementation), related-action dependency
//! declarations, and declared outputs. The shape mirrors the external
//! PlanDefinition-like JSON this engine consumes, so everything deserializes
//! directly with serde.
//!
//! Plans are immutable during a run; validation of relationship kinds and
//! timing units happens when the dependency graph is built, not here.

use serde::{Deserialize, Serialize};

/// A declarative, ordered set of actions with optional dependency and timing
/// constraints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Stable identifier of this plan.
    pub id: String,
    /// Optional human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The actions, in declaration order. Declaration order is the tie-break
    /// for actions with no ordering constraints between them.
    #[serde(default)]
    pub actions: Vec<PlanAction>,
}

impl Plan {
    /// Look up an action by its plan-local identifier.
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&PlanAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Find the first action carrying the given code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&PlanAction> {
        self.actions
            .iter()
            .find(|a| a.code.as_deref() == Some(code))
    }
}

/// A single named step in a [`Plan`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanAction {
    /// Identifier unique within the plan.
    pub id: String,
    /// Symbolic name used to look up the implementation in the action
    /// registry. Actions without a code are sequencing-only placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Dependency declarations against other actions in the same plan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedAction>,
    /// Declared outputs. Only the report-creation action's bundle output is
    /// interpreted by the engine (profile selection); the rest is opaque.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ActionOutput>,
}

impl PlanAction {
    /// Convenience constructor for a code-bearing action with no edges.
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    /// The first declared output whose kind marks it as the report bundle.
    #[must_use]
    pub fn bundle_output(&self) -> Option<&ActionOutput> {
        self.outputs
            .iter()
            .find(|o| o.kind.as_deref() == Some(ActionOutput::BUNDLE))
    }
}

/// Declares that this action must complete before another action starts,
/// optionally separated by a timing offset.
///
/// The relationship kind is carried as its wire string and validated when the
/// dependency graph is built; [`RelatedAction::BEFORE_START`] is the only
/// supported kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RelatedAction {
    /// Identifier of the dependent action. Forward references (targets
    /// declared later in the plan, or not at all) are tolerated.
    pub target: String,
    /// Relationship kind, string-typed on the wire.
    pub relationship: String,
    /// Optional wait inserted between the two actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<TimingOffset>,
}

impl RelatedAction {
    /// The only supported relationship kind: the declaring action must
    /// complete before the target starts.
    pub const BEFORE_START: &'static str = "before-start";

    pub fn before(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            relationship: Self::BEFORE_START.to_string(),
            offset: None,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, value: u64, unit: impl Into<String>) -> Self {
        self.offset = Some(TimingOffset {
            value,
            unit: unit.into(),
        });
        self
    }
}

/// A positive duration value plus a unit symbol, validated by the duration
/// converter at graph-build time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingOffset {
    pub value: u64,
    pub unit: String,
}

/// A declared output of an action.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionOutput {
    /// Semantic type of the output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Profile URIs attached to this output. For the report-creation action's
    /// bundle output, the first profile selects the action set for the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
}

impl ActionOutput {
    /// Output kind marking the report bundle.
    pub const BUNDLE: &'static str = "Bundle";

    pub fn bundle(profiles: Vec<String>) -> Self {
        Self {
            kind: Some(Self::BUNDLE.to_string()),
            profiles,
        }
    }
}
