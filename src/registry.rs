//! Two-level action lookup: profile URI → action code → implementation.
//!
//! The registry is an explicit, process-scoped object built mutably at
//! startup and then shared as `Arc<ActionRegistry>`, never ambient global
//! state. New reporting profiles are a deployment-time extension point:
//! extension modules register their own [`ActionSet`] (often derived from the
//! baseline set via [`ActionSet::merge`]) without mutating anyone else's.
//!
//! A lookup miss is not an error at this level; the executor treats it as a
//! logged no-op step.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::action::Action;

/// A named bundle of action implementations, keyed by action code.
#[derive(Clone, Default)]
pub struct ActionSet {
    actions: FxHashMap<String, Arc<dyn Action>>,
}

impl ActionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under a code, replacing any previous entry.
    pub fn insert(&mut self, code: impl Into<String>, action: Arc<dyn Action>) -> &mut Self {
        self.actions.insert(code.into(), action);
        self
    }

    /// Builder-style variant of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, code: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.insert(code, action);
        self
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(code).cloned()
    }

    /// The registered codes, unordered.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Start from `base` and overlay this set's entries, without mutating
    /// `base`. This is how extension profiles reuse the baseline actions.
    #[must_use]
    pub fn merge(&self, base: &ActionSet) -> ActionSet {
        let mut merged = base.clone();
        for (code, action) in &self.actions {
            merged.actions.insert(code.clone(), action.clone());
        }
        merged
    }
}

impl std::fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<&str> = self.codes();
        codes.sort_unstable();
        f.debug_struct("ActionSet").field("codes", &codes).finish()
    }
}

/// Process-wide mapping from profile URI to its [`ActionSet`].
#[derive(Clone, Default)]
pub struct ActionRegistry {
    profiles: FxHashMap<String, ActionSet>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a whole action set under a profile URI, replacing any
    /// previous set for that profile.
    pub fn register_profile(&mut self, profile: impl Into<String>, set: ActionSet) -> &mut Self {
        self.profiles.insert(profile.into(), set);
        self
    }

    /// Register a single implementation under `(profile, code)`, creating the
    /// profile's set if needed.
    pub fn register(
        &mut self,
        profile: impl Into<String>,
        code: impl Into<String>,
        action: Arc<dyn Action>,
    ) -> &mut Self {
        self.profiles
            .entry(profile.into())
            .or_default()
            .insert(code, action);
        self
    }

    /// Builder-style variant of [`register_profile`](Self::register_profile).
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>, set: ActionSet) -> Self {
        self.register_profile(profile, set);
        self
    }

    /// Resolve an implementation by `(profile, code)`. `None` is a dispatch
    /// miss, handled by the caller.
    #[must_use]
    pub fn get(&self, profile: &str, code: &str) -> Option<Arc<dyn Action>> {
        self.profiles.get(profile).and_then(|set| set.get(code))
    }

    #[must_use]
    pub fn contains_profile(&self, profile: &str) -> bool {
        self.profiles.contains_key(profile)
    }

    /// The registered profile URIs, unordered.
    #[must_use]
    pub fn profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut profiles: Vec<&str> = self.profiles();
        profiles.sort_unstable();
        f.debug_struct("ActionRegistry")
            .field("profiles", &profiles)
            .finish()
    }
}
