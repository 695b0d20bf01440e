//! Baseline reporting profile: the action set registered at process start.
//!
//! These implementations carry no clinical business logic; they exercise the
//! context's mutation channels and follow the outcome-flag convention: each
//! action records a boolean flag downstream actions can react to, and failure
//! records the flag as `false` rather than erroring the run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::action::{Action, ActionError};
use crate::context::ExecutionContext;
use crate::registry::{ActionRegistry, ActionSet};

/// Profile URI of the baseline action set.
pub const BASE_PROFILE: &str = "urn:reportflow:profile:base";

/// Flag names recorded by the baseline actions.
pub mod flags {
    pub const REPORT_CREATED: &str = "report-created";
    pub const VALIDATED: &str = "validated";
    pub const SUBMITTED: &str = "submitted";
    pub const DEIDENTIFIED: &str = "deidentified";
}

/// Assembles a minimal report bundle from the content artifact and records.
pub struct CreateReport;

#[async_trait]
impl Action for CreateReport {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        let entries: Vec<Value> = ctx
            .records
            .iter()
            .map(|r| json!({ "resource": r }))
            .collect();
        let mut report = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": entries,
        });
        if let Some(content) = &ctx.content {
            report["content"] = content.clone();
        }
        ctx.report = Some(report);
        ctx.set_flag(flags::REPORT_CREATED, true);
        Ok(())
    }
}

/// Marks the report validated. Validation proper lives outside the engine;
/// this step only records the outcome flag the baseline pipeline expects.
pub struct ValidateReport;

#[async_trait]
impl Action for ValidateReport {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        let valid = ctx.report.is_some();
        ctx.set_flag(flags::VALIDATED, valid);
        Ok(())
    }
}

/// Submits the report. With no report to submit, records `submitted = false`
/// and returns cleanly instead of failing the step.
pub struct SubmitReport;

#[async_trait]
impl Action for SubmitReport {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        if ctx.report.is_none() {
            ctx.set_flag(flags::SUBMITTED, false);
            return Ok(());
        }
        ctx.set_flag(flags::SUBMITTED, true);
        Ok(())
    }
}

/// Strips direct identifiers from a copy of the report artifact.
pub struct DeidentifyReport;

const DIRECT_IDENTIFIERS: &[&str] = &["name", "identifier", "telecom", "address", "subject"];

#[async_trait]
impl Action for DeidentifyReport {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        let Some(report) = ctx.report.take() else {
            return Err(ActionError::MissingInput { what: "report" });
        };
        let mut scrubbed = report;
        if let Some(entries) = scrubbed.get_mut("entry").and_then(Value::as_array_mut) {
            for entry in entries {
                if let Some(resource) = entry.get_mut("resource").and_then(Value::as_object_mut) {
                    for key in DIRECT_IDENTIFIERS {
                        resource.remove(*key);
                    }
                }
            }
        }
        ctx.report = Some(scrubbed);
        ctx.set_flag(flags::DEIDENTIFIED, true);
        Ok(())
    }
}

/// Terminal step of the baseline pipeline: requests an early exit so the run
/// finishes deterministically even when trailing plan actions exist.
pub struct CompleteReporting;

#[async_trait]
impl Action for CompleteReporting {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        ctx.request_exit("reporting-complete");
        Ok(())
    }
}

/// The baseline action set, keyed by the codes the base profile understands.
#[must_use]
pub fn baseline_actions() -> ActionSet {
    ActionSet::new()
        .with("create-report", Arc::new(CreateReport))
        .with("validate-report", Arc::new(ValidateReport))
        .with("submit-report", Arc::new(SubmitReport))
        .with("deidentify-report", Arc::new(DeidentifyReport))
        .with("complete-reporting", Arc::new(CompleteReporting))
}

/// Register the baseline profile. Called once by host startup code, before
/// any workflow referencing [`BASE_PROFILE`] executes.
pub fn register_baseline(registry: &mut ActionRegistry) {
    registry.register_profile(BASE_PROFILE, baseline_actions());
}
