//! Reporting-profile resolution.
//!
//! Each plan designates exactly one report-creation action (code
//! [`CREATE_REPORT_CODE`]); the first profile URI on that action's bundle
//! output selects which [`ActionRegistry`](crate::registry::ActionRegistry)
//! entry governs the whole run. Missing pieces are configuration errors
//! surfaced to the run initiator, never silently defaulted.

use miette::Diagnostic;
use thiserror::Error;

use crate::plan::Plan;

/// Action code designating a plan's report-creation step.
pub const CREATE_REPORT_CODE: &str = "create-report";

/// Configuration errors raised while resolving a plan's reporting profile.
#[derive(Debug, Error, Diagnostic)]
pub enum ProfileError {
    #[error("plan {plan:?} has no {CREATE_REPORT_CODE:?} action")]
    #[diagnostic(
        code(reportflow::profile::missing_create_report),
        help("Every plan must declare exactly one action coded \"create-report\".")
    )]
    MissingCreateReportAction { plan: String },

    #[error("the {CREATE_REPORT_CODE:?} action of plan {plan:?} declares no bundle profile")]
    #[diagnostic(
        code(reportflow::profile::missing_bundle_profile),
        help("Add a Bundle output with at least one profile URI to the create-report action.")
    )]
    MissingBundleProfile { plan: String },
}

/// Extract the profile URI governing a plan's run.
///
/// Locates the single create-report action, then takes the first profile URI
/// of its bundle output.
pub fn resolve_reporting_profile(plan: &Plan) -> Result<String, ProfileError> {
    let action =
        plan.find_by_code(CREATE_REPORT_CODE)
            .ok_or_else(|| ProfileError::MissingCreateReportAction {
                plan: plan.id.clone(),
            })?;

    action
        .bundle_output()
        .and_then(|output| output.profiles.first())
        .cloned()
        .ok_or_else(|| ProfileError::MissingBundleProfile {
            plan: plan.id.clone(),
        })
}
