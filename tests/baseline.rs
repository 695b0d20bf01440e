mod common;
use common::*;

use std::sync::Arc;

use serde_json::json;

use reportflow::baseline::{self, BASE_PROFILE, flags};
use reportflow::context::{ExecutionContext, WorkflowTrigger};
use reportflow::plan::{ActionOutput, Plan, PlanAction};
use reportflow::registry::ActionRegistry;
use reportflow::runtime::store::{ContextStore, InMemoryContextStore};
use reportflow::types::WorkflowStatus;

/// The canonical baseline pipeline: create, validate, deidentify, submit,
/// complete.
fn baseline_plan() -> Plan {
    let mut create = PlanAction::new("create", "create-report");
    create
        .outputs
        .push(ActionOutput::bundle(vec![BASE_PROFILE.to_string()]));
    Plan {
        id: "baseline-pipeline".into(),
        title: Some("baseline reporting".into()),
        actions: vec![
            create,
            PlanAction::new("validate", "validate-report"),
            PlanAction::new("deidentify", "deidentify-report"),
            PlanAction::new("submit", "submit-report"),
            PlanAction::new("complete", "complete-reporting"),
        ],
    }
}

fn baseline_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    baseline::register_baseline(&mut registry);
    registry
}

async fn run_baseline(trigger: WorkflowTrigger) -> ExecutionContext {
    let store: Arc<InMemoryContextStore> = Arc::new(InMemoryContextStore::new());
    let ctx = ExecutionContext::initialize(baseline_plan(), &trigger).expect("init");
    let id = ctx.id.clone();
    store.save(&ctx).await.expect("save");

    let (executor, _sink, _bus) = executor_with_memory_bus(
        baseline_registry(),
        store.clone(),
        Arc::new(InstantDelayScheduler::new()),
    );
    executor.run_to_completion(&id).await.expect("run");
    store.load(&id).await.expect("load").expect("present")
}

#[tokio::test]
async fn baseline_pipeline_assembles_and_submits_a_report() {
    let trigger = WorkflowTrigger::from_resource(json!({"resourceType": "Condition"}))
        .with_patient(json!({
            "resourceType": "Patient",
            "id": "pat-1",
            "name": [{"family": "Doe"}],
            "birthDate": "1980-01-01"
        }));
    let ctx = run_baseline(trigger).await;

    // complete-reporting ends the run through the exit status.
    assert_eq!(ctx.status, WorkflowStatus::ExitedEarly);
    assert_eq!(ctx.exit_status.as_deref(), Some("reporting-complete"));

    assert!(ctx.flag(flags::REPORT_CREATED));
    assert!(ctx.flag(flags::VALIDATED));
    assert!(ctx.flag(flags::DEIDENTIFIED));
    assert!(ctx.flag(flags::SUBMITTED));

    let report = ctx.report.as_ref().expect("report assembled");
    assert_eq!(report["resourceType"], "Bundle");
    let entries = report["entry"].as_array().expect("entries");
    assert_eq!(entries.len(), 1, "the seeded patient record");
    assert!(ctx.errors.is_empty());
}

#[tokio::test]
async fn deidentify_strips_direct_identifiers_but_keeps_the_rest() {
    let trigger = WorkflowTrigger::from_resource(json!({"resourceType": "Condition"}))
        .with_patient(json!({
            "resourceType": "Patient",
            "id": "pat-1",
            "name": [{"family": "Doe"}],
            "identifier": [{"value": "mrn-123"}],
            "telecom": [{"value": "555-0100"}],
            "address": [{"city": "Springfield"}],
            "birthDate": "1980-01-01"
        }));
    let ctx = run_baseline(trigger).await;

    let resource = &ctx.report.as_ref().expect("report")["entry"][0]["resource"];
    assert!(resource.get("name").is_none());
    assert!(resource.get("identifier").is_none());
    assert!(resource.get("telecom").is_none());
    assert!(resource.get("address").is_none());
    assert_eq!(resource["birthDate"], "1980-01-01", "non-identifying data kept");
    assert_eq!(resource["resourceType"], "Patient");
}

#[tokio::test]
async fn deidentify_without_a_report_is_a_contained_failure() {
    // Deidentify ahead of create: the step fails, is recorded, and the run
    // still finishes the pipeline.
    let mut create = PlanAction::new("create", "create-report");
    create
        .outputs
        .push(ActionOutput::bundle(vec![BASE_PROFILE.to_string()]));
    let plan = Plan {
        id: "deidentify-first".into(),
        title: None,
        actions: vec![
            PlanAction::new("deidentify", "deidentify-report"),
            create,
            PlanAction::new("complete", "complete-reporting"),
        ],
    };

    let store: Arc<InMemoryContextStore> = Arc::new(InMemoryContextStore::new());
    let trigger = WorkflowTrigger::from_resource(json!({"resourceType": "Condition"}));
    let ctx = ExecutionContext::initialize(plan, &trigger).expect("init");
    let id = ctx.id.clone();
    store.save(&ctx).await.expect("save");

    let (executor, _sink, _bus) = executor_with_memory_bus(
        baseline_registry(),
        store.clone(),
        Arc::new(InstantDelayScheduler::new()),
    );
    executor.run_to_completion(&id).await.expect("run");

    let ctx = store.load(&id).await.expect("load").expect("present");
    assert_eq!(ctx.errors.len(), 1);
    assert_eq!(ctx.errors[0].action, "deidentify");
    assert!(ctx.flag(flags::REPORT_CREATED), "later steps still ran");
    assert_eq!(ctx.exit_status.as_deref(), Some("reporting-complete"));
}

#[tokio::test]
async fn submit_without_a_report_records_a_negative_outcome() {
    let mut ctx = ExecutionContext::initialize(
        baseline_plan(),
        &WorkflowTrigger::from_resource(json!({"resourceType": "Condition"})),
    )
    .expect("init");

    use reportflow::action::Action;
    baseline::SubmitReport
        .execute(&mut ctx)
        .await
        .expect("clean return");
    assert!(!ctx.flag(flags::SUBMITTED));
}
