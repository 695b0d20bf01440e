//! Plan and registry fixtures shared across the integration suite.

use std::sync::Arc;

use serde_json::json;

use reportflow::context::{ExecutionContext, WorkflowTrigger};
use reportflow::events::{EventBus, MemorySink};
use reportflow::plan::{ActionOutput, Plan, PlanAction, RelatedAction};
use reportflow::registry::{ActionRegistry, ActionSet};
use reportflow::runtime::executor::WorkflowExecutor;
use reportflow::runtime::store::ContextStore;

use super::actions::{FlagAction, IncrementCounter, InitCounter};

/// Profile URI used by the test registry fixtures.
pub const TEST_PROFILE: &str = "urn:reportflow:profile:test";

/// The create-report action every executable plan fixture carries, so the
/// profile resolver pins [`TEST_PROFILE`].
pub fn create_report_action(id: &str) -> PlanAction {
    let mut action = PlanAction::new(id, "create-report");
    action
        .outputs
        .push(ActionOutput::bundle(vec![TEST_PROFILE.to_string()]));
    action
}

/// `[A(init-counter), B(increment-counter), C(increment-counter),
/// D(create-report)]` with no related-action entries: executes in
/// declaration order.
pub fn counter_plan() -> Plan {
    Plan {
        id: "counter-plan".into(),
        title: Some("counter fixture".into()),
        actions: vec![
            PlanAction::new("a", "init-counter"),
            PlanAction::new("b", "increment-counter"),
            PlanAction::new("c", "increment-counter"),
            create_report_action("d"),
        ],
    }
}

/// Counter plan variant where `a → b` carries a one-minute offset, so one
/// delay node lands between them.
pub fn offset_counter_plan() -> Plan {
    let mut plan = counter_plan();
    plan.id = "offset-counter-plan".into();
    plan.actions[0]
        .related
        .push(RelatedAction::before("b").with_offset(1, "min"));
    plan
}

/// Two actions depending on each other: sequencing must fail.
pub fn cyclic_plan() -> Plan {
    let mut first = PlanAction::new("x", "init-counter");
    first.related.push(RelatedAction::before("y"));
    let mut second = PlanAction::new("y", "increment-counter");
    second.related.push(RelatedAction::before("x"));
    Plan {
        id: "cyclic-plan".into(),
        title: None,
        actions: vec![first, second],
    }
}

/// Registry with the counter actions under [`TEST_PROFILE`].
pub fn counter_registry() -> ActionRegistry {
    let set = ActionSet::new()
        .with("init-counter", Arc::new(InitCounter))
        .with("increment-counter", Arc::new(IncrementCounter))
        .with(
            "create-report",
            Arc::new(FlagAction {
                name: "report-created",
            }),
        );
    ActionRegistry::new().with_profile(TEST_PROFILE, set)
}

/// Initialize and persist a fresh context for a plan, returning its id.
pub async fn seed_context(store: &dyn ContextStore, plan: Plan) -> String {
    let trigger = WorkflowTrigger::from_resource(json!({"resourceType": "Condition"}))
        .with_patient(json!({"resourceType": "Patient", "id": "pat-1"}));
    let context = ExecutionContext::initialize(plan, &trigger).expect("plan sequences");
    store.save(&context).await.expect("seed save");
    context.id
}

/// Executor wired to a memory-sink event bus; returns the sink for event
/// assertions. The bus listener is started.
pub fn executor_with_memory_bus(
    registry: ActionRegistry,
    store: Arc<dyn ContextStore>,
    delays: Arc<dyn reportflow::runtime::executor::DelayScheduler>,
) -> (WorkflowExecutor, MemorySink, EventBus) {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    let executor = WorkflowExecutor::new(Arc::new(registry), store, bus.get_sender(), delays);
    (executor, sink, bus)
}
