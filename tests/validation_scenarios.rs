//! End-to-end validation scenarios
//!
//! These tests drive the full pipeline - specification parsing, graph
//! construction, ordering, remote inspection, and report aggregation -
//! against deterministic remote-state snapshots.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossdep::remote::{InspectError, RemoteState, RemoteStateInspector, SnapshotInspector};
use crossdep::validator::{DiagnosticKind, ValidationStatus};
use crossdep::{
    Report, RetryPolicy, SpecDocument, ValidationScope, Validator, ValidatorOptions,
};

const LAYERED_SPEC: &str = r#"{
    "stack_outputs": {
        "foundation": [
            {"name": "RoleArn", "description": "Deployment execution role"}
        ],
        "networking": [
            {"name": "VpcId", "description": "VPC ID"},
            {"name": "SubnetIds", "description": "Private subnet IDs"}
        ],
        "compute": [
            {"name": "LogGroupName", "description": "Application log group"}
        ]
    },
    "dependencies": {
        "compute": [
            {"target_stack": "foundation", "required_outputs": ["RoleArn"]},
            {"target_stack": "networking", "required_outputs": ["VpcId", "SubnetIds"]}
        ],
        "monitoring": [
            {"target_stack": "compute", "optional_outputs": ["LogGroupName"]}
        ]
    },
    "layers": {
        "foundation": "foundation",
        "networking": "networking"
    }
}"#;

fn layered_spec() -> SpecDocument {
    SpecDocument::from_json_str(LAYERED_SPEC).unwrap()
}

/// All stacks deployed successfully with every declared export published
fn healthy_snapshot() -> SnapshotInspector {
    SnapshotInspector::new()
        .with_stack(
            "foundation",
            RemoteState::present("CREATE_COMPLETE", [("RoleArn", "arn:aws:iam::1:role/deploy")]),
        )
        .with_stack(
            "networking",
            RemoteState::present(
                "UPDATE_COMPLETE",
                [("VpcId", "vpc-0a1b"), ("SubnetIds", "subnet-1,subnet-2")],
            ),
        )
        .with_stack(
            "compute",
            RemoteState::present("CREATE_COMPLETE", [("LogGroupName", "/app/logs")]),
        )
        .with_stack(
            "monitoring",
            RemoteState::present("CREATE_COMPLETE", Vec::<(&str, &str)>::new()),
        )
}

async fn validate(spec: &SpecDocument, inspector: SnapshotInspector) -> Report {
    Validator::new(Arc::new(inspector))
        .validate(spec, ValidationScope::AllStacks)
        .await
        .unwrap()
}

// =============================================================================
// Healthy deployment
// =============================================================================

#[tokio::test]
async fn healthy_deployment_is_valid_in_deploy_order() {
    let report = validate(&layered_spec(), healthy_snapshot()).await;

    assert!(report.is_valid());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.fatal_error, None);

    // foundation and networking are both ready first; the tie breaks
    // lexicographically.
    assert_eq!(
        report.deploy_order,
        vec!["foundation", "networking", "compute", "monitoring"]
    );

    for stack in &report.per_stack {
        assert_eq!(stack.status, ValidationStatus::Valid, "{}", stack.stack);
        assert!(stack.errors.is_empty());
    }
}

// =============================================================================
// Missing required export
// =============================================================================

#[tokio::test]
async fn missing_required_export_fails_the_dependent_only() {
    let snapshot = healthy_snapshot().with_stack(
        "networking",
        RemoteState::present("UPDATE_COMPLETE", [("VpcId", "vpc-0a1b")]),
    );

    let report = validate(&layered_spec(), snapshot).await;

    assert!(!report.is_valid());
    assert_eq!(report.exit_code(), 1);

    let compute = report.stack("compute").unwrap();
    assert_eq!(compute.status, ValidationStatus::Invalid);
    assert_eq!(compute.errors.len(), 1);
    assert_eq!(compute.errors[0].kind, DiagnosticKind::MissingExport);
    assert!(compute.errors[0].message.contains("SubnetIds"));

    for name in ["foundation", "networking", "monitoring"] {
        assert_eq!(
            report.stack(name).unwrap().status,
            ValidationStatus::Valid,
            "{name}"
        );
    }
}

// =============================================================================
// Circular dependency
// =============================================================================

#[tokio::test]
async fn circular_dependency_fails_fast() {
    let spec = SpecDocument::from_json_str(
        r#"{
            "dependencies": {
                "a": [{"target_stack": "b"}],
                "b": [{"target_stack": "a"}]
            }
        }"#,
    )
    .unwrap();

    let report = validate(&spec, SnapshotInspector::new()).await;

    assert_eq!(report.exit_code(), 2);
    assert_eq!(
        report.fatal_error.as_deref(),
        Some("circular dependency detected: a -> b -> a")
    );
    assert!(report.per_stack.is_empty());
    assert!(report.deploy_order.is_empty());
}

// =============================================================================
// Missing dependency stack
// =============================================================================

#[tokio::test]
async fn absent_dependency_is_the_dependents_error() {
    let spec = SpecDocument::from_json_str(
        r#"{
            "stack_outputs": {
                "networking": [{"name": "VpcId"}]
            },
            "dependencies": {
                "compute": [{"target_stack": "networking", "required_outputs": ["VpcId"]}]
            }
        }"#,
    )
    .unwrap();

    // networking was never deployed; compute exists from an earlier rollout.
    let snapshot = SnapshotInspector::new().with_stack(
        "compute",
        RemoteState::present("CREATE_COMPLETE", Vec::<(&str, &str)>::new()),
    );

    let report = validate(&spec, snapshot).await;

    assert!(!report.is_valid());

    let compute = report.stack("compute").unwrap();
    assert_eq!(compute.status, ValidationStatus::Invalid);
    assert_eq!(compute.errors.len(), 1);
    assert_eq!(compute.errors[0].kind, DiagnosticKind::MissingStack);
    assert!(compute.errors[0].message.contains("networking"));

    // The missing stack itself has nothing to validate against.
    let networking = report.stack("networking").unwrap();
    assert_eq!(networking.status, ValidationStatus::Skipped);
    assert!(networking.errors.is_empty());
    assert!(networking.warnings.is_empty());
}

// =============================================================================
// Dependency still deploying
// =============================================================================

#[tokio::test]
async fn non_terminal_dependency_is_a_warning_not_an_error() {
    let snapshot = healthy_snapshot().with_stack(
        "networking",
        RemoteState::present(
            "UPDATE_IN_PROGRESS",
            [("VpcId", "vpc-0a1b"), ("SubnetIds", "subnet-1,subnet-2")],
        ),
    );

    let report = validate(&layered_spec(), snapshot).await;

    // Exports are all present, so the run stays valid overall.
    assert!(report.is_valid());

    let compute = report.stack("compute").unwrap();
    assert_eq!(compute.status, ValidationStatus::Valid);
    assert!(compute.errors.is_empty());
    assert_eq!(compute.warnings.len(), 1);
    assert_eq!(compute.warnings[0].kind, DiagnosticKind::StaleState);
    assert!(compute.warnings[0].message.contains("UPDATE_IN_PROGRESS"));
}

// =============================================================================
// Failed dependency
// =============================================================================

#[tokio::test]
async fn rolled_back_dependency_is_an_error() {
    let snapshot = healthy_snapshot().with_stack(
        "networking",
        RemoteState::present("ROLLBACK_COMPLETE", Vec::<(&str, &str)>::new()),
    );

    let report = validate(&layered_spec(), snapshot).await;

    let compute = report.stack("compute").unwrap();
    assert_eq!(compute.status, ValidationStatus::Invalid);
    assert_eq!(compute.errors.len(), 1);
    assert_eq!(compute.errors[0].kind, DiagnosticKind::StaleState);
    assert!(compute.errors[0].message.contains("ROLLBACK_COMPLETE"));
}

// =============================================================================
// Unreachable backend for one stack
// =============================================================================

/// Fails inspection for one specific stack, answers from the snapshot for
/// the rest
struct PartiallyUnreachable {
    snapshot: SnapshotInspector,
    unreachable: &'static str,
}

#[async_trait]
impl RemoteStateInspector for PartiallyUnreachable {
    async fn inspect(&self, stack_name: &str) -> Result<RemoteState, InspectError> {
        if stack_name == self.unreachable {
            Err(InspectError::Throttled("rate exceeded".to_string()))
        } else {
            self.snapshot.inspect(stack_name).await
        }
    }
}

#[tokio::test]
async fn unreachable_stack_degrades_to_warning() {
    let inspector = PartiallyUnreachable {
        snapshot: healthy_snapshot(),
        unreachable: "networking",
    };

    let validator = Validator::with_options(
        Arc::new(inspector),
        ValidatorOptions {
            retry: RetryPolicy::NONE,
            call_timeout: Duration::from_secs(1),
            ..ValidatorOptions::default()
        },
    );

    let report = validator
        .validate(&layered_spec(), ValidationScope::AllStacks)
        .await
        .unwrap();

    // Reduced confidence, but the run completes and stays valid.
    assert!(report.is_valid());

    let compute = report.stack("compute").unwrap();
    assert_eq!(compute.status, ValidationStatus::Valid);
    assert_eq!(compute.warnings.len(), 1);
    assert_eq!(compute.warnings[0].kind, DiagnosticKind::RemoteUnavailable);
    assert!(compute.warnings[0].message.contains("networking"));
}

// =============================================================================
// Determinism
// =============================================================================

#[tokio::test]
async fn identical_inputs_produce_byte_identical_reports() {
    let first = validate(&layered_spec(), healthy_snapshot()).await;
    let second = validate(&layered_spec(), healthy_snapshot()).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.render_text(), second.render_text());
}

// =============================================================================
// Structural config errors
// =============================================================================

#[tokio::test]
async fn undeclared_output_reference_fails_fast() {
    let spec = SpecDocument::from_json_str(
        r#"{
            "stack_outputs": {"networking": [{"name": "VpcId"}]},
            "dependencies": {
                "compute": [{"target_stack": "networking", "required_outputs": ["VpcIdd"]}]
            }
        }"#,
    )
    .unwrap();

    let report = validate(&spec, healthy_snapshot()).await;

    assert_eq!(report.exit_code(), 2);
    let fatal = report.fatal_error.unwrap();
    assert!(fatal.contains("VpcIdd"));
    assert!(report.per_stack.is_empty());
}

#[tokio::test]
async fn dependency_on_undeclared_stack_fails_fast() {
    let spec = SpecDocument::from_json_str(
        r#"{
            "stack_outputs": {"networking": [{"name": "VpcId"}]},
            "dependencies": {
                "compute": [{"target_stack": "netwrking"}]
            }
        }"#,
    )
    .unwrap();

    let report = validate(&spec, healthy_snapshot()).await;

    assert_eq!(report.exit_code(), 2);
    assert!(report
        .fatal_error
        .unwrap()
        .contains("compute -> netwrking"));
}
