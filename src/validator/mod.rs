//! Validation orchestration
//!
//! Drives a full validation run: build the graph, fail fast on structural
//! errors, fan out remote inspections through a bounded worker pool, then
//! walk the stacks in deploy order cross-checking declared contracts
//! against remote reality.
//!
//! All run state lives in the run itself; the validator holds only its
//! collaborators and configuration and can be reused across runs.

mod report;

pub use report::{
    Diagnostic, DiagnosticKind, Report, ReportStatus, StackValidation, ValidationStatus,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SpecDocument;
use crate::domain::{
    cycle, order, DependencyGraph, Requirement, StackStatus,
};
use crate::remote::{RemoteState, RemoteStateInspector, RetryPolicy, RetryingInspector};

/// What a validation run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationScope {
    /// Validate every stack in the specification
    AllStacks,
    /// Validate a single stack against its dependencies; everything else
    /// is reported as skipped
    OneStack(String),
}

/// How missing conditional outputs are judged
///
/// The backend omits an output whose deployment condition evaluated false,
/// and the core cannot evaluate conditions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionalOutputPolicy {
    /// A missing conditional output is never an error, only a warning
    #[default]
    AlwaysOptional,
    /// Conditional outputs are validated exactly as declared
    Declared,
}

/// Tunables for a validation run
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Width of the remote inspection worker pool
    pub concurrency: usize,

    /// Time bound on a single backend call
    pub call_timeout: Duration,

    /// Backoff schedule for transient backend failures
    pub retry: RetryPolicy,

    /// Treatment of outputs gated by deployment conditions
    pub conditional_outputs: ConditionalOutputPolicy,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::DEFAULT,
            conditional_outputs: ConditionalOutputPolicy::AlwaysOptional,
        }
    }
}

/// A run that ended without producing a report
#[derive(Debug, Error, PartialEq)]
pub enum RunAborted {
    #[error("validation run cancelled before completion")]
    Cancelled,
}

/// Phase of the per-run state machine, surfaced in log output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    FailedFast,
    Completed,
}

/// Orchestrates validation runs against a remote state inspector
pub struct Validator {
    inspector: Arc<dyn RemoteStateInspector>,
    options: ValidatorOptions,
    cancel: CancellationToken,
}

impl Validator {
    /// Creates a validator with default options
    pub fn new(inspector: Arc<dyn RemoteStateInspector>) -> Self {
        Self::with_options(inspector, ValidatorOptions::default())
    }

    /// Creates a validator with explicit options
    pub fn with_options(inspector: Arc<dyn RemoteStateInspector>, options: ValidatorOptions) -> Self {
        Self {
            inspector,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Token to cancel an in-flight run
    ///
    /// Cancellation lets in-flight backend calls finish or time out; the
    /// run then ends with [`RunAborted::Cancelled`] and no partial report.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs a full validation pass over the specification
    ///
    /// Structural errors (malformed spec, unknown stacks, cycles) produce a
    /// fail-fast report carrying only `fatal_error`; no backend calls are
    /// made for those. Per-stack findings never abort the run.
    pub async fn validate(
        &self,
        spec: &SpecDocument,
        scope: ValidationScope,
    ) -> Result<Report, RunAborted> {
        let mut state = RunState::Running;
        debug!(?state, "starting validation run");

        let (nodes, edges) = match spec.resolve() {
            Ok(entities) => entities,
            Err(error) => return Ok(self.fail_fast(&mut state, error.to_string())),
        };

        let graph = match DependencyGraph::build(nodes, edges) {
            Ok(graph) => graph,
            Err(error) => return Ok(self.fail_fast(&mut state, error.to_string())),
        };

        if let Some(cycle_path) = cycle::find_cycle(&graph) {
            return Ok(self.fail_fast(
                &mut state,
                format!("circular dependency detected: {}", cycle_path.join(" -> ")),
            ));
        }

        let deploy_order = match order::deploy_order(&graph) {
            Ok(deploy_order) => deploy_order,
            Err(error) => return Ok(self.fail_fast(&mut state, error.to_string())),
        };

        if let ValidationScope::OneStack(target) = &scope {
            if !graph.contains(target) {
                return Ok(self.fail_fast(&mut state, format!("unknown stack: {target}")));
            }
        }

        let states = self.fan_out(&graph, &scope).await?;
        let per_stack = self.walk(&graph, &deploy_order, &scope, &states);

        let overall_status = if per_stack.iter().any(StackValidation::is_invalid) {
            ReportStatus::Invalid
        } else {
            ReportStatus::Valid
        };

        state = RunState::Completed;
        debug!(?state, ?overall_status, stacks = per_stack.len(), "validation run finished");

        Ok(Report {
            overall_status,
            deploy_order,
            fatal_error: None,
            per_stack,
        })
    }

    fn fail_fast(&self, state: &mut RunState, message: String) -> Report {
        *state = RunState::FailedFast;
        info!(?state, error = %message, "validation aborted before remote inspection");
        Report::fatal(message)
    }

    /// Inspects every relevant stack through a bounded worker pool and
    /// joins before returning; partial failures become `Unknown` states
    async fn fan_out(
        &self,
        graph: &DependencyGraph,
        scope: &ValidationScope,
    ) -> Result<HashMap<String, RemoteState>, RunAborted> {
        let targets: Vec<String> = match scope {
            ValidationScope::AllStacks => {
                graph.stack_names().iter().map(|s| s.to_string()).collect()
            }
            ValidationScope::OneStack(target) => {
                // Only the target's own state and its direct dependencies
                // matter; skip the rest to preserve backend quota.
                let mut targets = vec![target.clone()];
                targets.extend(graph.neighbors(target).iter().map(|s| s.to_string()));
                targets
            }
        };

        info!(stacks = targets.len(), "inspecting remote stack state");

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let inspector = RetryingInspector::new(
            Arc::clone(&self.inspector),
            self.options.retry,
            self.options.call_timeout,
        );

        let mut pool: JoinSet<(String, RemoteState)> = JoinSet::new();
        for stack in targets {
            let semaphore = Arc::clone(&semaphore);
            let inspector = inspector.clone();
            let cancel = self.cancel.clone();

            pool.spawn(async move {
                if cancel.is_cancelled() {
                    return (stack, RemoteState::Unknown);
                }

                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("inspection semaphore is never closed");

                // Cancellation stops new calls; calls already past this
                // point run to completion or time out.
                if cancel.is_cancelled() {
                    return (stack, RemoteState::Unknown);
                }

                let state = match inspector.inspect(&stack).await {
                    Ok(state) => state,
                    Err(error) => {
                        warn!(stack = %stack, error = %error, "remote state unavailable");
                        RemoteState::Unknown
                    }
                };
                (stack, state)
            });
        }

        let mut states = HashMap::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((stack, state)) => {
                    states.insert(stack, state);
                }
                Err(error) => {
                    warn!(%error, "inspection worker failed");
                }
            }
        }

        if self.cancel.is_cancelled() {
            info!("validation run cancelled; discarding partial results");
            return Err(RunAborted::Cancelled);
        }

        Ok(states)
    }

    /// The single-threaded validation walk, strictly in deploy order
    fn walk(
        &self,
        graph: &DependencyGraph,
        deploy_order: &[String],
        scope: &ValidationScope,
        states: &HashMap<String, RemoteState>,
    ) -> Vec<StackValidation> {
        let mut results = Vec::with_capacity(deploy_order.len());

        for stack in deploy_order {
            let in_scope = match scope {
                ValidationScope::AllStacks => true,
                ValidationScope::OneStack(target) => target == stack,
            };
            if !in_scope {
                results.push(StackValidation::skipped(stack.clone()));
                continue;
            }

            let node = graph
                .node(stack)
                .expect("ordered stacks exist in the graph");

            let mut errors = Vec::new();
            let mut warnings = Vec::new();

            for output in &node.outputs {
                if let Some(export_name) = &output.export_name {
                    if !export_name.contains("{ProjectName}")
                        || !export_name.contains("{Environment}")
                    {
                        warnings.push(Diagnostic::new(
                            DiagnosticKind::ExportNaming,
                            format!(
                                "export name for '{}' does not follow the \
                                 '{{ProjectName}}-{{Environment}}-...' convention: {export_name}",
                                output.name
                            ),
                        ));
                    }
                }
            }

            let requirements = graph.requirements(stack);
            for requirement in &requirements {
                self.check_requirement(requirement, states, &mut errors, &mut warnings);
            }

            let exists = states.get(stack.as_str()).is_some_and(RemoteState::exists);
            let is_operation_target = matches!(scope, ValidationScope::OneStack(t) if t == stack);

            let status = if !errors.is_empty() {
                ValidationStatus::Invalid
            } else if requirements.is_empty() && !exists && !is_operation_target {
                // Not deployed and depending on nothing: there is nothing
                // to validate for or against.
                ValidationStatus::Skipped
            } else {
                ValidationStatus::Valid
            };

            debug!(stack = %stack, ?status, errors = errors.len(), warnings = warnings.len(), "checked stack");

            results.push(StackValidation {
                stack: stack.clone(),
                status,
                errors,
                warnings,
            });
        }

        results
    }

    fn check_requirement(
        &self,
        requirement: &Requirement<'_>,
        states: &HashMap<String, RemoteState>,
        errors: &mut Vec<Diagnostic>,
        warnings: &mut Vec<Diagnostic>,
    ) {
        let dep = requirement.target.name.as_str();

        match states.get(dep).unwrap_or(&RemoteState::Unknown) {
            RemoteState::Absent => {
                errors.push(Diagnostic::new(
                    DiagnosticKind::MissingStack,
                    format!("dependency stack '{dep}' does not exist"),
                ));
            }
            RemoteState::Unknown => {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::RemoteUnavailable,
                    format!("state of dependency stack '{dep}' could not be determined"),
                ));
            }
            RemoteState::Present { status, exports } => match status {
                StackStatus::TerminalFailure(raw) => {
                    // Exports of a failed or rolled-back stack are not
                    // worth checking; the status itself is the finding.
                    errors.push(Diagnostic::new(
                        DiagnosticKind::StaleState,
                        format!("dependency stack '{dep}' is in failed state {raw}"),
                    ));
                }
                StackStatus::NonTerminal(raw) => {
                    warnings.push(Diagnostic::new(
                        DiagnosticKind::StaleState,
                        format!(
                            "dependency stack '{dep}' is still changing ({raw}); \
                             exports may not be final"
                        ),
                    ));
                    self.check_exports(requirement, exports, errors, warnings);
                }
                StackStatus::TerminalSuccess(_) => {
                    self.check_exports(requirement, exports, errors, warnings);
                }
            },
        }
    }

    fn check_exports(
        &self,
        requirement: &Requirement<'_>,
        exports: &BTreeMap<String, String>,
        errors: &mut Vec<Diagnostic>,
        warnings: &mut Vec<Diagnostic>,
    ) {
        let dep = requirement.target.name.as_str();

        for name in &requirement.edge.required_outputs {
            if exports.contains_key(name) {
                continue;
            }

            let conditional = requirement
                .target
                .output(name)
                .is_some_and(|output| output.is_conditional());
            let downgrade = conditional
                && self.options.conditional_outputs == ConditionalOutputPolicy::AlwaysOptional;

            if downgrade {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::MissingExport,
                    format!("conditional output '{name}' is not published by '{dep}'"),
                ));
            } else {
                errors.push(Diagnostic::new(
                    DiagnosticKind::MissingExport,
                    format!("required output '{name}' is not published by '{dep}'"),
                ));
            }
        }

        for name in &requirement.edge.optional_outputs {
            if !exports.contains_key(name) {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::MissingExport,
                    format!("optional output '{name}' is not published by '{dep}'"),
                ));
            }
        }
    }
}
