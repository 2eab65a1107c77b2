//! Validation report model
//!
//! The report is the single artifact a validation run produces. It
//! serializes to the flat JSON shape consumed by wrapper tooling and
//! renders to the text layout operators read in CI logs.

use std::fmt::Write as _;

use serde::Serialize;

/// Overall outcome of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Valid,
    Invalid,
}

/// Outcome for a single stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// All checks passed (warnings allowed)
    Valid,
    /// At least one error-severity diagnostic
    Invalid,
    /// Nothing to validate (out of scope, or absent with no dependencies)
    Skipped,
}

/// Classification of a per-stack finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A dependency stack does not exist in the backend
    MissingStack,
    /// A dependency stack exists but is not in a terminal-success state
    StaleState,
    /// An output named in the dependency contract is not published
    MissingExport,
    /// The backend could not be queried for a dependency's state
    RemoteUnavailable,
    /// An export name template breaks the naming convention
    ExportNaming,
}

/// A single per-stack finding; severity is carried by which list it sits in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validation outcome for one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackValidation {
    pub stack: String,
    pub status: ValidationStatus,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl StackValidation {
    /// A stack outside the scope of the run, or with nothing to check
    pub fn skipped(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            status: ValidationStatus::Skipped,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.status == ValidationStatus::Invalid
    }
}

/// The aggregated result of a validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub overall_status: ReportStatus,

    /// Dependency-first deployment order; empty when the run failed fast
    pub deploy_order: Vec<String>,

    /// Set only when a structural error aborted the run before any
    /// per-stack validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,

    pub per_stack: Vec<StackValidation>,
}

impl Report {
    /// A run aborted by a structural error; no per-stack detail exists
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            overall_status: ReportStatus::Invalid,
            deploy_order: Vec::new(),
            fatal_error: Some(message.into()),
            per_stack: Vec::new(),
        }
    }

    /// Returns true if every validated stack passed
    pub fn is_valid(&self) -> bool {
        self.overall_status == ReportStatus::Valid
    }

    /// The result for a single stack, if it appears in the report
    pub fn stack(&self, name: &str) -> Option<&StackValidation> {
        self.per_stack.iter().find(|s| s.stack == name)
    }

    /// The exit code contract for wrapper tooling:
    /// 0 valid, 1 per-stack errors, 2 fatal structural error
    pub fn exit_code(&self) -> i32 {
        if self.fatal_error.is_some() {
            2
        } else if self.is_valid() {
            0
        } else {
            1
        }
    }

    /// Renders the human-readable report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Cross-Stack Dependency Validation Report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out);

        if let Some(fatal) = &self.fatal_error {
            let _ = writeln!(out, "Fatal: {fatal}");
            return out;
        }

        let valid = self
            .per_stack
            .iter()
            .filter(|s| s.status == ValidationStatus::Valid)
            .count();
        let invalid = self.per_stack.iter().filter(|s| s.is_invalid()).count();
        let skipped = self
            .per_stack
            .iter()
            .filter(|s| s.status == ValidationStatus::Skipped)
            .count();

        let _ = writeln!(out, "Total Stacks: {}", self.per_stack.len());
        let _ = writeln!(out, "Valid Stacks: {valid}");
        let _ = writeln!(out, "Invalid Stacks: {invalid}");
        let _ = writeln!(out, "Skipped Stacks: {skipped}");
        let _ = writeln!(out, "Deploy Order: {}", self.deploy_order.join(" -> "));
        let _ = writeln!(out);

        for stack in &self.per_stack {
            let _ = writeln!(out, "Stack: {}", stack.stack);
            let marker = match stack.status {
                ValidationStatus::Valid => "✓ VALID",
                ValidationStatus::Invalid => "✗ INVALID",
                ValidationStatus::Skipped => "- SKIPPED",
            };
            let _ = writeln!(out, "Status: {marker}");

            if !stack.errors.is_empty() {
                let _ = writeln!(out, "  Errors:");
                for error in &stack.errors {
                    let _ = writeln!(out, "    - {}", error.message);
                }
            }

            if !stack.warnings.is_empty() {
                let _ = writeln!(out, "  Warnings:");
                for warning in &stack.warnings {
                    let _ = writeln!(out, "    - {}", warning.message);
                }
            }

            let _ = writeln!(out);
        }

        out
    }
}
