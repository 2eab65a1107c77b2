//! Stack domain model
//!
//! Stacks are the independently deployable units of infrastructure. Each
//! stack declares the outputs it may publish and the outputs it consumes
//! from other stacks.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single output a stack declares it may publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDecl {
    /// Output name, as published by the deployment backend
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Template expression producing the value (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Export name template, e.g. `{ProjectName}-{Environment}-VPC-ID`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,

    /// Deployment condition gating this output, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl OutputDecl {
    /// Creates a plain, unconditional output declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            value: None,
            export_name: None,
            condition: None,
        }
    }

    /// Returns true if this output is gated by a deployment condition
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// An independently deployable infrastructure unit
///
/// Immutable once constructed; owned by the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackNode {
    /// Unique stack name
    pub name: String,

    /// Free-form grouping tag ("foundation", "networking", ...), informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,

    /// Outputs this stack declares it may publish
    #[serde(default)]
    pub outputs: Vec<OutputDecl>,
}

impl StackNode {
    /// Creates a stack node with no declared outputs
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer: None,
            outputs: Vec::new(),
        }
    }

    /// Returns the declared output with the given name, if any
    pub fn output(&self, name: &str) -> Option<&OutputDecl> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Returns true if the stack declares an output with the given name
    pub fn declares_output(&self, name: &str) -> bool {
        self.output(name).is_some()
    }
}

/// A declared dependency: `from` consumes outputs published by `to`
///
/// `to` must be deployed before `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The consuming stack
    pub from: String,

    /// The stack whose outputs are consumed
    pub to: String,

    /// Outputs that must be present for `from` to be valid
    pub required_outputs: BTreeSet<String>,

    /// Outputs whose absence is tolerated
    pub optional_outputs: BTreeSet<String>,
}

impl Edge {
    /// Creates an edge with no output requirements (pure ordering constraint)
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            required_outputs: BTreeSet::new(),
            optional_outputs: BTreeSet::new(),
        }
    }
}

/// Lifecycle status reported by the deployment backend for a deployed stack
///
/// The terminal families mirror the backend's status vocabulary
/// (`CREATE_COMPLETE`, `ROLLBACK_COMPLETE`, ...). Anything the parser does
/// not recognize as terminal is treated as a deployment still in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "raw")]
pub enum StackStatus {
    /// Successfully created or updated; exports are final
    TerminalSuccess(String),

    /// Failed or rolled back; exports are not trustworthy
    TerminalFailure(String),

    /// Still being created, updated, or deleted; exports may change
    NonTerminal(String),
}

const TERMINAL_SUCCESS: &[&str] = &["CREATE_COMPLETE", "UPDATE_COMPLETE", "IMPORT_COMPLETE"];

const TERMINAL_FAILURE: &[&str] = &[
    "CREATE_FAILED",
    "DELETE_FAILED",
    "DELETE_COMPLETE",
    "ROLLBACK_COMPLETE",
    "ROLLBACK_FAILED",
    "UPDATE_FAILED",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_FAILED",
    "IMPORT_ROLLBACK_COMPLETE",
    "IMPORT_ROLLBACK_FAILED",
];

impl StackStatus {
    /// Classifies a raw backend status string
    pub fn parse(raw: &str) -> Self {
        if TERMINAL_SUCCESS.contains(&raw) {
            StackStatus::TerminalSuccess(raw.to_string())
        } else if TERMINAL_FAILURE.contains(&raw) {
            StackStatus::TerminalFailure(raw.to_string())
        } else {
            StackStatus::NonTerminal(raw.to_string())
        }
    }

    /// Returns true if the stack finished deploying successfully
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, StackStatus::TerminalSuccess(_))
    }

    /// Returns true if the stack has finished changing, successfully or not
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StackStatus::NonTerminal(_))
    }

    /// The raw status string as reported by the backend
    pub fn raw(&self) -> &str {
        match self {
            StackStatus::TerminalSuccess(raw)
            | StackStatus::TerminalFailure(raw)
            | StackStatus::NonTerminal(raw) => raw,
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}
