//! crossdep - cross-stack dependency validation
//!
//! Independently deployable infrastructure stacks publish named exports
//! that other stacks consume. This crate builds a dependency graph from
//! the declared relationships, detects structural errors (cycles, dangling
//! references), computes a deployment-safe ordering, and cross-checks the
//! declared contracts against the actual state of deployed stacks before
//! a deployment or teardown proceeds.
//!
//! Structural errors are fatal and abort a run before any backend call;
//! per-stack findings are collected exhaustively so a single run surfaces
//! every problem at once.

pub mod config;
pub mod domain;
pub mod remote;
pub mod validator;

pub use config::{ConfigError, DependencyDecl, SpecDocument};
pub use domain::{DependencyGraph, Edge, GraphError, OutputDecl, StackNode, StackStatus};
pub use remote::{
    InspectError, RemoteState, RemoteStateInspector, RetryPolicy, RetryingInspector,
    SnapshotInspector,
};
pub use validator::{
    ConditionalOutputPolicy, Report, ReportStatus, RunAborted, ValidationScope, ValidationStatus,
    Validator, ValidatorOptions,
};
