//! Domain models for cross-stack dependency validation
//!
//! Contains the graph and ordering logic without any I/O concerns.

pub mod cycle;
pub mod graph;
pub mod order;
mod stack;

pub use cycle::find_cycle;
pub use graph::{DanglingEdge, DependencyGraph, EdgeRequirement, GraphError, Requirement};
pub use order::{deploy_order, teardown_order, OrderError};
pub use stack::{Edge, OutputDecl, StackNode, StackStatus};
