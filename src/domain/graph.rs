//! Dependency graph for stacks
//!
//! Owns the full set of stack nodes and dependency edges. Uses petgraph for
//! graph storage, so stacks live in an arena with stable integer indices and
//! edges are index pairs.
//!
//! Construction rejects edges pointing at undeclared stacks. It does NOT
//! reject cycles: diagnosing a cycle needs the complete graph, so cycle
//! detection is a separate, explicit step (see [`super::cycle`]).

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use thiserror::Error;

use super::stack::{Edge, StackNode};

/// A dependency edge that references a stack nobody declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEdge {
    /// The stack declaring the dependency
    pub from: String,
    /// The referenced stack that does not exist in the specification
    pub to: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("unknown stacks referenced by dependency declarations: {}",
        .0.iter().map(|e| format!("{} -> {}", e.from, e.to)).collect::<Vec<_>>().join(", "))]
    UnknownStacks(Vec<DanglingEdge>),

    #[error("duplicate stack: {0}")]
    DuplicateStack(String),
}

/// Output requirements attached to a dependency edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeRequirement {
    /// Outputs that must be present on the dependency
    pub required_outputs: BTreeSet<String>,
    /// Outputs whose absence is tolerated
    pub optional_outputs: BTreeSet<String>,
}

/// One resolved dependency of a stack: the target node plus what is consumed
#[derive(Debug, Clone, Copy)]
pub struct Requirement<'a> {
    /// The stack being depended on
    pub target: &'a StackNode,
    /// The output contract on this edge
    pub edge: &'a EdgeRequirement,
}

/// The in-memory dependency graph
///
/// Read-only after construction; safe for unsynchronized concurrent reads.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph; edges run dependency -> dependent
    graph: DiGraph<StackNode, EdgeRequirement>,

    /// Map from stack name to node index
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds a graph from loader output
    ///
    /// Every edge's target must name a declared stack; all dangling edges
    /// are collected and reported together rather than one at a time.
    pub fn build(nodes: Vec<StackNode>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_map = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let name = node.name.clone();
            let idx = graph.add_node(node);
            if node_map.insert(name.clone(), idx).is_some() {
                return Err(GraphError::DuplicateStack(name));
            }
        }

        let mut dangling = Vec::new();
        for edge in &edges {
            let from = node_map.get(&edge.from);
            let to = node_map.get(&edge.to);
            match (from, to) {
                (Some(&from_idx), Some(&to_idx)) => {
                    // Edge direction: dependency -> dependent, so a
                    // dependency-first traversal follows outgoing edges.
                    graph.add_edge(
                        to_idx,
                        from_idx,
                        EdgeRequirement {
                            required_outputs: edge.required_outputs.clone(),
                            optional_outputs: edge.optional_outputs.clone(),
                        },
                    );
                }
                _ => dangling.push(DanglingEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                }),
            }
        }

        if !dangling.is_empty() {
            dangling.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
            return Err(GraphError::UnknownStacks(dangling));
        }

        Ok(Self { graph, node_map })
    }

    /// Returns the stack node with the given name
    pub fn node(&self, name: &str) -> Option<&StackNode> {
        self.node_map.get(name).map(|&idx| &self.graph[idx])
    }

    /// Returns true if the graph contains the stack
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// All stack names, lexicographically ordered
    pub fn stack_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.node_map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Stacks the given stack depends on, lexicographically ordered
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        self.directed(name, Direction::Incoming)
    }

    /// Stacks that depend on the given stack, lexicographically ordered
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.directed(name, Direction::Outgoing)
    }

    /// The dependencies of a stack together with their output contracts,
    /// ordered by target name
    pub fn requirements(&self, name: &str) -> Vec<Requirement<'_>> {
        let idx = match self.node_map.get(name) {
            Some(idx) => *idx,
            None => return Vec::new(),
        };

        let mut reqs: Vec<Requirement<'_>> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| Requirement {
                target: &self.graph[edge.source()],
                edge: edge.weight(),
            })
            .collect();
        reqs.sort_by(|a, b| a.target.name.cmp(&b.target.name));
        reqs
    }

    /// Number of stacks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph has no stacks
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    fn directed(&self, name: &str, direction: Direction) -> Vec<&str> {
        let idx = match self.node_map.get(name) {
            Some(idx) => *idx,
            None => return Vec::new(),
        };

        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
