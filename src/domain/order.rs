//! Deployment ordering
//!
//! Kahn's algorithm over the dependency graph: a stack becomes ready once
//! all stacks it depends on have been emitted. Ties among simultaneously
//! ready stacks break lexicographically, so the order is reproducible.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use super::graph::DependencyGraph;

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("dependency graph contains a cycle; no deploy order exists")]
    Cycle,
}

/// Computes the deploy order: every stack appears after all of its
/// dependencies
///
/// Requires an acyclic graph. Callers should run the cycle detector first;
/// it produces the diagnostic path this error cannot.
pub fn deploy_order(graph: &DependencyGraph) -> Result<Vec<String>, OrderError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(graph.len());
    for name in graph.stack_names() {
        in_degree.insert(name, graph.neighbors(name).len());
    }

    // BTreeSet keeps the ready pool lexicographically ordered.
    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&name, _)| name)
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(next);
        order.push(next.to_string());

        for dependent in graph.dependents(next) {
            let deg = in_degree
                .get_mut(dependent)
                .expect("dependent must be a known stack");
            *deg -= 1;
            if *deg == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != graph.len() {
        return Err(OrderError::Cycle);
    }

    Ok(order)
}

/// Computes the teardown order: the exact reverse of the deploy order
pub fn teardown_order(graph: &DependencyGraph) -> Result<Vec<String>, OrderError> {
    let mut order = deploy_order(graph)?;
    order.reverse();
    Ok(order)
}
