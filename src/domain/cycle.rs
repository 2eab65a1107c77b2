//! Cycle detection over the dependency graph
//!
//! Depth-first search tracking the current recursion path. Roots and
//! neighbors are visited in lexicographic order so repeated runs on the
//! same graph always report the same cycle.

use std::collections::HashSet;

use super::graph::DependencyGraph;

/// Finds a dependency cycle, if any exists
///
/// The returned path is closed: it starts and ends on the same stack, and
/// every consecutive pair is a declared "depends on" edge. For `a` depending
/// on `b` and `b` depending on `a`, the result is `["a", "b", "a"]`.
pub fn find_cycle(graph: &DependencyGraph) -> Option<Vec<String>> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();

    for root in graph.stack_names() {
        if visited.contains(root) {
            continue;
        }
        if let Some(cycle) = visit(graph, root, &mut visited, &mut on_path, &mut path) {
            return Some(cycle);
        }
    }

    None
}

fn visit<'a>(
    graph: &'a DependencyGraph,
    stack: &'a str,
    visited: &mut HashSet<&'a str>,
    on_path: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(stack);
    on_path.insert(stack);
    path.push(stack);

    // neighbors() is already lexicographically ordered.
    for dep in graph.neighbors(stack) {
        if on_path.contains(dep) {
            // The slice of the path from the revisited node to here, closed
            // by repeating that node, is the cycle.
            let start = path.iter().position(|&s| s == dep).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(dep.to_string());
            return Some(cycle);
        }
        if !visited.contains(dep) {
            if let Some(cycle) = visit(graph, dep, visited, on_path, path) {
                return Some(cycle);
            }
        }
    }

    on_path.remove(stack);
    path.pop();
    None
}
