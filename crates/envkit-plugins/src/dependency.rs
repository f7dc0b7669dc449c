//! Dependency graph and deterministic build ordering for plugins.
//!
//! # Example
//!
//! ```
//! use envkit_plugins::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("core/base");
//! graph.add_node("myorg/git");
//! graph.add_edge("myorg/git", "core/base");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["core/base", "myorg/git"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Directed graph of dependencies between plugin keys.
///
/// If A depends on B, A's dependency set contains B and B's dependent set
/// contains A. Ordering emits B before A.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list: key depends on each value.
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// Reverse adjacency: each value depends on key.
    dependents: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: &str) {
        self.dependencies.entry(id.to_string()).or_default();
        self.dependents.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`, adding either node if missing.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(from);
        self.add_node(to);
        self.dependencies
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.dependents
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
    }

    pub fn node_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of a node, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.dependencies
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Group nodes into Kahn rounds.
    ///
    /// Each round holds every node whose dependencies were all emitted in
    /// earlier rounds, sorted lexicographically. Nodes inside one round are
    /// independent of each other.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] naming a concrete cycle if not
    /// every node can be emitted.
    pub fn stages(&self) -> Result<Vec<Vec<String>>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut stages = Vec::new();
        let mut emitted = 0;

        while !ready.is_empty() {
            ready.sort_unstable();
            let mut next = Vec::new();
            for id in &ready {
                for dependent in self.dependents.get(*id).into_iter().flatten() {
                    if let Some(deg) = in_degree.get_mut(dependent.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            next.push(dependent.as_str());
                        }
                    }
                }
            }
            emitted += ready.len();
            stages.push(ready.iter().map(|id| id.to_string()).collect());
            ready = next;
        }

        if emitted < self.node_count() {
            let cycle = self.find_cycle().unwrap_or_default();
            return Err(Error::DependencyCycle { cycle });
        }

        Ok(stages)
    }

    /// Build order: dependencies first, ties broken lexicographically per round.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        Ok(self.stages()?.into_iter().flatten().collect())
    }

    /// Find one cycle with a three-colour depth-first walk.
    ///
    /// The returned chain starts and ends on the same node and follows
    /// dependency edges, e.g. `["a", "b", "a"]` when `a` depends on `b` and
    /// `b` depends on `a`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();

        for start in self.dependencies.keys() {
            if !marks.contains_key(start.as_str())
                && let Some(cycle) = self.visit(start, &mut marks, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(node, Mark::InProgress);
        path.push(node);

        for dep in self.dependencies.get(node).into_iter().flatten() {
            match marks.get(dep.as_str()) {
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|n| *n == dep.as_str())?;
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(cycle) = self.visit(dep, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }
}
