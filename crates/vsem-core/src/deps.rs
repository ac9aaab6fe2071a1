//! Module dependency tree.
//!
//! A directed multigraph on module directories, fed by the importer and
//! consulted on deletion: a module with live dependents must not be torn
//! down. Edges may repeat when several files of one module import the same
//! dependency; queries deduplicate.

use std::collections::HashMap;

/// One module directory and its outgoing dependency edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,
    dependencies: Vec<String>,
}

impl DependencyNode {
    /// Outgoing edges, deduplicated, in first-seen order.
    pub fn get_all_dependencies(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for dep in &self.dependencies {
            if !out.iter().any(|d| d == dep) {
                out.push(dep.clone());
            }
        }
        out
    }
}

/// Directed multigraph on module directories.
#[derive(Debug, Clone, Default)]
pub struct DependencyTree {
    nodes: HashMap<String, DependencyNode>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get or create the node for a directory.
    pub fn add_node(&mut self, dir: &str) -> &mut DependencyNode {
        self.nodes
            .entry(dir.to_string())
            .or_insert_with(|| DependencyNode {
                name: dir.to_string(),
                dependencies: Vec::new(),
            })
    }

    pub fn get_node(&self, dir: &str) -> Option<&DependencyNode> {
        self.nodes.get(dir)
    }

    /// Record that `from` depends on `to`. Repeated edges are kept; this is
    /// a multigraph.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.add_node(to);
        self.add_node(from).dependencies.push(to.to_string());
    }

    /// Whether any node outside `except` depends on `dir`.
    pub fn has_dependents(&self, dir: &str, except: &[&str]) -> bool {
        self.nodes.values().any(|node| {
            node.name != dir
                && !except.contains(&node.name.as_str())
                && node.dependencies.iter().any(|dep| dep == dir)
        })
    }

    /// Remove a node. Edges pointing at it from elsewhere are left in place;
    /// `has_dependents` is what guards deletion order.
    pub fn delete(&mut self, dir: &str) {
        self.nodes.remove(dir);
    }
}
