//! Dependency graph with a deterministic topological sort.

use std::collections::VecDeque;

/// A directed graph over named nodes. An edge `a -> b` means `a` must
/// come before `b`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    edges: Vec<Vec<usize>>,
}

/// Result of [`DependencyGraph::sort`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedNodes {
    /// Nodes in dependency order.
    pub order: Vec<String>,
    /// Nodes that could not be ordered because they sit on, or behind,
    /// a cycle. Kept in insertion order.
    pub cyclic: Vec<String>,
}

impl SortedNodes {
    /// Returns true if every node was ordered.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.cyclic.is_empty()
    }
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node if it is not present yet and returns its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(idx) = self.nodes.iter().position(|n| n == name) {
            return idx;
        }
        self.nodes.push(name.to_string());
        self.edges.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Adds the edge `from -> to`, creating missing nodes. Self-loops are
    /// ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if from != to && !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    /// Returns true if the node exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n == name)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Kahn's algorithm. Ties are broken by insertion order so the
    /// result is stable across runs.
    #[must_use]
    pub fn sort(&self) -> SortedNodes {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for targets in &self.edges {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut done = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(idx) = queue.pop_front() {
            done[idx] = true;
            order.push(self.nodes[idx].clone());
            for &to in &self.edges[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }

        let cyclic = self
            .nodes
            .iter()
            .zip(&done)
            .filter(|(_, done)| !**done)
            .map(|(name, _)| name.clone())
            .collect();

        SortedNodes { order, cyclic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_ordered() {
        let mut graph = DependencyGraph::new();
        graph.add_node("c");
        graph.add_edge("b", "c");
        graph.add_edge("a", "b");
        let sorted = graph.sort();
        assert!(sorted.is_acyclic());
        assert_eq!(sorted.order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        let mut graph = DependencyGraph::new();
        for name in ["x", "y", "z"] {
            graph.add_node(name);
        }
        assert_eq!(graph.sort().order, vec!["x", "y", "z"]);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("b", "c");
        graph.add_node("d");
        let sorted = graph.sort();
        assert!(!sorted.is_acyclic());
        assert_eq!(sorted.order, vec!["d"]);
        assert_eq!(sorted.cyclic, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_self_loop_and_duplicate_edges_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "a");
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        let sorted = graph.sort();
        assert!(sorted.is_acyclic());
        assert_eq!(sorted.order, vec!["a", "b"]);
        assert!(graph.contains("b"));
    }
}
