//! Mutable dependency graph over identity keys.
//!
//! # Edge Direction
//!
//! An edge `A → B` means "A depends on B": A must be refreshed when B
//! changes. Dependents of B are therefore found by walking edges backwards.
//!
//! Nodes are never removed, only edges. Cycles are accepted; every traversal
//! keeps a visited set.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::normalize::IdentityKey;

/// Directed dependency graph keyed by [`IdentityKey`].
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<IdentityKey, ()>,
    node_map: HashMap<IdentityKey, NodeIndex>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a node exists for `key`. Idempotent.
    pub fn add_node(&mut self, key: &IdentityKey) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.node_map.insert(key.clone(), idx);
        idx
    }

    /// Add `dependent → dependency`, creating either node if absent. Idempotent.
    pub fn add_dependency(&mut self, dependent: &IdentityKey, dependency: &IdentityKey) {
        let from = self.add_node(dependent);
        let to = self.add_node(dependency);
        // Avoid duplicate edges (petgraph allows them by default).
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Delete every edge whose source is `dependent`. Nodes stay.
    pub fn remove_all_outgoing(&mut self, dependent: &IdentityKey) {
        let Some(idx) = self.node_index(dependent) else {
            return;
        };
        // `remove_edge` swaps the last edge into the freed slot, so re-query
        // instead of holding indices across removals.
        loop {
            let next = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .next()
                .map(|e| e.id());
            let Some(edge) = next else {
                break;
            };
            self.graph.remove_edge(edge);
        }
    }

    /// Nodes with a direct edge into `key`.
    #[must_use]
    pub fn direct_dependents(&self, key: &IdentityKey) -> BTreeSet<IdentityKey> {
        self.neighbors(key, Direction::Incoming)
    }

    /// Nodes `key` has a direct edge to.
    #[must_use]
    pub fn dependencies_of(&self, key: &IdentityKey) -> BTreeSet<IdentityKey> {
        self.neighbors(key, Direction::Outgoing)
    }

    /// Everything that directly or indirectly depends on `key`, excluding `key`.
    #[must_use]
    pub fn transitive_dependents(&self, key: &IdentityKey) -> BTreeSet<IdentityKey> {
        let Some(start) = self.node_index(key) else {
            return BTreeSet::new();
        };

        let mut queue: VecDeque<NodeIndex> = VecDeque::from([start]);
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut found = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Incoming) {
                if visited.insert(next) {
                    found.insert(self.graph[next].clone());
                    queue.push_back(next);
                }
            }
        }

        found
    }

    /// Check whether adding `dependent → dependency` would close a cycle.
    ///
    /// Returns the cycle as `dependent -> dependency -> ... -> dependent`.
    /// An edge that already exists creates no *new* cycle and yields `None`.
    #[must_use]
    pub fn would_create_cycle(
        &self,
        dependent: &IdentityKey,
        dependency: &IdentityKey,
    ) -> Option<Vec<IdentityKey>> {
        if dependent == dependency {
            return Some(vec![dependent.clone(), dependent.clone()]);
        }

        let from = self.node_index(dependent)?;
        let to = self.node_index(dependency)?;
        if self.graph.contains_edge(from, to) {
            return None;
        }

        // BFS from `to` along dependencies looking for `from`.
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([to]);
        let mut visited: HashSet<NodeIndex> = HashSet::from([to]);
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == from {
                return Some(self.cycle_path(from, to, &parent));
            }
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// All cycles currently present, one sorted key list per strongly
    /// connected component. Self-loops are reported as one-element cycles.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<IdentityKey>> {
        let mut cycles: Vec<Vec<IdentityKey>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut keys: Vec<IdentityKey> =
                    component.into_iter().map(|idx| self.graph[idx].clone()).collect();
                keys.sort_unstable();
                keys
            })
            .collect();

        cycles.sort_unstable();
        cycles
    }

    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.node_map.contains_key(key)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_map.clear();
    }

    fn node_index(&self, key: &IdentityKey) -> Option<NodeIndex> {
        self.node_map.get(key).copied()
    }

    fn neighbors(&self, key: &IdentityKey, direction: Direction) -> BTreeSet<IdentityKey> {
        self.node_index(key).map_or_else(BTreeSet::new, |idx| {
            self.graph
                .neighbors_directed(idx, direction)
                .map(|n| self.graph[n].clone())
                .collect()
        })
    }

    fn cycle_path(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        parent: &HashMap<NodeIndex, NodeIndex>,
    ) -> Vec<IdentityKey> {
        // Parent links run from..to backwards; rebuild to -> ... -> from.
        let mut to_to_from: Vec<NodeIndex> = vec![from];
        let mut cursor = from;
        while cursor != to {
            let Some(&next) = parent.get(&cursor) else {
                break;
            };
            cursor = next;
            to_to_from.push(cursor);
        }
        to_to_from.reverse();

        let mut cycle = Vec::with_capacity(to_to_from.len() + 1);
        cycle.push(self.graph[from].clone());
        cycle.extend(to_to_from.into_iter().map(|idx| self.graph[idx].clone()));
        cycle
    }
}
