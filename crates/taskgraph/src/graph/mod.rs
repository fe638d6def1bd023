//! Dependency graph operations using petgraph.
//!
//! [`DependencyGraph`] is the in-memory adjacency view over task ids. It is
//! rebuilt from stored edges and updated after every successful mutation;
//! the task store stays the source of truth.
//!
//! # Edge Direction Convention
//!
//! Edges point from **dependent -> prerequisite**: if task A depends on task
//! B the graph holds `A -> B`, weighted with the edge's [`EdgeId`]. Outgoing
//! neighbors of a node are therefore its dependencies and incoming neighbors
//! its dependents.
//!
//! The graph is backed by a `StableDiGraph` so node and edge indices stay
//! valid across removals.

use crate::domain::{CyclePath, Edge, EdgeId, TaskId};
use crate::error::{Error, Result};
use petgraph::Direction;
use petgraph::algo;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, DfsPostOrder, Reversed};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Directed acyclic graph of task dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes hold task ids, edges hold edge ids.
    /// Edge direction: source (dependent) -> target (prerequisite).
    graph: StableDiGraph<TaskId, EdgeId>,

    /// Mapping from task id to graph node. Every node has an entry.
    node_map: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from stored task ids and edge records.
    ///
    /// Edges whose endpoints are unknown, that repeat an existing pair, or
    /// that would close a cycle are skipped with a warning; the remaining
    /// graph is always acyclic.
    pub fn from_records<'a>(
        task_ids: impl IntoIterator<Item = TaskId>,
        edges: impl IntoIterator<Item = &'a Edge>,
    ) -> Self {
        let mut graph = Self::new();
        for id in task_ids {
            graph.add_task(id);
        }
        for edge in edges {
            if let Err(e) = graph.try_insert_edge(edge) {
                tracing::warn!(edge = %edge.id, error = %e, "Skipping edge while rebuilding graph");
            }
        }
        graph
    }

    /// Adds a task node. Returns `false` if it was already present.
    pub fn add_task(&mut self, id: TaskId) -> bool {
        if self.node_map.contains_key(&id) {
            return false;
        }
        let node = self.graph.add_node(id);
        self.node_map.insert(id, node);
        true
    }

    /// Removes a task node together with every incident edge.
    ///
    /// Returns the ids of the removed edges.
    pub fn remove_task(&mut self, id: TaskId) -> Vec<EdgeId> {
        let Some(node) = self.node_map.remove(&id) else {
            return Vec::new();
        };
        let mut removed: Vec<EdgeId> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(self.graph.edges_directed(node, Direction::Incoming))
            .map(|edge| *edge.weight())
            .collect();
        removed.sort();
        self.graph.remove_node(node);
        removed
    }

    /// Returns `true` if the task is in the graph.
    #[must_use]
    pub fn contains_task(&self, id: TaskId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// Number of task nodes.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the id of the edge `task_id -> depends_on_id`, if present.
    #[must_use]
    pub fn find_edge(&self, task_id: TaskId, depends_on_id: TaskId) -> Option<EdgeId> {
        let from = self.node_map.get(&task_id)?;
        let to = self.node_map.get(&depends_on_id)?;
        self.graph
            .find_edge(*from, *to)
            .and_then(|edge| self.graph.edge_weight(edge).copied())
    }

    /// Checks whether adding `task_id -> depends_on_id` would close a cycle.
    ///
    /// Searches depth-first from `depends_on_id` along existing dependency
    /// edges for `task_id`. Returns the cycle the new edge would create,
    /// ordered from `task_id` back to itself, or `None` when the edge is
    /// safe. Never mutates the graph.
    ///
    /// The traversal uses an explicit stack (no recursion) and a visited set,
    /// so shared prerequisites reachable along several paths are expanded
    /// once and each check is O(V + E).
    #[must_use]
    pub fn would_create_cycle(&self, task_id: TaskId, depends_on_id: TaskId) -> Option<CyclePath> {
        if task_id == depends_on_id {
            return Some(CyclePath(vec![task_id, task_id]));
        }
        let start = *self.node_map.get(&depends_on_id)?;
        let target = *self.node_map.get(&task_id)?;

        let mut visited = HashSet::from([start]);
        // Each frame is a node on the current path plus its unexplored prerequisites.
        let mut stack = vec![(start, self.prerequisite_nodes(start))];

        while let Some((_, pending)) = stack.last_mut() {
            let Some(next) = pending.next() else {
                stack.pop();
                continue;
            };

            if next == target {
                let mut path = Vec::with_capacity(stack.len() + 2);
                path.push(task_id);
                path.extend(stack.iter().map(|(node, _)| self.graph[*node]));
                path.push(task_id);
                return Some(CyclePath(path));
            }

            if visited.insert(next) {
                stack.push((next, self.prerequisite_nodes(next)));
            }
        }

        None
    }

    /// Adds an edge the caller has already checked with
    /// [`would_create_cycle`](Self::would_create_cycle).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if either endpoint is missing.
    pub fn insert_edge(&mut self, edge: &Edge) -> Result<()> {
        let from = *self
            .node_map
            .get(&edge.task_id)
            .ok_or(Error::TaskNotFound(edge.task_id))?;
        let to = *self
            .node_map
            .get(&edge.depends_on_id)
            .ok_or(Error::TaskNotFound(edge.depends_on_id))?;

        debug_assert!(self.would_create_cycle(edge.task_id, edge.depends_on_id).is_none());
        self.graph.add_edge(from, to, edge.id);
        Ok(())
    }

    /// Validates and adds an edge in one step.
    ///
    /// # Errors
    ///
    /// - [`Error::SelfDependency`] if both endpoints are the same task
    /// - [`Error::TaskNotFound`] if either endpoint is missing
    /// - [`Error::DuplicateDependency`] if the pair is already connected
    /// - [`Error::CircularDependency`] if the edge would close a cycle
    ///
    /// On error the graph is unchanged.
    pub fn try_insert_edge(&mut self, edge: &Edge) -> Result<()> {
        if edge.task_id == edge.depends_on_id {
            return Err(Error::SelfDependency(edge.task_id));
        }
        for id in [edge.task_id, edge.depends_on_id] {
            if !self.contains_task(id) {
                return Err(Error::TaskNotFound(id));
            }
        }
        if self.find_edge(edge.task_id, edge.depends_on_id).is_some() {
            return Err(Error::DuplicateDependency {
                task_id: edge.task_id,
                depends_on_id: edge.depends_on_id,
            });
        }
        if let Some(path) = self.would_create_cycle(edge.task_id, edge.depends_on_id) {
            return Err(Error::CircularDependency { path });
        }
        self.insert_edge(edge)
    }

    /// Removes the edge `task_id -> depends_on_id`, returning its id.
    pub fn remove_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Option<EdgeId> {
        let from = *self.node_map.get(&task_id)?;
        let to = *self.node_map.get(&depends_on_id)?;
        let edge = self.graph.find_edge(from, to)?;
        self.graph.remove_edge(edge)
    }

    /// Direct dependents: tasks that depend on `id`.
    #[must_use]
    pub fn dependents(&self, id: TaskId) -> BTreeSet<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependencies: tasks that `id` depends on.
    #[must_use]
    pub fn dependencies(&self, id: TaskId) -> BTreeSet<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Every task that transitively depends on `id`, excluding `id` itself.
    ///
    /// The result is in topological order: a task always appears after each
    /// of its prerequisites that is also in the result, so a single pass over
    /// it re-resolves everything downstream.
    #[must_use]
    pub fn transitive_dependents(&self, id: TaskId) -> Vec<TaskId> {
        self.propagation_order(&[id])
            .into_iter()
            .filter(|other| *other != id)
            .collect()
    }

    /// The roots plus all of their transitive dependents, in topological order.
    ///
    /// Reverse DFS post-order over the reversed graph: every task is emitted
    /// after all of its prerequisites within the set. Unknown roots are
    /// ignored.
    #[must_use]
    pub fn propagation_order(&self, roots: &[TaskId]) -> Vec<TaskId> {
        let reversed = Reversed(&self.graph);
        let mut dfs = DfsPostOrder::empty(reversed);
        let mut finished = Vec::new();

        for root in roots {
            let Some(&node) = self.node_map.get(root) else {
                continue;
            };
            dfs.move_to(node);
            while let Some(node) = dfs.next(reversed) {
                finished.push(self.graph[node]);
            }
        }

        finished.reverse();
        finished
    }

    /// All transitive prerequisites of `id`.
    #[must_use]
    pub fn ancestors(&self, id: TaskId) -> BTreeSet<TaskId> {
        let Some(&start) = self.node_map.get(&id) else {
            return BTreeSet::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut result = BTreeSet::new();
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                result.insert(self.graph[node]);
            }
        }
        result
    }

    /// All transitive dependents of `id`.
    #[must_use]
    pub fn descendants(&self, id: TaskId) -> BTreeSet<TaskId> {
        let Some(&start) = self.node_map.get(&id) else {
            return BTreeSet::new();
        };
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut result = BTreeSet::new();
        while let Some(node) = bfs.next(reversed) {
            if node != start {
                result.insert(self.graph[node]);
            }
        }
        result
    }

    /// Every task, prerequisites before dependents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`] if the acyclic invariant has been
    /// broken, which insertion through this type never allows.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let mut order = algo::toposort(&self.graph, None).map_err(|cycle| {
            let id = self.graph[cycle.node_id()];
            Error::CircularDependency {
                path: CyclePath(vec![id, id]),
            }
        })?;
        // toposort emits sources first; our sources are dependents.
        order.reverse();
        Ok(order.into_iter().map(|node| self.graph[node]).collect())
    }

    /// Returns `true` when the graph has no directed cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !algo::is_cyclic_directed(&self.graph)
    }

    /// All task ids in ascending order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.node_map.keys().copied().collect();
        ids.sort();
        ids
    }

    /// All edges as `(edge id, dependent, prerequisite)`, ordered by edge id.
    #[must_use]
    pub fn edges(&self) -> Vec<(EdgeId, TaskId, TaskId)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((self.graph[edge], self.graph[from], self.graph[to]))
            })
            .collect();
        edges.sort();
        edges
    }

    /// The dependency relation as a set of `(dependent, prerequisite)` pairs.
    #[must_use]
    pub fn edge_set(&self) -> BTreeSet<(TaskId, TaskId)> {
        self.edges()
            .into_iter()
            .map(|(_, from, to)| (from, to))
            .collect()
    }

    fn neighbors(&self, id: TaskId, direction: Direction) -> BTreeSet<TaskId> {
        let Some(&node) = self.node_map.get(&id) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n])
            .collect()
    }

    fn prerequisite_nodes(&self, node: NodeIndex) -> std::vec::IntoIter<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.task_ids() == other.task_ids() && self.edges() == other.edges()
    }
}

impl Eq for DependencyGraph {}

#[cfg(test)]
mod tests;
