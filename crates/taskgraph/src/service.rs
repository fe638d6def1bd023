//! Dependency service: the single entry point for mutating and querying the
//! task graph.
//!
//! The service owns the in-memory [`DependencyGraph`] behind a
//! `tokio::sync::RwLock` and a boxed [`TaskStore`]. Every mutation holds the
//! write guard from validation to the final graph update, so a cycle check
//! and the insertion it approves can never interleave with another writer.
//! Queries take the read guard and never observe a half-applied change.
//!
//! # Mutation protocol
//!
//! 1. Validate against the current graph and a fresh task snapshot.
//! 2. Apply the change to a scratch copy of the graph and compute the status
//!    changes it causes.
//! 3. Commit the record change and the status writes in one atomic
//!    [`ChangeSet`].
//! 4. Apply the change to the live graph.
//!
//! A failure at any step returns before step 4, so the store and the graph
//! are both left as they were.

use crate::domain::{Edge, EdgeId, NewEdge, NewTask, Task, TaskId, TaskStatus, TaskUpdate};
use crate::error::{Error, Result, StoreError};
use crate::graph::DependencyGraph;
use crate::query::{self, CompletionEstimate, GraphView, StatusCounts};
use crate::resolver::{self, StatusChange, StatusPolicy};
use crate::store::{ChangeSet, Committed, TaskStore};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Id given to a not-yet-stored edge in a scratch graph. Stores start at 1.
const UNSTORED_EDGE: EdgeId = EdgeId(0);

/// Orchestrates the graph, the status resolver and the task store.
pub struct DependencyService {
    store: Box<dyn TaskStore>,
    graph: RwLock<DependencyGraph>,
    policy: StatusPolicy,
}

impl std::fmt::Debug for DependencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DependencyService {
    /// Build a service over `store`, constructing the graph from its edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Box<dyn TaskStore>, policy: StatusPolicy) -> Result<Self> {
        let graph = build_graph(store.as_ref()).await?;
        tracing::debug!(
            tasks = graph.task_count(),
            edges = graph.edge_count(),
            %policy,
            "Dependency service ready"
        );
        Ok(Self {
            store,
            graph: RwLock::new(graph),
            policy,
        })
    }

    /// The status policy in force.
    #[must_use]
    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Discard the in-memory graph and rebuild it from stored edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn reload(&self) -> Result<()> {
        let mut graph = self.graph.write().await;
        *graph = build_graph(self.store.as_ref()).await?;
        tracing::info!(
            tasks = graph.task_count(),
            edges = graph.edge_count(),
            "Rebuilt dependency graph"
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------------

    /// Create a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if a field is out of bounds.
    pub async fn create_task(&self, new: NewTask) -> Result<Task> {
        new.validate()?;

        let mut graph = self.graph.write().await;
        let task = self.store.create(new).await?;
        graph.add_task(task.id);

        tracing::info!(task = %task.id, title = %task.title, "Created task");
        Ok(task)
    }

    /// Fetch a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if there is no such task.
    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        Ok(self.store.get(id).await?)
    }

    /// All tasks, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.store.list().await?)
    }

    /// Apply a field update written against `expected_version`.
    ///
    /// A status change counts as a manual edit: it takes effect as given
    /// (under [`StatusPolicy::Pinned`] it also pins the task) and is then
    /// propagated to every transitive dependent.
    ///
    /// # Errors
    ///
    /// - [`Error::TaskNotFound`] if the task does not exist
    /// - [`Error::Conflict`] if the task changed since `expected_version`
    /// - [`Error::InvalidField`] if the update puts a field out of bounds
    pub async fn update_task(
        &self,
        id: TaskId,
        update: TaskUpdate,
        expected_version: u64,
    ) -> Result<Task> {
        let graph = self.graph.write().await;
        let mut staged = Staged::load(self.store.as_ref()).await?;

        let current = staged.get(id)?.clone();
        if current.version != expected_version {
            return Err(Error::Conflict {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }
        if update.is_empty() {
            return Ok(current);
        }

        let pin = self.policy == StatusPolicy::Pinned && update.status.is_some();
        let status_changed = update.status.is_some_and(|s| s != current.status);
        staged.edit(id, |task| {
            apply_update(task, update);
            if pin {
                task.pinned = true;
            }
        })?;
        staged.get(id)?.validate()?;

        if status_changed {
            staged.propagate(&graph, self.policy, &[id], Some(id));
        }

        let mut committed = self.commit(staged.into_changes()).await?;
        let task = take_task(&mut committed, id)?;
        tracing::info!(task = %id, version = task.version, "Updated task");
        Ok(task)
    }

    /// Set a task's status by hand.
    ///
    /// Never refused on dependency grounds; see [`Self::update_task`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_task`].
    pub async fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        expected_version: u64,
    ) -> Result<Task> {
        let update = TaskUpdate {
            status: Some(status),
            ..TaskUpdate::default()
        };
        self.update_task(id, update, expected_version).await
    }

    /// Mark a task completed and propagate.
    ///
    /// # Errors
    ///
    /// - [`Error::TaskNotFound`] if the task does not exist
    /// - [`Error::IncompleteDependencies`] if a direct dependency is not
    ///   completed yet
    pub async fn mark_completed(&self, id: TaskId) -> Result<Task> {
        let graph = self.graph.write().await;
        let mut staged = Staged::load(self.store.as_ref()).await?;

        let current = staged.get(id)?.clone();
        if current.status == TaskStatus::Completed {
            return Ok(current);
        }

        let incomplete: Vec<TaskId> = graph
            .dependencies(id)
            .into_iter()
            .filter(|dep| {
                staged
                    .tasks
                    .get(dep)
                    .is_none_or(|t| t.status != TaskStatus::Completed)
            })
            .collect();
        if !incomplete.is_empty() {
            tracing::warn!(task = %id, blocking = incomplete.len(), "Refused to complete task");
            return Err(Error::IncompleteDependencies {
                task_id: id,
                incomplete,
            });
        }

        let pin = self.policy == StatusPolicy::Pinned;
        staged.edit(id, |task| {
            task.status = TaskStatus::Completed;
            if pin {
                task.pinned = true;
            }
        })?;
        staged.propagate(&graph, self.policy, &[id], Some(id));

        let mut committed = self.commit(staged.into_changes()).await?;
        let task = take_task(&mut committed, id)?;
        tracing::info!(task = %id, "Marked task completed");
        Ok(task)
    }

    /// Delete a task, cascading its edges.
    ///
    /// Former dependents are re-resolved as if each lost edge had been
    /// removed, then the change propagates downstream. Returns the removed
    /// edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task does not exist.
    pub async fn delete_task(&self, id: TaskId) -> Result<Vec<Edge>> {
        let mut graph = self.graph.write().await;
        let mut staged = Staged::load(self.store.as_ref()).await?;
        staged.get(id)?;

        let dependents: Vec<TaskId> = graph.dependents(id).into_iter().collect();
        let mut scratch = graph.clone();
        scratch.remove_task(id);

        staged.tasks.remove(&id);
        for dependent in &dependents {
            staged.release(&scratch, *dependent);
        }
        staged.propagate(&scratch, self.policy, &dependents, None);

        let mut changes = staged.into_changes();
        changes.delete_tasks.push(id);
        let committed = self.commit(changes).await?;

        graph.remove_task(id);
        tracing::info!(
            task = %id,
            edges = committed.deleted_edges.len(),
            "Deleted task"
        );
        Ok(committed.deleted_edges)
    }

    // ---------------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------------

    /// Make `task_id` depend on `depends_on_id`.
    ///
    /// On success the dependent is re-resolved and the change propagates to
    /// all of its transitive dependents.
    ///
    /// # Errors
    ///
    /// - [`Error::SelfDependency`] if both ids are equal
    /// - [`Error::TaskNotFound`] if either task does not exist
    /// - [`Error::DuplicateDependency`] if the edge already exists
    /// - [`Error::CircularDependency`] with the cycle path if the edge would
    ///   close a loop
    pub async fn add_dependency(&self, task_id: TaskId, depends_on_id: TaskId) -> Result<Edge> {
        let result = self.try_add_dependency(task_id, depends_on_id).await;
        if let Err(e) = &result {
            tracing::warn!(
                task = %task_id,
                depends_on = %depends_on_id,
                error = %e,
                "Rejected dependency"
            );
        }
        result
    }

    async fn try_add_dependency(&self, task_id: TaskId, depends_on_id: TaskId) -> Result<Edge> {
        if task_id == depends_on_id {
            return Err(Error::SelfDependency(task_id));
        }

        let mut graph = self.graph.write().await;
        let mut staged = Staged::load(self.store.as_ref()).await?;
        staged.get(task_id)?;
        staged.get(depends_on_id)?;
        graph.add_task(task_id);
        graph.add_task(depends_on_id);

        if graph.find_edge(task_id, depends_on_id).is_some() {
            return Err(Error::DuplicateDependency {
                task_id,
                depends_on_id,
            });
        }
        if let Some(path) = graph.would_create_cycle(task_id, depends_on_id) {
            return Err(Error::CircularDependency { path });
        }

        let mut scratch = graph.clone();
        scratch.insert_edge(&Edge {
            id: UNSTORED_EDGE,
            task_id,
            depends_on_id,
            created_at: Utc::now(),
        })?;

        staged.unpin(task_id)?;
        let propagated = staged.propagate(&scratch, self.policy, &[task_id], None);

        let mut changes = staged.into_changes();
        changes.create_edges.push(NewEdge {
            task_id,
            depends_on_id,
        });
        let committed = self.commit(changes).await?;
        let edge = committed
            .created_edges
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Storage(StoreError::Unavailable(
                    "store did not return the created edge".to_string(),
                ))
            })?;

        graph.insert_edge(&edge)?;
        tracing::info!(
            edge = %edge.id,
            task = %task_id,
            depends_on = %depends_on_id,
            propagated = propagated.len(),
            "Added dependency"
        );
        Ok(edge)
    }

    /// Remove a dependency edge by id, then re-resolve the former dependent
    /// and propagate downstream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyNotFound`] if there is no such edge.
    pub async fn remove_dependency(&self, edge_id: EdgeId) -> Result<Edge> {
        let mut graph = self.graph.write().await;

        let edge = self
            .store
            .list_edges()
            .await?
            .into_iter()
            .find(|e| e.id == edge_id)
            .ok_or(Error::DependencyNotFound(edge_id))?;

        let mut scratch = graph.clone();
        scratch.remove_edge(edge.task_id, edge.depends_on_id);

        let mut staged = Staged::load(self.store.as_ref()).await?;
        staged.release(&scratch, edge.task_id);
        let propagated = staged.propagate(&scratch, self.policy, &[edge.task_id], None);

        let mut changes = staged.into_changes();
        changes.delete_edges.push(edge_id);
        self.commit(changes).await?;

        graph.remove_edge(edge.task_id, edge.depends_on_id);
        tracing::info!(
            edge = %edge_id,
            task = %edge.task_id,
            depends_on = %edge.depends_on_id,
            propagated = propagated.len(),
            "Removed dependency"
        );
        Ok(edge)
    }

    /// Re-resolve every task in topological order and store the result.
    ///
    /// Returns the status changes made; a second call right after returns
    /// none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn resolve_all(&self) -> Result<Vec<StatusChange>> {
        let graph = self.graph.write().await;
        let mut staged = Staged::load(self.store.as_ref()).await?;

        let order = graph.topological_order()?;
        let changes = staged.apply_order(&graph, self.policy, &order);
        self.commit(staged.into_changes()).await?;

        tracing::info!(changed = changes.len(), "Re-resolved all task statuses");
        Ok(changes)
    }

    /// Edges where `id` is the dependent: what blocks this task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task does not exist.
    pub async fn dependencies_of(&self, id: TaskId) -> Result<Vec<Edge>> {
        self.edges_where(id, |edge| edge.task_id == id).await
    }

    /// Edges where `id` is the prerequisite: what this task blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task does not exist.
    pub async fn dependents_of(&self, id: TaskId) -> Result<Vec<Edge>> {
        self.edges_where(id, |edge| edge.depends_on_id == id).await
    }

    async fn edges_where(&self, id: TaskId, keep: impl Fn(&Edge) -> bool) -> Result<Vec<Edge>> {
        let _graph = self.graph.read().await;
        self.store.get(id).await?;
        Ok(self
            .store
            .list_edges()
            .await?
            .into_iter()
            .filter(|e| keep(e))
            .collect())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Nodes (with layout levels) and edges for visualization.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get_graph(&self) -> Result<GraphView> {
        let graph = self.graph.read().await;
        let tasks = self.snapshot().await?;
        query::graph_view(&graph, &tasks)
    }

    /// All transitive prerequisites of `id`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task is not in the graph.
    pub async fn ancestors(&self, id: TaskId) -> Result<Vec<Task>> {
        let graph = self.graph.read().await;
        if !graph.contains_task(id) {
            return Err(Error::TaskNotFound(id));
        }
        let ids = graph.ancestors(id);
        self.tasks_in(&ids).await
    }

    /// All transitive dependents of `id`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task is not in the graph.
    pub async fn descendants(&self, id: TaskId) -> Result<Vec<Task>> {
        let graph = self.graph.read().await;
        if !graph.contains_task(id) {
            return Err(Error::TaskNotFound(id));
        }
        let ids = graph.descendants(id);
        self.tasks_in(&ids).await
    }

    /// Critical-path completion estimate for a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if the task does not exist.
    pub async fn estimate(&self, id: TaskId) -> Result<CompletionEstimate> {
        let graph = self.graph.read().await;
        let tasks = self.snapshot().await?;
        query::estimate(&graph, &tasks, id)
    }

    /// Task counts per status.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn stats(&self) -> Result<StatusCounts> {
        let tasks = self.store.list().await?;
        Ok(StatusCounts::from_tasks(&tasks))
    }

    async fn snapshot(&self) -> Result<HashMap<TaskId, Task>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect())
    }

    async fn tasks_in(&self, ids: &BTreeSet<TaskId>) -> Result<Vec<Task>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|t| ids.contains(&t.id))
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<Committed> {
        if changes.is_empty() {
            return Ok(Committed::default());
        }
        self.store.commit(changes).await.map_err(|e| {
            tracing::error!(error = %e, "Store rejected change set; nothing was applied");
            Error::from(e)
        })
    }
}

async fn build_graph(store: &dyn TaskStore) -> Result<DependencyGraph> {
    let tasks = store.list().await?;
    let edges = store.list_edges().await?;
    Ok(DependencyGraph::from_records(
        tasks.iter().map(|t| t.id),
        &edges,
    ))
}

fn apply_update(task: &mut Task, update: TaskUpdate) {
    if let Some(title) = update.title {
        task.title = title;
    }
    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(status) = update.status {
        task.status = status;
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if let Some(hours) = update.estimated_hours {
        task.estimated_hours = hours;
    }
}

fn take_task(committed: &mut Committed, id: TaskId) -> Result<Task> {
    let pos = committed
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or(Error::TaskNotFound(id))?;
    Ok(committed.tasks.swap_remove(pos))
}

/// Working copies of the tasks a mutation is about to write.
///
/// Versions are left as read, so each staged task is written back against
/// the version it was loaded with.
struct Staged {
    tasks: HashMap<TaskId, Task>,
    dirty: BTreeSet<TaskId>,
}

impl Staged {
    async fn load(store: &dyn TaskStore) -> Result<Self> {
        let tasks = store.list().await?.into_iter().map(|t| (t.id, t)).collect();
        Ok(Self {
            tasks,
            dirty: BTreeSet::new(),
        })
    }

    fn get(&self, id: TaskId) -> Result<&Task> {
        self.tasks.get(&id).ok_or(Error::TaskNotFound(id))
    }

    fn edit(&mut self, id: TaskId, f: impl FnOnce(&mut Task)) -> Result<()> {
        let task = self.tasks.get_mut(&id).ok_or(Error::TaskNotFound(id))?;
        f(task);
        self.dirty.insert(id);
        Ok(())
    }

    /// Clear a pin because the task's own dependency set is changing.
    fn unpin(&mut self, id: TaskId) -> Result<()> {
        if self.get(id)?.pinned {
            self.edit(id, |task| task.pinned = false)?;
        }
        Ok(())
    }

    /// Re-resolve a task that has just lost a dependency in `graph`.
    fn release(&mut self, graph: &DependencyGraph, id: TaskId) {
        let remaining: Vec<TaskStatus> = graph
            .dependencies(id)
            .iter()
            .filter_map(|dep| self.tasks.get(dep).map(|t| t.status))
            .collect();
        let Some(task) = self.tasks.get(&id) else {
            return;
        };

        let status = resolver::resolve_released(task.status, &remaining);
        if status != task.status || task.pinned {
            self.dirty.insert(id);
            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = status;
                task.pinned = false;
            }
        }
    }

    /// Propagate from `roots` through `graph`, skipping `skip` itself.
    fn propagate(
        &mut self,
        graph: &DependencyGraph,
        policy: StatusPolicy,
        roots: &[TaskId],
        skip: Option<TaskId>,
    ) -> Vec<StatusChange> {
        let order: Vec<TaskId> = graph
            .propagation_order(roots)
            .into_iter()
            .filter(|id| Some(*id) != skip)
            .collect();
        self.apply_order(graph, policy, &order)
    }

    fn apply_order(
        &mut self,
        graph: &DependencyGraph,
        policy: StatusPolicy,
        order: &[TaskId],
    ) -> Vec<StatusChange> {
        let changes = resolver::propagate(graph, policy, order, &self.tasks);
        for change in &changes {
            if let Some(task) = self.tasks.get_mut(&change.task_id) {
                task.status = change.to;
                self.dirty.insert(change.task_id);
            }
        }
        changes
    }

    fn into_changes(mut self) -> ChangeSet {
        let put_tasks = self
            .dirty
            .iter()
            .filter_map(|id| self.tasks.remove(id))
            .map(|task| {
                let version = task.version;
                (task, version)
            })
            .collect();
        ChangeSet {
            put_tasks,
            ..ChangeSet::default()
        }
    }
}
