//! Status derivation and propagation.
//!
//! A task's status is recomputed from the statuses of its direct
//! dependencies:
//!
//! | dependencies                  | derived status |
//! |-------------------------------|----------------|
//! | none                          | unchanged      |
//! | any `blocked`                 | `blocked`      |
//! | all `completed`               | `in_progress`  |
//! | otherwise                     | `pending`      |
//!
//! `completed` is terminal: propagation never moves a task out of it.
//!
//! Propagation walks a precomputed topological worklist once, so every task
//! is resolved after all of its prerequisites and the result is a fixed
//! point.

use crate::domain::{Task, TaskId, TaskStatus};
use crate::error::Result;
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How manual status edits interact with automatic propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// The next propagation pass that reaches a task recomputes it, even if
    /// its status was set by hand.
    #[default]
    Automatic,

    /// A hand-set status is kept until the task's own dependency set changes.
    Pinned,
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPolicy::Automatic => f.write_str("automatic"),
            StatusPolicy::Pinned => f.write_str("pinned"),
        }
    }
}

/// A status transition produced by propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    /// Task whose status changes
    pub task_id: TaskId,
    /// Status before propagation
    pub from: TaskStatus,
    /// Status after propagation
    pub to: TaskStatus,
}

/// Derive a status from dependency statuses alone.
///
/// Returns `None` when there are no dependencies.
pub fn derive_status(dependencies: impl IntoIterator<Item = TaskStatus>) -> Option<TaskStatus> {
    let mut any = false;
    let mut all_completed = true;
    for status in dependencies {
        any = true;
        match status {
            TaskStatus::Blocked => return Some(TaskStatus::Blocked),
            TaskStatus::Completed => {}
            TaskStatus::Pending | TaskStatus::InProgress => all_completed = false,
        }
    }
    match (any, all_completed) {
        (false, _) => None,
        (true, true) => Some(TaskStatus::InProgress),
        (true, false) => Some(TaskStatus::Pending),
    }
}

/// Resolve a task's status given its current status and its dependencies'.
///
/// The current status only matters for tasks without dependencies (left as
/// chosen by the user) and for completed tasks (terminal).
#[must_use]
pub fn resolve(current: TaskStatus, dependencies: &[TaskStatus]) -> TaskStatus {
    if current == TaskStatus::Completed {
        return TaskStatus::Completed;
    }
    derive_status(dependencies.iter().copied()).unwrap_or(current)
}

/// Resolve a task that has just lost one or more dependencies.
///
/// Same as [`resolve`], except that a `blocked` task left with no
/// dependencies at all drops back to `pending`: nothing is blocking it any
/// more.
#[must_use]
pub fn resolve_released(current: TaskStatus, remaining: &[TaskStatus]) -> TaskStatus {
    if remaining.is_empty() && current == TaskStatus::Blocked {
        return TaskStatus::Pending;
    }
    resolve(current, remaining)
}

/// Re-resolve the tasks of `order` in sequence.
///
/// `order` must be topological (prerequisites first), as produced by
/// [`DependencyGraph::propagation_order`]. Statuses changed earlier in the
/// pass are seen by later tasks. Ids missing from `tasks` are skipped.
#[must_use]
pub fn propagate(
    graph: &DependencyGraph,
    policy: StatusPolicy,
    order: &[TaskId],
    tasks: &HashMap<TaskId, Task>,
) -> Vec<StatusChange> {
    let mut overlay: HashMap<TaskId, TaskStatus> = HashMap::new();
    let mut changes = Vec::new();

    let status_of = |id: &TaskId, overlay: &HashMap<TaskId, TaskStatus>| {
        overlay
            .get(id)
            .copied()
            .or_else(|| tasks.get(id).map(|task| task.status))
    };

    for id in order {
        let Some(task) = tasks.get(id) else {
            continue;
        };
        if policy == StatusPolicy::Pinned && task.pinned {
            tracing::trace!(task = %id, "Skipping pinned task");
            continue;
        }

        let current = status_of(id, &overlay).unwrap_or(task.status);
        let dependency_statuses: Vec<TaskStatus> = graph
            .dependencies(*id)
            .iter()
            .filter_map(|dep| status_of(dep, &overlay))
            .collect();
        let resolved = resolve(current, &dependency_statuses);

        if resolved != current {
            tracing::debug!(task = %id, from = %current, to = %resolved, "Propagated status");
            overlay.insert(*id, resolved);
            changes.push(StatusChange {
                task_id: *id,
                from: current,
                to: resolved,
            });
        }
    }

    changes
}

/// Re-resolve every task in the graph.
///
/// Applying the returned changes leaves the tasks at a fixed point: a second
/// call returns no changes.
///
/// # Errors
///
/// Fails only if the graph's acyclic invariant has been broken.
pub fn resolve_all(
    graph: &DependencyGraph,
    policy: StatusPolicy,
    tasks: &HashMap<TaskId, Task>,
) -> Result<Vec<StatusChange>> {
    let order = graph.topological_order()?;
    Ok(propagate(graph, policy, &order, tasks))
}
