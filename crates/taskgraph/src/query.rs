//! Read-only views computed from the dependency graph.
//!
//! Everything here is a pure function of a [`DependencyGraph`] and a task
//! snapshot; the service takes a read guard, builds the snapshot and calls in.

use crate::domain::{EdgeId, Task, TaskId, TaskStatus};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::HashMap;

/// A task as it appears in a [`GraphView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: u8,
    /// Longest prerequisite chain below this task; roots are level 0.
    pub level: usize,
}

/// A dependency as it appears in a [`GraphView`].
///
/// Edges point along the flow of work: from the prerequisite (`source`) to
/// the task that waits on it (`target`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: TaskId,
    pub target: TaskId,
}

/// Nodes and edges suitable for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Time to finish a task including its unfinished prerequisites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEstimate {
    pub task_id: TaskId,
    /// Hours along the critical path
    pub total_hours: u32,
    /// Longest chain of unfinished work, prerequisite first, ending at the task
    pub critical_path: Vec<TaskId>,
    /// Whether every direct prerequisite is completed
    pub can_start_immediately: bool,
}

/// Number of tasks in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl StatusCounts {
    /// Count statuses over a set of tasks.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            counts.total += 1;
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Blocked => counts.blocked += 1,
            }
        }
        counts
    }
}

/// Level of every task: 0 for tasks without prerequisites, otherwise one more
/// than the deepest prerequisite.
///
/// # Errors
///
/// Propagates [`Error::CircularDependency`] from a corrupted graph.
pub fn topological_levels(graph: &DependencyGraph) -> Result<HashMap<TaskId, usize>> {
    let mut levels = HashMap::with_capacity(graph.task_count());
    for id in graph.topological_order()? {
        let level = graph
            .dependencies(id)
            .iter()
            .filter_map(|dep| levels.get(dep))
            .max()
            .map_or(0, |deepest| deepest + 1);
        levels.insert(id, level);
    }
    Ok(levels)
}

/// Build the render view from the graph and the stored tasks.
///
/// Tasks missing from `tasks` are left out of the node list.
///
/// # Errors
///
/// Propagates [`Error::CircularDependency`] from a corrupted graph.
pub fn graph_view(graph: &DependencyGraph, tasks: &HashMap<TaskId, Task>) -> Result<GraphView> {
    let levels = topological_levels(graph)?;

    let nodes = graph
        .task_ids()
        .into_iter()
        .filter_map(|id| {
            let task = tasks.get(&id)?;
            Some(GraphNode {
                id,
                title: task.title.clone(),
                status: task.status,
                priority: task.priority,
                level: levels.get(&id).copied().unwrap_or(0),
            })
        })
        .collect();

    let edges = graph
        .edges()
        .into_iter()
        .map(|(id, task_id, depends_on_id)| GraphEdge {
            id,
            source: depends_on_id,
            target: task_id,
        })
        .collect();

    Ok(GraphView { nodes, edges })
}

/// Critical-path estimate for `id`.
///
/// Completed tasks cost nothing and drop out of the path. A completed target
/// yields zero hours and a path of just itself. When two prerequisite chains
/// tie, the one through the lower task id wins.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if `id` is not in `tasks`.
pub fn estimate(
    graph: &DependencyGraph,
    tasks: &HashMap<TaskId, Task>,
    id: TaskId,
) -> Result<CompletionEstimate> {
    let target = tasks.get(&id).ok_or(Error::TaskNotFound(id))?;

    let can_start_immediately = graph
        .dependencies(id)
        .iter()
        .all(|dep| tasks.get(dep).is_some_and(|t| t.status == TaskStatus::Completed));

    if target.status == TaskStatus::Completed {
        return Ok(CompletionEstimate {
            task_id: id,
            total_hours: 0,
            critical_path: vec![id],
            can_start_immediately: true,
        });
    }

    let mut relevant = graph.ancestors(id);
    relevant.insert(id);

    // (hours, path) per task, filled prerequisites first.
    let mut best: HashMap<TaskId, (u32, Vec<TaskId>)> = HashMap::with_capacity(relevant.len());
    for node in graph.topological_order()? {
        if !relevant.contains(&node) {
            continue;
        }
        let Some(task) = tasks.get(&node) else {
            best.insert(node, (0, Vec::new()));
            continue;
        };
        if task.status == TaskStatus::Completed {
            best.insert(node, (0, Vec::new()));
            continue;
        }

        let mut longest: Option<&(u32, Vec<TaskId>)> = None;
        for dep in graph.dependencies(node) {
            if let Some(candidate) = best.get(&dep) {
                if candidate.0 > 0 && longest.is_none_or(|l| candidate.0 > l.0) {
                    longest = Some(candidate);
                }
            }
        }

        let (hours, mut path) = longest.cloned().unwrap_or_default();
        path.push(node);
        best.insert(node, (hours.saturating_add(task.estimated_hours), path));
    }

    let (total_hours, critical_path) = best.remove(&id).unwrap_or_default();
    Ok(CompletionEstimate {
        task_id: id,
        total_hours,
        critical_path,
        can_start_immediately,
    })
}
