//! Record state shared by the store backends.

use super::{ChangeSet, Committed, StoreResult};
use crate::domain::{Edge, EdgeId, NewEdge, NewTask, Task, TaskId};
use crate::error::StoreError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest task and edge ids ever handed out.
///
/// Persisted alongside the records so deleted ids are never reissued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IdCounters {
    pub(crate) last_task_id: u64,
    pub(crate) last_edge_id: u64,
}

/// Tasks and edges keyed by id, plus id counters.
///
/// Every mutating method validates before it touches anything, so a failed
/// call leaves the state unchanged.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    tasks: BTreeMap<TaskId, Task>,
    edges: BTreeMap<EdgeId, Edge>,
    last_task_id: u64,
    last_edge_id: u64,
}

impl StoreState {
    /// Build state from already-validated records.
    ///
    /// Counters resume from `saved` or the highest loaded id, whichever is
    /// larger.
    pub(crate) fn from_records(tasks: Vec<Task>, edges: Vec<Edge>, saved: IdCounters) -> Self {
        let last_task_id = tasks
            .iter()
            .map(|t| t.id.0)
            .fold(saved.last_task_id, u64::max);
        let last_edge_id = edges
            .iter()
            .map(|e| e.id.0)
            .fold(saved.last_edge_id, u64::max);
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            edges: edges.into_iter().map(|e| (e.id, e)).collect(),
            last_task_id,
            last_edge_id,
        }
    }

    pub(crate) fn counters(&self) -> IdCounters {
        IdCounters {
            last_task_id: self.last_task_id,
            last_edge_id: self.last_edge_id,
        }
    }

    pub(crate) fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub(crate) fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub(crate) fn create(&mut self, new: NewTask) -> Task {
        self.last_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: TaskId(self.last_task_id),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            estimated_hours: new.estimated_hours,
            version: 1,
            pinned: false,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(task.id, task.clone());
        task
    }

    pub(crate) fn get(&self, id: TaskId) -> StoreResult<Task> {
        self.tasks
            .get(&id)
            .cloned()
            .ok_or(StoreError::TaskNotFound(id))
    }

    pub(crate) fn put(&mut self, mut task: Task, expected_version: u64) -> StoreResult<Task> {
        let stored = self
            .tasks
            .get(&task.id)
            .ok_or(StoreError::TaskNotFound(task.id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                id: task.id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        task.version = expected_version + 1;
        task.created_at = stored.created_at;
        task.updated_at = Utc::now();
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    pub(crate) fn delete(&mut self, id: TaskId) -> StoreResult<Vec<Edge>> {
        if self.tasks.remove(&id).is_none() {
            return Err(StoreError::TaskNotFound(id));
        }

        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.task_id == id || e.depends_on_id == id)
            .map(|e| e.id)
            .collect();

        Ok(touching
            .into_iter()
            .filter_map(|edge_id| self.edges.remove(&edge_id))
            .collect())
    }

    pub(crate) fn put_edge(&mut self, new: NewEdge) -> StoreResult<Edge> {
        for id in [new.task_id, new.depends_on_id] {
            if !self.tasks.contains_key(&id) {
                return Err(StoreError::TaskNotFound(id));
            }
        }

        self.last_edge_id += 1;
        let edge = Edge {
            id: EdgeId(self.last_edge_id),
            task_id: new.task_id,
            depends_on_id: new.depends_on_id,
            created_at: Utc::now(),
        };
        self.edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    pub(crate) fn delete_edge(&mut self, id: EdgeId) -> StoreResult<Edge> {
        self.edges.remove(&id).ok_or(StoreError::EdgeNotFound(id))
    }

    /// Apply a batch in place. Callers wanting atomicity apply to a clone and
    /// swap it in on success.
    pub(crate) fn apply(&mut self, changes: ChangeSet) -> StoreResult<Committed> {
        let mut committed = Committed::default();

        for edge_id in changes.delete_edges {
            committed.deleted_edges.push(self.delete_edge(edge_id)?);
        }
        for task_id in changes.delete_tasks {
            committed.deleted_edges.extend(self.delete(task_id)?);
        }
        for edge in changes.create_edges {
            committed.created_edges.push(self.put_edge(edge)?);
        }
        for (task, expected_version) in changes.put_tasks {
            committed.tasks.push(self.put(task, expected_version)?);
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    fn state_with(titles: &[&str]) -> StoreState {
        let mut state = StoreState::default();
        for title in titles {
            state.create(NewTask::new(*title));
        }
        state
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let state = state_with(&["a", "b", "c"]);
        let ids: Vec<u64> = state.tasks().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_put_bumps_version() {
        let mut state = state_with(&["a"]);
        let mut task = state.get(TaskId(1)).unwrap();
        task.status = TaskStatus::Blocked;

        let stored = state.put(task, 1).unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(state.get(TaskId(1)).unwrap().status, TaskStatus::Blocked);
    }

    #[test]
    fn test_put_with_stale_version_conflicts() {
        let mut state = state_with(&["a"]);
        let task = state.get(TaskId(1)).unwrap();
        state.put(task.clone(), 1).unwrap();

        let err = state.put(task, 1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_cascades_edges() {
        let mut state = state_with(&["a", "b", "c"]);
        state
            .put_edge(NewEdge {
                task_id: TaskId(2),
                depends_on_id: TaskId(1),
            })
            .unwrap();
        state
            .put_edge(NewEdge {
                task_id: TaskId(3),
                depends_on_id: TaskId(2),
            })
            .unwrap();

        let removed = state.delete(TaskId(2)).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(state.edges().count(), 0);
    }

    #[test]
    fn test_put_edge_requires_both_endpoints() {
        let mut state = state_with(&["a"]);
        let err = state
            .put_edge(NewEdge {
                task_id: TaskId(1),
                depends_on_id: TaskId(9),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound(TaskId(9))));
    }

    #[test]
    fn test_failed_batch_on_clone_leaves_original_untouched() {
        let state = state_with(&["a", "b"]);
        let mut scratch = state.clone();
        let task = state.get(TaskId(2)).unwrap();

        let result = scratch.apply(ChangeSet {
            create_edges: vec![NewEdge {
                task_id: TaskId(2),
                depends_on_id: TaskId(1),
            }],
            put_tasks: vec![(task, 7)],
            ..ChangeSet::default()
        });

        assert!(result.is_err());
        assert_eq!(state.edges().count(), 0);
        assert_eq!(state.get(TaskId(2)).unwrap().version, 1);
    }

    #[test]
    fn test_from_records_continues_id_sequence() {
        let mut seed = state_with(&["a", "b"]);
        seed.put_edge(NewEdge {
            task_id: TaskId(2),
            depends_on_id: TaskId(1),
        })
        .unwrap();

        let mut state = StoreState::from_records(
            seed.tasks().cloned().collect(),
            seed.edges().cloned().collect(),
            IdCounters::default(),
        );
        assert_eq!(state.create(NewTask::new("c")).id, TaskId(3));
        let edge = state
            .put_edge(NewEdge {
                task_id: TaskId(3),
                depends_on_id: TaskId(2),
            })
            .unwrap();
        assert_eq!(edge.id, EdgeId(2));
    }

    #[test]
    fn test_from_records_honours_saved_counters() {
        let seed = state_with(&["a"]);
        let saved = IdCounters {
            last_task_id: 7,
            last_edge_id: 4,
        };

        let mut state =
            StoreState::from_records(seed.tasks().cloned().collect(), Vec::new(), saved);
        assert_eq!(state.counters(), saved);
        assert_eq!(state.create(NewTask::new("b")).id, TaskId(8));
        let edge = state
            .put_edge(NewEdge {
                task_id: TaskId(8),
                depends_on_id: TaskId(1),
            })
            .unwrap();
        assert_eq!(edge.id, EdgeId(5));
    }
}
