//! In-memory task store.
//!
//! State lives behind an `Arc<Mutex<_>>`, so clones of the store share it.
//! Useful for tests and for embedding the engine without persistence.

use super::state::StoreState;
use super::{ChangeSet, Committed, StoreResult, TaskStore};
use crate::domain::{Edge, EdgeId, NewEdge, NewTask, Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ephemeral [`TaskStore`] implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        Ok(self.state.lock().await.create(task))
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        self.state.lock().await.get(id)
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.state.lock().await.tasks().cloned().collect())
    }

    async fn put(&self, task: Task, expected_version: u64) -> StoreResult<Task> {
        self.state.lock().await.put(task, expected_version)
    }

    async fn delete(&self, id: TaskId) -> StoreResult<Vec<Edge>> {
        self.state.lock().await.delete(id)
    }

    async fn list_edges(&self) -> StoreResult<Vec<Edge>> {
        Ok(self.state.lock().await.edges().cloned().collect())
    }

    async fn put_edge(&self, edge: NewEdge) -> StoreResult<Edge> {
        self.state.lock().await.put_edge(edge)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<Edge> {
        self.state.lock().await.delete_edge(id)
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<Committed> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let committed = next.apply(changes)?;
        *state = next;
        Ok(committed)
    }
}
