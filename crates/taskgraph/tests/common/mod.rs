//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use taskgraph::domain::{Edge, EdgeId, NewEdge, NewTask, Task, TaskId, TaskStatus};
use taskgraph::error::StoreError;
use taskgraph::resolver::StatusPolicy;
use taskgraph::service::DependencyService;
use taskgraph::store::{ChangeSet, Committed, InMemoryTaskStore, StoreResult, TaskStore};

/// Run the taskgraph binary in `dir` with colors disabled.
pub fn run_taskgraph_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskgraph"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute taskgraph binary")
}

/// A service over a fresh in-memory store.
pub async fn memory_service(policy: StatusPolicy) -> DependencyService {
    DependencyService::load(Box::new(InMemoryTaskStore::new()), policy)
        .await
        .expect("Failed to load service")
}

/// Create a task with the given title and status, returning its id.
pub async fn add_task(service: &DependencyService, title: &str, status: TaskStatus) -> TaskId {
    service
        .create_task(NewTask::new(title).with_status(status))
        .await
        .expect("Failed to create task")
        .id
}

/// Current status of a task.
pub async fn status_of(service: &DependencyService, id: TaskId) -> TaskStatus {
    service.get_task(id).await.expect("Task should exist").status
}

/// A store that delegates to memory but can be told to fail batch commits.
///
/// Returns the store together with the switch that arms the failure.
pub struct FailingStore {
    inner: InMemoryTaskStore,
    fail_commits: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new(inner: InMemoryTaskStore) -> (Self, Arc<AtomicBool>) {
        let switch = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner,
            fail_commits: Arc::clone(&switch),
        };
        (store, switch)
    }
}

#[async_trait]
impl TaskStore for FailingStore {
    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        self.inner.create(task).await
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        self.inner.get(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        self.inner.list().await
    }

    async fn put(&self, task: Task, expected_version: u64) -> StoreResult<Task> {
        self.inner.put(task, expected_version).await
    }

    async fn delete(&self, id: TaskId) -> StoreResult<Vec<Edge>> {
        self.inner.delete(id).await
    }

    async fn list_edges(&self) -> StoreResult<Vec<Edge>> {
        self.inner.list_edges().await
    }

    async fn put_edge(&self, edge: NewEdge) -> StoreResult<Edge> {
        self.inner.put_edge(edge).await
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<Edge> {
        self.inner.delete_edge(id).await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<Committed> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk on fire".to_string()));
        }
        self.inner.commit(changes).await
    }
}
