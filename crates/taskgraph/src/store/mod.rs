//! Storage abstraction layer for taskgraph.
//!
//! The [`TaskStore`] trait is the narrow contract the engine consumes. Two
//! implementations are provided:
//!
//! - **In-memory**: ephemeral, for tests and embedding ([`memory`])
//! - **JSONL**: persistent single-file storage rewritten atomically after
//!   every mutation ([`jsonl`])
//!
//! # Atomic batches
//!
//! Besides single-record operations the trait offers [`TaskStore::commit`],
//! which applies a [`ChangeSet`] all-or-nothing. The dependency service uses
//! it so that an edge and the status changes it causes are stored together
//! or not at all.
//!
//! # Example
//!
//! ```
//! use taskgraph::domain::NewTask;
//! use taskgraph::store::{StorageBackend, open_store};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let (store, _warnings) = open_store(&StorageBackend::InMemory).await?;
//!     let task = store.create(NewTask::new("Write the parser")).await?;
//!     assert_eq!(task.version, 1);
//!     Ok(())
//! }
//! ```

use crate::domain::{Edge, EdgeId, NewEdge, NewTask, Task, TaskId};
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod jsonl;
pub mod memory;
mod state;

pub use jsonl::{JsonlTaskStore, LoadWarning};
pub use memory::InMemoryTaskStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable keyed storage of tasks and dependency edges.
///
/// Implementations must be `Send + Sync`; all methods take `&self` and use
/// interior mutability. Every method either fully applies or leaves the store
/// unchanged.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task with the next free id, version 1.
    async fn create(&self, task: NewTask) -> StoreResult<Task>;

    /// Fetch a task.
    ///
    /// # Errors
    ///
    /// `StoreError::TaskNotFound` if there is no such task.
    async fn get(&self, id: TaskId) -> StoreResult<Task>;

    /// All tasks, ordered by id.
    async fn list(&self) -> StoreResult<Vec<Task>>;

    /// Replace a task if its stored version still equals `expected_version`.
    ///
    /// The stored copy gets version `expected_version + 1` and a fresh
    /// `updated_at`; it is returned.
    ///
    /// # Errors
    ///
    /// - `StoreError::TaskNotFound` if the task does not exist
    /// - `StoreError::Conflict` if the stored version has moved on
    async fn put(&self, task: Task, expected_version: u64) -> StoreResult<Task>;

    /// Delete a task and cascade-delete every edge touching it.
    ///
    /// Returns the removed edges.
    async fn delete(&self, id: TaskId) -> StoreResult<Vec<Edge>>;

    /// All edges, ordered by edge id.
    async fn list_edges(&self) -> StoreResult<Vec<Edge>>;

    /// Store a new edge with the next free edge id.
    ///
    /// # Errors
    ///
    /// `StoreError::TaskNotFound` if either endpoint does not exist.
    async fn put_edge(&self, edge: NewEdge) -> StoreResult<Edge>;

    /// Delete an edge, returning it.
    ///
    /// # Errors
    ///
    /// `StoreError::EdgeNotFound` if there is no such edge.
    async fn delete_edge(&self, id: EdgeId) -> StoreResult<Edge>;

    /// Apply a batch of changes atomically.
    async fn commit(&self, changes: ChangeSet) -> StoreResult<Committed>;
}

/// A batch of changes applied by [`TaskStore::commit`].
///
/// Application order: edge deletions, task deletions (cascading), edge
/// creations, task writes.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Edges to delete
    pub delete_edges: Vec<EdgeId>,
    /// Tasks to delete, with their edges
    pub delete_tasks: Vec<TaskId>,
    /// Edges to create
    pub create_edges: Vec<NewEdge>,
    /// Tasks to write, each with the version the write is based on
    pub put_tasks: Vec<(Task, u64)>,
}

impl ChangeSet {
    /// Returns `true` if the batch does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete_edges.is_empty()
            && self.delete_tasks.is_empty()
            && self.create_edges.is_empty()
            && self.put_tasks.is_empty()
    }
}

/// What a committed [`ChangeSet`] produced.
#[derive(Debug, Clone, Default)]
pub struct Committed {
    /// Edges removed, explicitly or by cascade
    pub deleted_edges: Vec<Edge>,
    /// Edges created, in request order
    pub created_edges: Vec<Edge>,
    /// Tasks as stored after the write, in request order
    pub tasks: Vec<Task>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    #[must_use]
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Open a store for the given backend.
///
/// File-backed stores report non-fatal load problems as warnings.
///
/// # Errors
///
/// Returns an error if the backing file exists but cannot be read.
pub async fn open_store(
    backend: &StorageBackend,
) -> StoreResult<(Box<dyn TaskStore>, Vec<LoadWarning>)> {
    match backend {
        StorageBackend::InMemory => Ok((Box::new(InMemoryTaskStore::new()), Vec::new())),
        StorageBackend::Jsonl(path) => {
            let (store, warnings) = JsonlTaskStore::open(path).await?;
            Ok((Box::new(store), warnings))
        }
    }
}
