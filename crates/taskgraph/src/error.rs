//! Error types for taskgraph operations.
//!
//! [`Error`] is what callers of the service see: every validation rule has
//! its own variant so a rejection names the rule that failed. Storage
//! failures are wrapped in [`Error::Storage`] and are the only transient
//! kind.

use crate::domain::{CyclePath, EdgeId, TaskId};
use std::io;
use thiserror::Error;

/// The error type for taskgraph operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A task was asked to depend on itself.
    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    /// A referenced task does not exist.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// The exact edge already exists.
    #[error("Dependency already exists: {task_id} depends on {depends_on_id}")]
    DuplicateDependency {
        /// The dependent task
        task_id: TaskId,
        /// The prerequisite task
        depends_on_id: TaskId,
    },

    /// The edge would close a cycle.
    #[error("Circular dependency detected: {path}")]
    CircularDependency {
        /// The cycle that the edge would create
        path: CyclePath,
    },

    /// The edge does not exist.
    #[error("Dependency not found: {0}")]
    DependencyNotFound(EdgeId),

    /// The write was based on a stale version.
    #[error(
        "Task {id} was modified concurrently (expected version {expected}, found {actual}); reload and retry"
    )]
    Conflict {
        /// Task being written
        id: TaskId,
        /// Version supplied by the caller
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// A bounded field was out of range or malformed.
    #[error("Invalid {field}: {message}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// A task cannot be completed while prerequisites are unfinished.
    #[error("Task {task_id} has incomplete dependencies: {}", join_ids(.incomplete))]
    IncompleteDependencies {
        /// Task being completed
        task_id: TaskId,
        /// Direct prerequisites that are not completed
        incomplete: Vec<TaskId>,
    },

    /// The task store failed; the operation may be retried.
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns `true` for failures of the store itself, which callers may retry.
    /// Every other variant is a definite rejection.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by a [`TaskStore`](crate::store::TaskStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with this id.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// No edge with this id.
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// Optimistic version check failed.
    #[error("version conflict on task {id}: expected {expected}, found {actual}")]
    Conflict {
        /// Task being written
        id: TaskId,
        /// Version supplied by the caller
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// The backing medium could not be read or written.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// JSONL persistence failed.
    #[error("persistence failed: {0}")]
    Jsonl(#[from] taskgraph_jsonl::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TaskNotFound(id) => Error::TaskNotFound(id),
            StoreError::EdgeNotFound(id) => Error::DependencyNotFound(id),
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => Error::Conflict {
                id,
                expected,
                actual,
            },
            other => Error::Storage(other),
        }
    }
}

/// A specialized Result type for taskgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_message_shows_path() {
        let err = Error::CircularDependency {
            path: CyclePath(vec![TaskId(3), TaskId(1), TaskId(2), TaskId(3)]),
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: 3 -> 1 -> 2 -> 3"
        );
    }

    #[test]
    fn store_not_found_maps_to_domain_variant() {
        let err: Error = StoreError::TaskNotFound(TaskId(9)).into();
        assert!(matches!(err, Error::TaskNotFound(TaskId(9))));
        assert!(!err.is_transient());
    }

    #[test]
    fn unavailable_store_is_transient() {
        let err: Error = StoreError::Unavailable("disk full".to_string()).into();
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Storage error: store unavailable: disk full");
    }

    #[test]
    fn incomplete_dependencies_lists_ids() {
        let err = Error::IncompleteDependencies {
            task_id: TaskId(4),
            incomplete: vec![TaskId(1), TaskId(2)],
        };
        assert_eq!(
            err.to_string(),
            "Task 4 has incomplete dependencies: 1, 2"
        );
    }
}
