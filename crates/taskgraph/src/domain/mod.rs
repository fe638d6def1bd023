//! Domain types for task dependency tracking.
//!
//! Tasks carry an optimistic-concurrency `version`; edges are directed
//! "depends-on" relations from a dependent task to its prerequisite.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Allowed priority range (1 = low, 5 = high).
pub const PRIORITY_RANGE: RangeInclusive<u8> = 1..=5;

/// Priority assigned when none is given.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Allowed estimate range in whole hours.
pub const ESTIMATED_HOURS_RANGE: RangeInclusive<u32> = 1..=200;

/// Estimate assigned when none is given.
pub const DEFAULT_ESTIMATED_HOURS: u32 = 8;

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a dependency edge (distinct from either endpoint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Ordered task ids of a dependency cycle, starting and ending at the same task.
///
/// Renders as `3 -> 1 -> 2 -> 3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CyclePath(pub Vec<TaskId>);

impl CyclePath {
    /// The task ids along the cycle.
    #[must_use]
    pub fn ids(&self) -> &[TaskId] {
        &self.0
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on prerequisites or not yet started
    #[default]
    Pending,

    /// Ready to work on, or being worked on
    InProgress,

    /// Done; never changed again by propagation
    Completed,

    /// Held up by a blocked prerequisite
    Blocked,
}

impl TaskStatus {
    /// All statuses, in display order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
    ];

    /// The snake_case name used in storage and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Title (opaque to the engine)
    pub title: String,

    /// Description (opaque to the engine)
    #[serde(default)]
    pub description: String,

    /// Current status
    pub status: TaskStatus,

    /// Priority, within [`PRIORITY_RANGE`]
    pub priority: u8,

    /// Estimated effort in hours, within [`ESTIMATED_HOURS_RANGE`]
    pub estimated_hours: u32,

    /// Incremented on every stored mutation
    pub version: u64,

    /// Set when the status was chosen by hand and must survive propagation
    /// under the pinned status policy. Cleared when the task's own
    /// dependency set changes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Check every bounded field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] naming the first field out of bounds.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_priority(self.priority)?;
        validate_estimated_hours(self.estimated_hours)?;
        Ok(())
    }
}

/// Directed dependency: `task_id` depends on `depends_on_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier of the edge itself
    pub id: EdgeId,

    /// The dependent task (the one waiting)
    pub task_id: TaskId,

    /// The prerequisite task
    pub depends_on_id: TaskId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new edge; the store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEdge {
    /// The dependent task
    pub task_id: TaskId,

    /// The prerequisite task
    pub depends_on_id: TaskId,
}

/// Data for creating a new task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Task title
    pub title: String,

    /// Task description
    pub description: String,

    /// Initial status
    pub status: TaskStatus,

    /// Priority (1-5)
    pub priority: u8,

    /// Estimated hours (1-200)
    pub estimated_hours: u32,
}

impl NewTask {
    /// A pending task with default priority and estimate.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: DEFAULT_PRIORITY,
            estimated_hours: DEFAULT_ESTIMATED_HOURS,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the initial status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimate.
    #[must_use]
    pub fn with_estimated_hours(mut self, hours: u32) -> Self {
        self.estimated_hours = hours;
        self
    }

    /// Check every bounded field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] naming the first field out of bounds.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_priority(self.priority)?;
        validate_estimated_hours(self.estimated_hours)?;
        Ok(())
    }
}

/// Data for updating an existing task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title (if updating)
    pub title: Option<String>,

    /// New description (if updating)
    pub description: Option<String>,

    /// New status (if updating); treated as a manual status edit
    pub status: Option<TaskStatus>,

    /// New priority (if updating)
    pub priority: Option<u8>,

    /// New estimate (if updating)
    pub estimated_hours: Option<u32>,
}

impl TaskUpdate {
    /// Returns `true` if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.estimated_hours.is_none()
    }
}

/// Reject empty or overlong titles.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] for the `title` field.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidField {
            field: "title",
            message: "must not be empty".to_string(),
        });
    }
    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(Error::InvalidField {
            field: "title",
            message: format!("{length} characters exceeds the limit of {MAX_TITLE_LENGTH}"),
        });
    }
    Ok(())
}

/// Reject priorities outside [`PRIORITY_RANGE`].
///
/// # Errors
///
/// Returns [`Error::InvalidField`] for the `priority` field.
pub fn validate_priority(priority: u8) -> Result<()> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field: "priority",
            message: format!(
                "{priority} is outside {}..={}",
                PRIORITY_RANGE.start(),
                PRIORITY_RANGE.end()
            ),
        })
    }
}

/// Reject estimates outside [`ESTIMATED_HOURS_RANGE`].
///
/// # Errors
///
/// Returns [`Error::InvalidField`] for the `estimated_hours` field.
pub fn validate_estimated_hours(hours: u32) -> Result<()> {
    if ESTIMATED_HOURS_RANGE.contains(&hours) {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field: "estimated_hours",
            message: format!(
                "{hours} is outside {}..={}",
                ESTIMATED_HOURS_RANGE.start(),
                ESTIMATED_HOURS_RANGE.end()
            ),
        })
    }
}
