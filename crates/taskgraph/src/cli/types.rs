//! CLI value enums and their conversions to domain types.

use clap::ValueEnum;

use crate::domain::TaskStatus;
use crate::resolver::StatusPolicy;

/// Task status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusArg {
    /// Waiting on unfinished prerequisites
    Pending,
    /// Ready or being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Done
    Completed,
    /// Blocked by a prerequisite
    Blocked,
}

impl From<TaskStatusArg> for TaskStatus {
    fn from(arg: TaskStatusArg) -> Self {
        match arg {
            TaskStatusArg::Pending => TaskStatus::Pending,
            TaskStatusArg::InProgress => TaskStatus::InProgress,
            TaskStatusArg::Completed => TaskStatus::Completed,
            TaskStatusArg::Blocked => TaskStatus::Blocked,
        }
    }
}

impl std::fmt::Display for TaskStatusArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&TaskStatus::from(*self), f)
    }
}

/// Status policy for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicyArg {
    /// Propagation always recomputes statuses
    #[default]
    Automatic,
    /// Hand-set statuses stick until the task's dependencies change
    Pinned,
}

impl From<StatusPolicyArg> for StatusPolicy {
    fn from(arg: StatusPolicyArg) -> Self {
        match arg {
            StatusPolicyArg::Automatic => StatusPolicy::Automatic,
            StatusPolicyArg::Pinned => StatusPolicy::Pinned,
        }
    }
}

impl std::fmt::Display for StatusPolicyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&StatusPolicy::from(*self), f)
    }
}
