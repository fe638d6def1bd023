//! CLI argument structs for all commands.

use clap::{Parser, Subcommand};

use super::types::{StatusPolicyArg, TaskStatusArg};
use crate::domain::{DEFAULT_ESTIMATED_HOURS, DEFAULT_PRIORITY};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// How manual status edits interact with automatic propagation
    #[arg(long, value_enum, default_value_t = StatusPolicyArg::Automatic)]
    pub policy: StatusPolicyArg,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `create` command
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Task title
    pub title: String,

    /// Detailed description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// Priority from 1 (low) to 5 (high)
    #[arg(short, long, default_value_t = DEFAULT_PRIORITY)]
    pub priority: u8,

    /// Estimated effort in hours (1-200)
    #[arg(short = 'e', long = "hours", default_value_t = DEFAULT_ESTIMATED_HOURS)]
    pub estimated_hours: u32,

    /// Initial status
    #[arg(short, long, value_enum)]
    pub status: Option<TaskStatusArg>,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Only show tasks with this status
    #[arg(short, long, value_enum)]
    pub status: Option<TaskStatusArg>,
}

/// Arguments for commands that take a single task id
#[derive(Parser, Debug, Clone)]
pub struct TaskIdArgs {
    /// Task id
    pub id: u64,
}

/// Arguments for the `update` command
#[derive(Parser, Debug, Clone)]
pub struct UpdateArgs {
    /// Task id
    pub id: u64,

    /// Version the update is based on (from `show`)
    #[arg(long = "version")]
    pub expected_version: u64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// New status (a manual edit; propagates to dependents)
    #[arg(short, long, value_enum)]
    pub status: Option<TaskStatusArg>,

    /// New priority (1-5)
    #[arg(short, long)]
    pub priority: Option<u8>,

    /// New estimate in hours (1-200)
    #[arg(short = 'e', long = "hours")]
    pub estimated_hours: Option<u32>,
}

/// Arguments for the `dep` command
#[derive(Parser, Debug, Clone)]
pub struct DepArgs {
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency management actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// Make a task depend on another
    Add {
        /// Task that waits
        task: u64,

        /// Task it waits on
        depends_on: u64,
    },

    /// Remove a dependency by edge id
    Remove {
        /// Edge id (from `dep list` or `show`)
        edge_id: u64,
    },

    /// List the dependencies and dependents of a task
    List {
        /// Task id
        id: u64,
    },
}
