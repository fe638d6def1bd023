//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a project directory
//! - `create`, `list`, `show`, `update`, `delete`: task records
//! - `dep add|remove|list`: dependency edges
//! - `complete`: mark a task completed
//! - `graph`, `ancestors`, `descendants`, `estimate`, `stats`: queries
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! taskgraph create "Design schema" --hours 6
//! taskgraph create "Build API" --priority 4
//! taskgraph dep add 2 1
//! taskgraph complete 1
//! taskgraph graph
//! ```

mod args;
mod execute;
mod types;

use crate::app::App;
use crate::output::OutputMode;
use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{CreateArgs, DepAction, DepArgs, InitArgs, ListArgs, TaskIdArgs, UpdateArgs};
pub use types::{StatusPolicyArg, TaskStatusArg};

/// Taskgraph - tasks with cycle-checked dependencies
///
/// Tracks tasks and the dependencies between them, refuses dependencies
/// that would form a cycle, and keeps each task's status in step with its
/// prerequisites. Data lives in `.taskgraph/tasks.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "taskgraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new project
    ///
    /// Creates the `.taskgraph/` directory with configuration and an empty
    /// data file.
    Init(InitArgs),

    /// Create a new task
    Create(CreateArgs),

    /// List tasks
    List(ListArgs),

    /// Show a task with its dependencies and dependents
    Show(TaskIdArgs),

    /// Update fields of a task
    ///
    /// Requires the version you last saw; the update is refused if the task
    /// has changed since.
    Update(UpdateArgs),

    /// Delete a task and every dependency touching it
    Delete(TaskIdArgs),

    /// Manage dependencies
    Dep(DepArgs),

    /// Mark a task completed
    ///
    /// Refused while any direct dependency is not completed.
    Complete(TaskIdArgs),

    /// Show the dependency graph grouped by layout level
    Graph,

    /// Show every task a task transitively depends on
    Ancestors(TaskIdArgs),

    /// Show every task that transitively depends on a task
    Descendants(TaskIdArgs),

    /// Estimate hours to finish a task along its critical path
    Estimate(TaskIdArgs),

    /// Show task counts per status
    Stats,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("taskgraph: tasks with cycle-checked dependencies");
            println!("Use --help for more information");
            return Ok(());
        };

        match command {
            Commands::Init(args) => execute::execute_init(args, output_mode).await,
            Commands::Create(args) => {
                execute::execute_create(&open_app().await?, args, output_mode).await
            }
            Commands::List(args) => {
                execute::execute_list(&open_app().await?, args, output_mode).await
            }
            Commands::Show(args) => {
                execute::execute_show(&open_app().await?, args, output_mode).await
            }
            Commands::Update(args) => {
                execute::execute_update(&open_app().await?, args, output_mode).await
            }
            Commands::Delete(args) => {
                execute::execute_delete(&open_app().await?, args, output_mode).await
            }
            Commands::Dep(args) => {
                execute::execute_dep(&open_app().await?, args, output_mode).await
            }
            Commands::Complete(args) => {
                execute::execute_complete(&open_app().await?, args, output_mode).await
            }
            Commands::Graph => execute::execute_graph(&open_app().await?, output_mode).await,
            Commands::Ancestors(args) => {
                execute::execute_ancestors(&open_app().await?, args, output_mode).await
            }
            Commands::Descendants(args) => {
                execute::execute_descendants(&open_app().await?, args, output_mode).await
            }
            Commands::Estimate(args) => {
                execute::execute_estimate(&open_app().await?, args, output_mode).await
            }
            Commands::Stats => execute::execute_stats(&open_app().await?, output_mode).await,
        }
    }
}

/// Open the project containing the current directory.
async fn open_app() -> Result<App> {
    Ok(App::from_directory(&std::env::current_dir()?).await?)
}
