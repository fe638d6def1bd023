//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use taskgraph::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let stats = app.service().stats().await?;
//!     println!("{} tasks", stats.total);
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_project_root;
use crate::config::{CONFIG_FILE_NAME, ProjectConfig, TASKGRAPH_DIR_NAME};
use crate::error::{Error, Result};
use crate::service::DependencyService;
use crate::store::{LoadWarning, open_store};
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
///
/// Finds the project, loads its configuration, opens the configured store
/// and wraps it in a [`DependencyService`].
#[derive(Debug)]
pub struct App {
    service: DependencyService,
    taskgraph_dir: PathBuf,
    config: ProjectConfig,
    load_warnings: Vec<LoadWarning>,
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.taskgraph/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No project is found in the directory tree
    /// - Configuration cannot be loaded
    /// - The store cannot be opened
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_project_root(working_dir).ok_or_else(|| {
            Error::Config(format!(
                "no {TASKGRAPH_DIR_NAME} directory found; run 'taskgraph init' first"
            ))
        })?;

        let taskgraph_dir = root_dir.join(TASKGRAPH_DIR_NAME);
        let config = ProjectConfig::load(&taskgraph_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let (store, load_warnings) = open_store(&backend).await?;
        let service = DependencyService::load(store, config.status_policy).await?;

        tracing::debug!(
            root = %root_dir.display(),
            data = ?backend.data_path(),
            policy = %config.status_policy,
            "Opened project"
        );

        Ok(Self {
            service,
            taskgraph_dir,
            config,
            load_warnings,
        })
    }

    /// The dependency service for this project.
    pub fn service(&self) -> &DependencyService {
        &self.service
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Path to the `.taskgraph` directory.
    pub fn taskgraph_dir(&self) -> &Path {
        &self.taskgraph_dir
    }

    /// Problems found while loading the data file.
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }
}
