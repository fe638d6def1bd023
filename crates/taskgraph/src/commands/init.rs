//! Implementation of the `init` command.
//!
//! Creates the `.taskgraph/` directory with a configuration file, an empty
//! data file and a `.gitignore` for the store's temp files.

use crate::config::{
    CONFIG_FILE_NAME, GITIGNORE_FILE_NAME, MAX_TRAVERSAL_DEPTH, ProjectConfig, TASKGRAPH_DIR_NAME,
    TASKS_FILE_NAME,
};
use crate::error::{Error, Result};
use crate::resolver::StatusPolicy;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created project directory
    pub taskgraph_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created data file
    pub tasks_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// The status policy written to the config
    pub status_policy: StatusPolicy,
}

/// Initialize a new project in `base_dir`.
///
/// # Errors
///
/// Returns an error if:
/// - `.taskgraph/` already exists
/// - File system operations fail
pub async fn init(base_dir: &Path, status_policy: StatusPolicy) -> Result<InitResult> {
    let taskgraph_dir = base_dir.join(TASKGRAPH_DIR_NAME);

    if taskgraph_dir.exists() {
        return Err(Error::Config(format!(
            "taskgraph is already initialized in this directory. Found existing '{TASKGRAPH_DIR_NAME}'"
        )));
    }

    fs::create_dir_all(&taskgraph_dir).await?;

    let config_file = taskgraph_dir.join(CONFIG_FILE_NAME);
    ProjectConfig::new(status_policy).save(&config_file).await?;

    let tasks_file = taskgraph_dir.join(TASKS_FILE_NAME);
    fs::write(&tasks_file, "").await?;

    let gitignore_file = taskgraph_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Left behind if a write is interrupted
*.tmp
";
    fs::write(&gitignore_file, gitignore_content).await?;

    tracing::info!(path = %taskgraph_dir.display(), %status_policy, "Initialized project");

    Ok(InitResult {
        taskgraph_dir,
        config_file,
        tasks_file,
        gitignore_file,
        status_policy,
    })
}

/// Returns `true` if `base_dir` contains a `.taskgraph/` directory.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(TASKGRAPH_DIR_NAME).exists()
}

/// Find the project root by searching up the directory tree.
///
/// Returns the directory containing `.taskgraph/`, or `None` if none is
/// found before the filesystem root or the depth limit.
pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if is_initialized(&current) {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_layout() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), StatusPolicy::Automatic).await.unwrap();

        assert!(result.taskgraph_dir.is_dir());
        assert!(result.config_file.is_file());
        assert!(result.gitignore_file.is_file());
        let data = tokio::fs::read_to_string(&result.tasks_file).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_init_writes_policy() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), StatusPolicy::Pinned).await.unwrap();
        let config = ProjectConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.status_policy, StatusPolicy::Pinned);
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), StatusPolicy::Automatic).await.unwrap();

        let err = init(temp_dir.path(), StatusPolicy::Automatic)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already initialized"));
    }

    #[tokio::test]
    async fn test_find_project_root_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), StatusPolicy::Automatic).await.unwrap();

        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_project_root(&nested).as_deref(),
            Some(temp_dir.path())
        );
    }

    #[test]
    fn test_find_project_root_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_initialized(temp_dir.path()));
        // The temp dir's ancestors are not expected to be projects.
        assert!(find_project_root(temp_dir.path()).is_none_or(|root| root != temp_dir.path()));
    }
}
