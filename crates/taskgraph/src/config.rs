//! Project configuration.
//!
//! A project keeps its state in a `.taskgraph/` directory:
//!
//! ```text
//! .taskgraph/
//!   config.yaml    # this file's format
//!   tasks.jsonl    # task and edge records
//!   .gitignore
//! ```

use crate::error::{Error, Result};
use crate::resolver::StatusPolicy;
use crate::store::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tokio::fs;

/// Name of the project directory
pub const TASKGRAPH_DIR_NAME: &str = ".taskgraph";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the data file
pub const TASKS_FILE_NAME: &str = "tasks.jsonl";

/// Name of the gitignore file within `.taskgraph`
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the project root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// How manual status edits interact with propagation
    #[serde(rename = "status-policy", default)]
    pub status_policy: StatusPolicy,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single JSONL file
    #[default]
    Jsonl,
    /// Nothing is persisted
    Memory,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to the data file, relative to the project root
    pub data_file: String,
}

impl StorageConfig {
    /// Resolve this section into a backend rooted at `root_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `data_file` is absolute or escapes the
    /// project root.
    pub fn to_backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.backend {
            BackendKind::Memory => Ok(StorageBackend::InMemory),
            BackendKind::Jsonl => {
                let relative = Path::new(&self.data_file);
                let escapes = relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if self.data_file.is_empty() || escapes {
                    return Err(Error::Config(format!(
                        "data_file must be a relative path inside the project, got '{}'",
                        self.data_file
                    )));
                }
                Ok(StorageBackend::Jsonl(root_dir.join(relative)))
            }
        }
    }
}

impl ProjectConfig {
    /// Create a configuration with the given status policy.
    pub fn new(status_policy: StatusPolicy) -> Self {
        Self {
            status_policy,
            storage: StorageConfig {
                backend: BackendKind::Jsonl,
                data_file: format!("{TASKGRAPH_DIR_NAME}/{TASKS_FILE_NAME}"),
            },
        }
    }

    /// Load configuration from a file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(StatusPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert_eq!(config.status_policy, StatusPolicy::Automatic);
        assert_eq!(config.storage.backend, BackendKind::Jsonl);
        assert_eq!(config.storage.data_file, ".taskgraph/tasks.jsonl");
    }

    #[test]
    fn test_yaml_uses_kebab_policy_key() {
        let yaml = serde_yaml::to_string(&ProjectConfig::new(StatusPolicy::Pinned)).unwrap();
        assert!(yaml.contains("status-policy: pinned"));
        assert!(yaml.contains("backend: jsonl"));
    }

    #[test]
    fn test_missing_policy_defaults_to_automatic() {
        let yaml = "storage:\n  backend: memory\n  data_file: x.jsonl\n";
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.status_policy, StatusPolicy::Automatic);
        assert_eq!(config.storage.backend, BackendKind::Memory);
    }

    #[rstest]
    #[case::absolute("/etc/tasks.jsonl")]
    #[case::parent("../tasks.jsonl")]
    #[case::nested_parent(".taskgraph/../../tasks.jsonl")]
    #[case::empty("")]
    fn test_to_backend_rejects_escaping_paths(#[case] data_file: &str) {
        let storage = StorageConfig {
            backend: BackendKind::Jsonl,
            data_file: data_file.to_string(),
        };
        assert!(matches!(
            storage.to_backend(Path::new("/project")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_to_backend_joins_root() {
        let storage = ProjectConfig::default().storage;
        let backend = storage.to_backend(Path::new("/project")).unwrap();
        assert_eq!(
            backend,
            StorageBackend::Jsonl(Path::new("/project/.taskgraph/tasks.jsonl").to_path_buf())
        );
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = ProjectConfig::new(StatusPolicy::Pinned);
        config.save(&path).await.unwrap();
        assert_eq!(ProjectConfig::load(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "status-policy: sometimes\n").await.unwrap();

        assert!(matches!(
            ProjectConfig::load(&path).await,
            Err(Error::Config(_))
        ));
    }
}
