//! Sync configuration.
//!
//! Read from an optional YAML file (`.plansync.yaml` by default). A missing
//! file yields [`SyncConfig::default`]; the CLI layers flag/env overrides on
//! top. Both values are echoed verbatim into the written state document.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".plansync.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Tracker project that owns the synced work items.
    #[serde(default)]
    pub project_name: String,

    /// Parent path under which per-epic iterations are created.
    #[serde(default)]
    pub iteration_root_path: String,
}

impl SyncConfig {
    /// Replace fields for which an override is given.
    pub fn with_overrides(
        mut self,
        project_name: Option<String>,
        iteration_root_path: Option<String>,
    ) -> Self {
        if let Some(name) = project_name {
            self.project_name = name;
        }
        if let Some(root) = iteration_root_path {
            self.iteration_root_path = root;
        }
        self
    }
}

/// Load the config at `path`, or defaults when the file does not exist.
pub fn load_at(path: &Path) -> Result<SyncConfig, CoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SyncConfig::default()),
        Err(err) => {
            return Err(CoreError::MissingInput {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| CoreError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let config = load_at(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn loads_camel_case_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "projectName: Projects\niterationRootPath: Product-CaseFusion\n",
        )
        .unwrap();
        let config = load_at(&path).unwrap();
        assert_eq!(config.project_name, "Projects");
        assert_eq!(config.iteration_root_path, "Product-CaseFusion");
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "projectName: [unterminated\n").unwrap();
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }), "got {err:?}");
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let config = SyncConfig {
            project_name: "P".into(),
            iteration_root_path: "Root".into(),
        }
        .with_overrides(Some("Other".into()), None);
        assert_eq!(config.project_name, "Other");
        assert_eq!(config.iteration_root_path, "Root");
    }
}
