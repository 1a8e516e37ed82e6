//! Merged deployment settings.
//!
//! Defaults load from a `defaults.yaml` beside the descriptor; the
//! descriptor's own top-level keys override them. The `Deploys` list is the
//! unit inventory, not a setting, and is never merged.

use anyhow::{Context as _, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// File of default settings expected beside the descriptor.
pub const DEFAULTS_FILE: &str = "defaults.yaml";

/// Key carrying the control-plane endpoint URL.
pub const SERVER_KEY: &str = "server";
/// Key carrying the version-manifest root, relative to the descriptor.
pub const CONTAINER_VERSION_PATH_KEY: &str = "container_version_path";
/// Key carrying the kubectl context specification.
pub const CONTEXT_KEY: &str = "context";

const DEPLOYS_KEY: &str = "Deploys";

/// Flat key/value settings with last-write-wins merging.
#[derive(Debug, Clone)]
pub struct Settings {
    values: Value,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            values: Value::Mapping(Mapping::new()),
        }
    }
}

impl Settings {
    /// Load defaults from `defaults.yaml` in the deploy home, if present.
    pub fn load(deploy_home: &Path) -> Result<Self> {
        let path = deploy_home.join(DEFAULTS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let doc: Value =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        let mut settings = Self::default();
        settings.update(&doc);
        Ok(settings)
    }

    /// Merge the top-level keys of a document over the current values.
    pub fn update(&mut self, doc: &Value) {
        let Some(theirs) = doc.as_mapping() else {
            return;
        };
        if let Some(ours) = self.values.as_mapping_mut() {
            for (key, value) in theirs {
                if key.as_str() == Some(DEPLOYS_KEY) {
                    continue;
                }
                ours.insert(key.clone(), value.clone());
            }
        }
    }

    /// Raw value for a settings key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Control-plane endpoint URL, when configured.
    pub fn server(&self) -> Option<&str> {
        self.get(SERVER_KEY).and_then(Value::as_str)
    }

    /// Version-manifest root relative to the descriptor, when configured.
    pub fn container_version_path(&self) -> Option<&str> {
        self.get(CONTAINER_VERSION_PATH_KEY).and_then(Value::as_str)
    }

    /// Context specification (inline mapping or context name).
    pub fn context(&self) -> Option<&Value> {
        self.get(CONTEXT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_update_overrides_defaults() {
        let mut settings = Settings::default();
        settings.update(&doc("server: https://a.example\nextra: kept\n"));
        settings.update(&doc("server: https://b.example\n"));

        assert_eq!(settings.server(), Some("https://b.example"));
        assert_eq!(settings.get("extra").and_then(Value::as_str), Some("kept"));
    }

    #[test]
    fn test_deploys_list_is_not_a_setting() {
        let mut settings = Settings::default();
        settings.update(&doc("server: https://a.example\nDeploys:\n- path: app\n"));
        assert!(settings.get("Deploys").is_none());
    }

    #[test]
    fn test_load_without_defaults_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert!(settings.server().is_none());
    }

    #[test]
    fn test_load_reads_defaults_beside_the_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULTS_FILE),
            "server: https://default.example\ncontainer_version_path: versions\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.server(), Some("https://default.example"));
        assert_eq!(settings.container_version_path(), Some("versions"));
    }
}
