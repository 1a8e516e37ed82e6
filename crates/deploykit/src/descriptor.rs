//! Deployment descriptor loading.
//!
//! A descriptor is a YAML document: top-level default settings plus an
//! ordered `Deploys` list of unit definitions, each naming at least a
//! manifest directory relative to the descriptor.

use anyhow::{Context as _, Result, bail};
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// One deploy-unit definition from the descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitDef {
    /// Directory of resource manifests, relative to the descriptor
    pub path: PathBuf,
    /// Display name; defaults to the path when not given
    #[serde(default)]
    pub name: Option<String>,
}

impl UnitDef {
    /// Unit name for messages and ordering.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A parsed deployment descriptor.
#[derive(Debug)]
pub struct Descriptor {
    /// The raw document; top-level keys are settings
    pub doc: Value,
    /// Deploy units in declaration order
    pub units: Vec<UnitDef>,
}

impl Descriptor {
    /// Load and validate a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading descriptor {}", path.display()))?;
        let doc: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing descriptor {}", path.display()))?;
        let Some(deploys) = doc.get("Deploys") else {
            bail!("descriptor {} has no Deploys list", path.display());
        };
        let units: Vec<UnitDef> = serde_yaml::from_value(deploys.clone())
            .with_context(|| format!("parsing Deploys in {}", path.display()))?;
        if units.is_empty() {
            bail!("descriptor {} declares no deploy units", path.display());
        }
        Ok(Self { doc, units })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_descriptor(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("deploy.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_units_keep_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_descriptor(
            dir.path(),
            "server: https://cluster.example:6443\n\
             Deploys:\n\
             - path: database\n\
             - path: app\n\
               name: frontend\n",
        );

        let descriptor = Descriptor::load(&path).unwrap();
        let names: Vec<_> = descriptor.units.iter().map(UnitDef::display_name).collect();
        assert_eq!(names, vec!["database", "frontend"]);
    }

    #[test]
    fn test_missing_deploys_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_descriptor(dir.path(), "server: https://cluster.example:6443\n");
        let err = Descriptor::load(&path).unwrap_err();
        assert!(err.to_string().contains("no Deploys list"));
    }

    #[test]
    fn test_empty_deploys_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_descriptor(dir.path(), "Deploys: []\n");
        assert!(Descriptor::load(&path).is_err());
    }

    #[test]
    fn test_unit_without_a_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_descriptor(dir.path(), "Deploys:\n- name: frontend\n");
        assert!(Descriptor::load(&path).is_err());
    }

    #[test]
    fn test_settings_stay_on_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_descriptor(
            dir.path(),
            "server: https://cluster.example:6443\nDeploys:\n- path: app\n",
        );
        let descriptor = Descriptor::load(&path).unwrap();
        assert_eq!(
            descriptor.doc.get("server").and_then(Value::as_str),
            Some("https://cluster.example:6443")
        );
    }
}
