//! Desired-state resources and their reconciliation against the cluster.
//!
//! A [`Resource`] is a transient description of one remote object, built
//! from a parsed manifest. It can answer "does this already exist remotely"
//! through the listing cache, and converge via create/delete/recreate.

use crate::cache::ResourceCache;
use anyhow::{Context as _, Result, bail};
use kubekit::Kubectl;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// One desired remote object: kind, name, owning file and full payload.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Object kind as declared in the manifest
    pub kind: String,
    /// Object name from `metadata.name`
    pub name: String,
    /// Pluralized kind; the listing and cache key
    pub kinds: String,
    /// Manifest file this resource came from
    pub file: PathBuf,
    /// Full structured payload
    pub data: Value,
}

impl Resource {
    /// Build a resource from a parsed manifest payload.
    ///
    /// The payload must carry a non-empty `kind` and `metadata.name`.
    pub fn from_value(data: Value, file: &Path) -> Result<Self> {
        let kind = data.get("kind").and_then(Value::as_str).unwrap_or_default();
        if kind.is_empty() {
            bail!("resource in {} has no kind", file.display());
        }
        let name = data
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name.is_empty() {
            bail!("resource in {} has no metadata.name", file.display());
        }
        Ok(Self {
            kinds: format!("{kind}s"),
            kind: kind.to_string(),
            name: name.to_string(),
            file: file.to_path_buf(),
            data,
        })
    }

    /// Parse a manifest file into a resource.
    pub fn from_file(file: &Path) -> Result<Self> {
        let text = fs::read_to_string(file)
            .with_context(|| format!("reading manifest {}", file.display()))?;
        let data: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing manifest {}", file.display()))?;
        Self::from_value(data, file)
    }

    /// Whether an object with this name is present in the remote listing of
    /// this kind.
    ///
    /// A missing cache entry forces a fetch regardless of `refresh`.
    /// Callers that just mutated objects of this kind must pass
    /// `refresh = true` or they will read a stale snapshot.
    pub fn exists(
        &self,
        kubectl: &Kubectl,
        cache: &mut ResourceCache,
        refresh: bool,
    ) -> Result<bool> {
        let listing = cache.listing(kubectl, &self.kinds, refresh)?;
        let found = listing
            .get("items")
            .and_then(Value::as_sequence)
            .is_some_and(|items| {
                items
                    .iter()
                    .any(|item| item["metadata"]["name"].as_str() == Some(&self.name))
            });
        Ok(found)
    }

    /// Submit the payload as a create operation.
    ///
    /// Not idempotent: the caller must have established non-existence first.
    pub fn create(&self, kubectl: &Kubectl) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.data)?;
        kubectl.create(&yaml)?;
        Ok(())
    }

    /// Delete whatever the owning manifest file declares.
    pub fn delete(&self, kubectl: &Kubectl) -> Result<()> {
        kubectl.delete_file(&self.file)?;
        Ok(())
    }

    /// Delete then create. The object does not exist in between.
    pub fn recreate(&self, kubectl: &Kubectl) -> Result<()> {
        self.delete(kubectl)?;
        self.create(kubectl)
    }
}
