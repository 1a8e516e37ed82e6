//! Deploy units and the context they run in.
//!
//! A unit only has to expose `deploy()`; internally it is expected to drive
//! the reconciler and, through it, kubectl. [`ManifestUnit`] is the stock
//! implementation: a directory of manifests applied in file-name order.

use crate::cache::ResourceCache;
use crate::context::ExecutionContext;
use crate::resource::Resource;
use anyhow::{Context as _, Result};
use kubekit::Kubectl;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Everything a deploy unit may touch while deploying.
pub struct DeployCtx<'a> {
    /// Shared execution context
    pub ctx: &'a ExecutionContext,
    /// Control-plane client
    pub kubectl: &'a Kubectl,
    /// Run-scoped listing cache
    pub cache: &'a mut ResourceCache,
}

/// One independently deployable component of a descriptor.
pub trait DeployUnit {
    /// Unit name, for ordering and messages.
    fn name(&self) -> &str;

    /// Deploy this unit. The first failing unit aborts the batch.
    fn deploy(&self, dctx: &mut DeployCtx<'_>) -> Result<()>;
}

/// Deploys every manifest in a directory, in file-name order.
#[derive(Debug)]
pub struct ManifestUnit {
    name: String,
    dir: PathBuf,
}

impl ManifestUnit {
    /// A unit over a directory of `*.yaml` / `*.yml` manifests.
    pub fn new(name: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            dir,
        }
    }

    fn manifests(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("reading unit directory {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("yaml" | "yml")) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DeployUnit for ManifestUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn deploy(&self, dctx: &mut DeployCtx<'_>) -> Result<()> {
        let files = self.manifests()?;
        if files.is_empty() {
            warn!(
                "unit '{}' has no manifests in {}",
                self.name,
                self.dir.display()
            );
            return Ok(());
        }
        // Kinds this unit has mutated; their next existence check must
        // bypass the cached listing
        let mut dirty: HashSet<String> = HashSet::new();
        for file in files {
            let resource = Resource::from_file(&file)?;
            let refresh = dirty.contains(&resource.kinds);
            if resource.exists(dctx.kubectl, dctx.cache, refresh)? {
                if dctx.ctx.always_deploy {
                    info!("recreating {}/{}", resource.kind, resource.name);
                    resource.recreate(dctx.kubectl)?;
                    dirty.insert(resource.kinds.clone());
                } else {
                    debug!("{}/{} already deployed", resource.kind, resource.name);
                }
            } else {
                info!("creating {}/{}", resource.kind, resource.name);
                resource.create(dctx.kubectl)?;
                dirty.insert(resource.kinds.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifests_come_back_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("20-service.yaml"), "x: 1").unwrap();
        fs::write(dir.path().join("10-controller.yml"), "x: 1").unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let unit = ManifestUnit::new("app", dir.path().to_path_buf());
        let files = unit.manifests().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-controller.yml", "20-service.yaml"]);
    }

    #[test]
    fn test_missing_unit_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let unit = ManifestUnit::new("app", dir.path().join("absent"));
        assert!(unit.manifests().is_err());
    }
}
