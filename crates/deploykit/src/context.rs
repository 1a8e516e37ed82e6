//! Shared execution context lent to every deploy unit.

use crate::settings::Settings;
use crate::versions::VersionFinder;
use kubekit::ResolvedContext;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use url::Url;

/// Immutable-after-construction bundle shared by all deploy units.
///
/// The control-plane endpoint is the one exception: the orchestrator
/// rewrites it exactly once, before any unit runs, when a tunnel redirects
/// traffic through a local port.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Merged deployment settings
    pub settings: Settings,
    /// Container version lookup, when the descriptor configures one
    pub versions: Option<VersionFinder>,
    /// Directory the descriptor lives in; unit paths are relative to it
    pub deploy_root: PathBuf,
    /// Redeploy resources even when they already exist
    pub always_deploy: bool,
    /// Environment this run targets
    pub env_name: String,
    /// Resolved kubectl context, when settings specify one
    pub resolved_context: Option<ResolvedContext>,
    overrides: Value,
    server: Url,
}

impl ExecutionContext {
    /// Bundle up everything units share for the duration of a run.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        versions: Option<VersionFinder>,
        deploy_root: &Path,
        always_deploy: bool,
        env_name: impl Into<String>,
        resolved_context: Option<ResolvedContext>,
        overrides: Option<Value>,
        server: Url,
    ) -> Self {
        Self {
            settings,
            versions,
            deploy_root: deploy_root.to_path_buf(),
            always_deploy,
            env_name: env_name.into(),
            resolved_context,
            overrides: overrides.unwrap_or(Value::Null),
            server,
        }
    }

    /// Control-plane endpoint all units talk to.
    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Rewrite the endpoint. Done once, by the orchestrator, when a tunnel
    /// takes over.
    pub(crate) fn set_server(&mut self, server: Url) {
        self.server = server;
    }

    /// Caller-supplied override for a settings key.
    pub fn override_for(&self, key: &str) -> Option<&Value> {
        self.overrides.get(key)
    }

    /// Version pinned for a container image, when a lookup is configured.
    pub fn version_for(&self, image: &str) -> Option<&str> {
        self.versions.as_ref().and_then(|v| v.version_for(image))
    }
}
