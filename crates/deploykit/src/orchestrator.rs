//! Top-level deploy orchestration.
//!
//! Loads a descriptor, builds the shared execution context, optionally
//! establishes the SSH tunnel, points the local kubectl configuration at
//! the environment and runs every deploy unit strictly in descriptor order.
//! Tunnel teardown is guaranteed on every exit path.

use crate::cache::ResourceCache;
use crate::context::ExecutionContext;
use crate::descriptor::Descriptor;
use crate::settings::Settings;
use crate::tunnel::{self, TunnelConfig, TunnelHandle};
use crate::unit::{DeployCtx, DeployUnit, ManifestUnit};
use crate::versions::VersionFinder;
use anyhow::{Context as _, Result, anyhow};
use kubekit::{ContextSpec, Kubectl, ResolvedContext};
use log::{debug, info};
use serde_yaml::Value;
use std::path::Path;
use url::Url;

/// Options for one deployment run.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Redeploy resources even when they already exist
    pub always_deploy: bool,
    /// Environment name to register the cluster under
    pub env_name: String,
    /// Establish an SSH tunnel to reach the control-plane
    pub tunnel: Option<TunnelConfig>,
    /// Caller-supplied parameter overrides
    pub overrides: Option<Value>,
}

/// A loaded deployment: shared context, units and the kubectl client.
pub struct Deploy {
    ctx: ExecutionContext,
    units: Vec<Box<dyn DeployUnit>>,
    kubectl: Kubectl,
    cache: ResourceCache,
    tunnel: Option<TunnelConfig>,
}

impl Deploy {
    /// Load a descriptor and build the shared execution context.
    ///
    /// Settings merge defaults beside the descriptor with the descriptor's
    /// own top-level keys; the kubectl context, when one is specified, is
    /// resolved here, once.
    pub fn load(descriptor_path: &Path, kubectl: Kubectl, opts: DeployOptions) -> Result<Self> {
        let deploy_home = descriptor_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        debug!("loading descriptor {}", descriptor_path.display());
        let descriptor = Descriptor::load(descriptor_path)?;

        let mut settings = Settings::load(deploy_home)?;
        settings.update(&descriptor.doc);

        let versions = match settings.container_version_path() {
            Some(rel) => {
                let root = deploy_home.join(rel);
                debug!("scanning container versions under {}", root.display());
                Some(VersionFinder::scan(&root)?)
            }
            None => None,
        };

        let server = settings
            .server()
            .ok_or_else(|| anyhow!("descriptor configures no control-plane server"))?;
        let server: Url = Url::parse(server)
            .with_context(|| format!("parsing control-plane endpoint `{server}`"))?;

        let resolved_context = match settings.context() {
            Some(value) => {
                let spec = ContextSpec::from_value(value)?;
                Some(ResolvedContext::resolve(&spec, &kubectl)?)
            }
            None => None,
        };

        let units: Vec<Box<dyn DeployUnit>> = descriptor
            .units
            .iter()
            .map(|def| {
                Box::new(ManifestUnit::new(
                    def.display_name(),
                    deploy_home.join(&def.path),
                )) as Box<dyn DeployUnit>
            })
            .collect();

        let ctx = ExecutionContext::new(
            settings,
            versions,
            deploy_home,
            opts.always_deploy,
            opts.env_name,
            resolved_context,
            opts.overrides,
            server,
        );

        Ok(Self {
            ctx,
            units,
            kubectl,
            cache: ResourceCache::new(),
            tunnel: opts.tunnel,
        })
    }

    /// The shared execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Number of deploy units, in descriptor order.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Run the deployment.
    pub fn run(&mut self) -> Result<()> {
        // Held for the rest of the run; dropping it tears the tunnel down
        // on every exit path, including the failures below
        let mut tunnel_handle: Option<TunnelHandle> = None;

        let tunnel_config = self.tunnel.clone();
        if let Some(config) = &tunnel_config {
            let server = self.ctx.server().clone();
            let host = server
                .host_str()
                .ok_or_else(|| anyhow!("endpoint {server} has no host"))?
                .to_string();
            let port = server
                .port_or_known_default()
                .ok_or_else(|| anyhow!("endpoint {server} has no port"))?;

            let handle = TunnelHandle::open(config, &host, port)?;
            self.ctx.set_server(tunnel::local_endpoint(&server)?);
            info!("waiting for SSH tunnel to {}", config.target);
            handle.settle(config.wait_ready, port)?;
            tunnel_handle = Some(handle);
        }

        let env_name = if tunnel_handle.is_some() {
            format!("{}-tunnel", self.ctx.env_name)
        } else {
            self.ctx.env_name.clone()
        };
        self.kubectl
            .update_environment(&env_name, self.ctx.server().as_str())?;

        let mut dctx = DeployCtx {
            ctx: &self.ctx,
            kubectl: &self.kubectl,
            cache: &mut self.cache,
        };
        run_units(&self.units, &mut dctx)
    }
}

/// Run units strictly in order; the first failure aborts the rest.
pub fn run_units(units: &[Box<dyn DeployUnit>], dctx: &mut DeployCtx<'_>) -> Result<()> {
    for unit in units {
        info!("deploying unit '{}'", unit.name());
        unit.deploy(dctx)
            .with_context(|| format!("deploy unit '{}' failed", unit.name()))?;
    }
    Ok(())
}
