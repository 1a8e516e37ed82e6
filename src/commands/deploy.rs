//! The deploy subcommand: load a descriptor and run it against an
//! environment, optionally through an SSH tunnel.

use crate::cli::DeployArgs;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use deploykit::{Deploy, DeployOptions, TunnelConfig};
use kubekit::Kubectl;
use serde_yaml::{Mapping, Value};

pub fn run(args: DeployArgs) -> Result<()> {
    let overrides = parse_overrides(&args.set)?;
    let tunnel = args.tunnel.clone().map(|target| TunnelConfig {
        target,
        options: args.tunnel_options.clone(),
        wait_ready: args.tunnel_wait,
    });

    let kubectl = Kubectl::new()?;
    let mut deploy = Deploy::load(
        &args.file,
        kubectl,
        DeployOptions {
            always_deploy: args.force,
            env_name: args.env.clone(),
            tunnel,
            overrides,
        },
    )
    .with_context(|| format!("loading {}", args.file.display()))?;

    let units = deploy.unit_count();
    deploy.run()?;

    ui::success(&format!(
        "deployed {units} unit{} to {}",
        if units == 1 { "" } else { "s" },
        args.env
    ));
    Ok(())
}

/// Parse repeated KEY=VALUE pairs into an overrides mapping.
fn parse_overrides(pairs: &[String]) -> Result<Option<Value>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut mapping = Mapping::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("override `{pair}` is not KEY=VALUE");
        };
        mapping.insert(
            Value::String(key.to_string()),
            Value::String(value.to_string()),
        );
    }
    Ok(Some(Value::Mapping(mapping)))
}
