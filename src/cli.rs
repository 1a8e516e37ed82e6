use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(version)]
#[command(about = "Deploys multi-resource descriptors to Kubernetes through kubectl", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a descriptor to an environment
    Deploy(DeployArgs),

    /// Print the logs of a pod
    Logs {
        /// Pod name
        pod: String,
    },

    /// Print cluster events involving a pod, oldest first
    Events {
        /// Pod name
        pod: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct DeployArgs {
    /// Path to the deployment descriptor
    pub file: PathBuf,

    /// Environment name to register the cluster and context under
    #[arg(short, long)]
    pub env: String,

    /// Redeploy resources even when they already exist
    #[arg(short, long)]
    pub force: bool,

    /// SSH destination (user@bastion) to tunnel to the control-plane through
    #[arg(long)]
    pub tunnel: Option<String>,

    /// Extra options passed verbatim to the tunnel ssh invocation
    #[arg(long, requires = "tunnel")]
    pub tunnel_options: Option<String>,

    /// Poll the forwarded port instead of waiting a fixed settle delay
    #[arg(long, requires = "tunnel")]
    pub tunnel_wait: bool,

    /// Override a settings parameter (KEY=VALUE, repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}
