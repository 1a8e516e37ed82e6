//! # deploykit
//!
//! Deployment orchestration over [`kubekit`].
//!
//! A deployment descriptor names an ordered list of deploy units. This crate
//! loads the descriptor, merges settings, builds the shared
//! [`ExecutionContext`], optionally opens an SSH tunnel to the control-plane
//! and runs each unit in sequence, reconciling its resources against the
//! cluster through a run-scoped listing cache.
//!
//! ## Core concepts
//!
//! - [`Resource`]: the desired state of one remote object, able to answer
//!   "does this already exist" and to create/delete/recreate itself
//! - [`ResourceCache`]: injectable, run-scoped cache of remote listings,
//!   keyed by pluralized kind; staleness around mutations is the caller's
//!   concern
//! - [`DeployUnit`]: one independently deployable component; the first
//!   failing unit aborts the batch
//! - [`Deploy`]: the orchestrator; guarantees tunnel teardown on every exit
//!   path
//!
//! ## Example
//!
//! ```no_run
//! use deploykit::{Deploy, DeployOptions};
//! use kubekit::Kubectl;
//! use std::path::Path;
//!
//! let kubectl = Kubectl::new().expect("kubectl not on PATH");
//! let mut deploy = Deploy::load(
//!     Path::new("deploy.yaml"),
//!     kubectl,
//!     DeployOptions {
//!         env_name: "staging".into(),
//!         ..Default::default()
//!     },
//! )
//! .expect("descriptor failed to load");
//! deploy.run().expect("deployment failed");
//! ```

pub mod cache;
pub mod context;
pub mod descriptor;
pub mod orchestrator;
pub mod resource;
pub mod settings;
pub mod tunnel;
pub mod unit;
pub mod versions;

pub use cache::ResourceCache;
pub use context::ExecutionContext;
pub use descriptor::{Descriptor, UnitDef};
pub use orchestrator::{Deploy, DeployOptions, run_units};
pub use resource::Resource;
pub use settings::Settings;
pub use tunnel::{CONTROL_SOCKET, SETTLE_DELAY, TunnelConfig, TunnelHandle, local_endpoint};
pub use unit::{DeployCtx, DeployUnit, ManifestUnit};
pub use versions::VersionFinder;
