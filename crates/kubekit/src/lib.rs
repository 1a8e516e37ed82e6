//! # kubekit
//!
//! Library for driving the `kubectl` CLI.
//!
//! Everything the deployer knows about the control-plane flows through the
//! external `kubectl` binary: structured output is exchanged as YAML and
//! failures arrive as stderr text. This crate provides:
//! - A command runner with a bounded retry loop for recognized transient
//!   control-plane failures ([`Runner`], [`RetryPolicy`])
//! - Failure classification by stderr signature ([`KubectlFailure`])
//! - Resolution of named or inline kubectl contexts ([`ResolvedContext`])
//! - Typed wrappers for every consumed kubectl invocation ([`Kubectl`])
//!
//! ## Example
//!
//! ```no_run
//! use kubekit::Kubectl;
//!
//! let kubectl = Kubectl::new().expect("kubectl not on PATH");
//! let services = kubectl.get_resources("Services").expect("listing failed");
//! if let Some(items) = services.get("items").and_then(|i| i.as_sequence()) {
//!     println!("{} services deployed", items.len());
//! }
//! ```
//!
//! ## Retry behavior
//!
//! A kubectl failure whose stderr matches a transient signature (network
//! i/o timeout, connection refused) is retried with a fixed backoff.
//! Identical failures - equal raw stderr - share one bounded budget;
//! distinct failures each get their own. Any other failure is fatal on the
//! first attempt.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod kubectl;
pub mod runner;

pub use context::{ContextSpec, ResolvedContext};
pub use error::{Error, KubectlFailure, RETRY_BACKOFF, RETRY_LIMIT, Result};
pub use kubectl::{CONTEXT_NAME, Kubectl};
pub use runner::{CommandLine, Runner, RetryPolicy};
