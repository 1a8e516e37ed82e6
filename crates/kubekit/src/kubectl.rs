//! The kubectl CLI surface consumed by deployments.
//!
//! One method per invocation the deployer issues. All structured output is
//! exchanged as YAML and parsed into generic [`serde_yaml::Value`] trees;
//! manifests travel to the cluster on stdin.

use crate::error::{Error, Result};
use crate::runner::{CommandLine, RetryPolicy, Runner};
use log::debug;
use serde_yaml::Value;
use std::path::Path;
use std::process::Command;

/// Name of the kubectl context this tool registers and switches to.
pub const CONTEXT_NAME: &str = "stevedore-context";

/// Typed access to every kubectl invocation the deployer issues.
pub struct Kubectl {
    program: String,
    runner: Runner,
}

impl Kubectl {
    /// Locate kubectl on PATH.
    ///
    /// Returns an error if no kubectl binary can be found.
    pub fn new() -> Result<Self> {
        let program = find_kubectl()?;
        Ok(Self::with_program(program))
    }

    /// Use a specific kubectl binary without checking availability.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self::with_policy(program, RetryPolicy::default())
    }

    /// Use a specific binary and a custom retry policy.
    pub fn with_policy(program: impl Into<String>, policy: RetryPolicy) -> Self {
        let program = program.into();
        let runner = Runner::with_policy(program.clone(), policy);
        Self { program, runner }
    }

    /// The kubectl binary this client drives.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the binary answers a client-only version probe.
    pub fn is_available(&self) -> bool {
        self.run(&["version", "--client"], true, false, None).is_ok()
    }

    fn run(
        &self,
        args: &[&str],
        capture: bool,
        echo: bool,
        stdin: Option<&str>,
    ) -> Result<Option<String>> {
        let cmd = CommandLine::new(self.program.clone(), args);
        self.runner.execute(&cmd, capture, echo, stdin)
    }

    fn get_yaml(&self, args: &[&str]) -> Result<Value> {
        let out = self.run(args, true, false, None)?.unwrap_or_default();
        Ok(serde_yaml::from_str(&out)?)
    }

    /// Submit a manifest via `kubectl create -f -`.
    pub fn create(&self, yaml: &str) -> Result<String> {
        Ok(self
            .run(&["create", "-f", "-"], true, true, Some(yaml))?
            .unwrap_or_default())
    }

    /// Replace a live object via `kubectl replace -f -`.
    pub fn replace(&self, yaml: &str) -> Result<String> {
        Ok(self
            .run(&["replace", "-f", "-"], true, true, Some(yaml))?
            .unwrap_or_default())
    }

    /// Delete one object by kind and name.
    pub fn delete_resource(&self, kind: &str, name: &str) -> Result<()> {
        debug!("deleting resource {kind}/{name}");
        self.run(&["delete", &format!("{kind}/{name}")], false, true, None)?;
        Ok(())
    }

    /// Delete whatever a manifest file declares.
    pub fn delete_file(&self, file: &Path) -> Result<()> {
        debug!("deleting resources from {}", file.display());
        self.run(
            &["delete", "-f", &file.to_string_lossy()],
            false,
            true,
            None,
        )?;
        Ok(())
    }

    /// Full listing of a pluralized resource kind.
    pub fn get_resources(&self, kinds: &str) -> Result<Value> {
        debug!("fetching deployed {kinds}");
        self.get_yaml(&["get", kinds, "-o", "yaml"])
    }

    /// Pods matching a label selector.
    pub fn pods_matching(&self, key: &str, value: &str) -> Result<Value> {
        self.get_yaml(&["get", "pods", "-l", &format!("{key}={value}"), "-o", "yaml"])
    }

    /// Delete pods matching a label selector.
    pub fn delete_pods(&self, key: &str, value: &str) -> Result<()> {
        debug!("deleting pods matching {key}={value}");
        self.run(
            &["delete", "pods", "-l", &format!("{key}={value}")],
            false,
            true,
            None,
        )?;
        Ok(())
    }

    /// Raw log text for a pod.
    pub fn pod_logs(&self, pod: &str) -> Result<String> {
        Ok(self.run(&["logs", pod], true, false, None)?.unwrap_or_default())
    }

    /// Cluster events involving the given pod, oldest first.
    pub fn events_for(&self, pod: &str) -> Result<Vec<Value>> {
        let events = self.get_yaml(&["get", "events", "-o", "yaml"])?;
        let mut relevant: Vec<Value> = events
            .get("items")
            .and_then(Value::as_sequence)
            .map(|items| {
                items
                    .iter()
                    .filter(|event| event["involvedObject"]["name"].as_str() == Some(pod))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        relevant.sort_by(|a, b| {
            let left = a["lastTimestamp"].as_str().unwrap_or_default();
            let right = b["lastTimestamp"].as_str().unwrap_or_default();
            left.cmp(right)
        });
        Ok(relevant)
    }

    /// The local kubectl configuration.
    pub fn config_view(&self) -> Result<Value> {
        self.get_yaml(&["config", "view", "-o", "yaml"])
    }

    /// Register or update a named cluster entry.
    pub fn set_cluster(&self, name: &str, server: &str) -> Result<()> {
        self.run(
            &["config", "set-cluster", name, &format!("--server={server}")],
            false,
            true,
            None,
        )?;
        Ok(())
    }

    /// Register or update the deployer's context entry.
    pub fn set_context(&self, cluster: &str, namespace: &str) -> Result<()> {
        self.run(
            &[
                "config",
                "set-context",
                CONTEXT_NAME,
                &format!("--cluster={cluster}"),
                &format!("--namespace={namespace}"),
            ],
            false,
            true,
            None,
        )?;
        Ok(())
    }

    /// Switch the active context to the deployer's entry.
    pub fn use_context(&self) -> Result<()> {
        self.run(&["config", "use-context", CONTEXT_NAME], false, true, None)?;
        Ok(())
    }

    /// Point the local configuration at an environment's control-plane and
    /// make it the active context. The namespace shares the environment
    /// name.
    pub fn update_environment(&self, env_name: &str, server: &str) -> Result<()> {
        self.set_cluster(env_name, server)?;
        self.set_context(env_name, env_name)?;
        self.use_context()
    }
}

/// Find the kubectl executable via PATH lookup.
fn find_kubectl() -> Result<String> {
    let output = Command::new("which")
        .arg("kubectl")
        .output()
        .map_err(|_| Error::KubectlNotFound)?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(path);
        }
    }

    Err(Error::KubectlNotFound)
}
