//! Resolution of kubectl context specifications.
//!
//! A context can be given three ways: inline (a mapping carrying at least a
//! cluster and a namespace), by name (looked up in the local kubectl
//! configuration), or already resolved. Resolution happens once per
//! deployment run and the result is immutable.

use crate::error::{Error, Result};
use crate::kubectl::Kubectl;
use serde_yaml::Value;

/// A context specification as it appears in settings.
#[derive(Debug, Clone)]
pub enum ContextSpec {
    /// Inline mapping with at least `cluster` and `namespace`
    Inline(Value),
    /// Name of a context in the local kubectl configuration
    Named(String),
    /// A previously resolved context, passed through unchanged
    Resolved(ResolvedContext),
}

impl ContextSpec {
    /// Build a spec from a settings value: strings are named references,
    /// mappings are inline specifications.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self::Named(name.clone())),
            Value::Mapping(_) => Ok(Self::Inline(value.clone())),
            _ => Err(Error::InvalidContext(
                "expecting a mapping or a context name".into(),
            )),
        }
    }
}

/// A fully resolved (cluster, namespace, user, display-name) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// Display name; defaults to the namespace when not explicit
    pub name: String,
    /// Cluster the context points at
    pub cluster: String,
    /// Namespace operations run in
    pub namespace: String,
    /// Authenticated user, when the configuration names one
    pub user: Option<String>,
}

impl ResolvedContext {
    /// Resolve a specification into a concrete context.
    ///
    /// Named references are looked up in `kubectl config view`; a missing
    /// name is fatal, as is a specification without both cluster and
    /// namespace.
    pub fn resolve(spec: &ContextSpec, kubectl: &Kubectl) -> Result<Self> {
        match spec {
            ContextSpec::Resolved(ctx) => Ok(ctx.clone()),
            ContextSpec::Inline(value) => Self::from_value(value),
            ContextSpec::Named(name) => {
                let config = kubectl.config_view()?;
                let entry = config
                    .get("contexts")
                    .and_then(Value::as_sequence)
                    .and_then(|contexts| {
                        contexts
                            .iter()
                            .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
                    });
                match entry {
                    Some(ctx) => Self::from_value(&ctx["context"]),
                    None => Err(Error::ContextNotFound(name.clone())),
                }
            }
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        let cluster = value.get("cluster").and_then(Value::as_str);
        let namespace = value.get("namespace").and_then(Value::as_str);
        let (Some(cluster), Some(namespace)) = (cluster, namespace) else {
            return Err(Error::InvalidContext(
                "expecting at least a cluster and a namespace".into(),
            ));
        };
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(namespace);
        Ok(Self {
            name: name.to_string(),
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
            user: value
                .get("user")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    }

    /// Uniform key lookup for templating callers.
    ///
    /// Unrecognized keys are `None`, never an error, so callers may probe
    /// optional fields generically.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "cluster" => Some(&self.cluster),
            "namespace" => Some(&self.namespace),
            "user" => self.user.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(yaml: &str) -> ContextSpec {
        ContextSpec::Inline(serde_yaml::from_str(yaml).unwrap())
    }

    fn resolve_inline(yaml: &str) -> Result<ResolvedContext> {
        let kubectl = Kubectl::with_program("kubectl");
        ResolvedContext::resolve(&inline(yaml), &kubectl)
    }

    #[test]
    fn test_inline_context_resolves() {
        let ctx = resolve_inline("cluster: prod\nnamespace: web\nuser: admin\n").unwrap();
        assert_eq!(ctx.cluster, "prod");
        assert_eq!(ctx.namespace, "web");
        assert_eq!(ctx.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_display_name_defaults_to_namespace() {
        let ctx = resolve_inline("cluster: prod\nnamespace: web\n").unwrap();
        assert_eq!(ctx.name, "web");
    }

    #[test]
    fn test_explicit_name_wins() {
        let ctx = resolve_inline("cluster: prod\nnamespace: web\nname: frontend\n").unwrap();
        assert_eq!(ctx.name, "frontend");
    }

    #[test]
    fn test_missing_cluster_fails() {
        let err = resolve_inline("namespace: web\n").unwrap_err();
        assert!(matches!(err, Error::InvalidContext(_)));
    }

    #[test]
    fn test_missing_namespace_fails() {
        let err = resolve_inline("cluster: prod\n").unwrap_err();
        assert!(matches!(err, Error::InvalidContext(_)));
    }

    #[test]
    fn test_already_resolved_passes_through() {
        let kubectl = Kubectl::with_program("kubectl");
        let resolved = ResolvedContext {
            name: "web".into(),
            cluster: "prod".into(),
            namespace: "web".into(),
            user: None,
        };
        let spec = ContextSpec::Resolved(resolved.clone());
        assert_eq!(ResolvedContext::resolve(&spec, &kubectl).unwrap(), resolved);
    }

    #[test]
    fn test_key_lookup_probes_optional_fields() {
        let ctx = resolve_inline("cluster: prod\nnamespace: web\n").unwrap();
        assert_eq!(ctx.get("cluster"), Some("prod"));
        assert_eq!(ctx.get("namespace"), Some("web"));
        assert_eq!(ctx.get("name"), Some("web"));
        assert_eq!(ctx.get("user"), None);
        assert_eq!(ctx.get("nonsense"), None);
    }

    #[test]
    fn test_spec_from_value_shapes() {
        assert!(matches!(
            ContextSpec::from_value(&Value::String("prod".into())).unwrap(),
            ContextSpec::Named(_)
        ));
        assert!(matches!(
            ContextSpec::from_value(&serde_yaml::from_str("cluster: prod").unwrap()).unwrap(),
            ContextSpec::Inline(_)
        ));
        assert!(ContextSpec::from_value(&Value::Number(3.into())).is_err());
    }

    #[cfg(unix)]
    mod named {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn config_view_kubectl(dir: &std::path::Path) -> Kubectl {
            let path = dir.join("kubectl");
            let script = r#"#!/bin/sh
cat <<'EOF'
contexts:
- name: production
  context:
    cluster: prod-cluster
    namespace: prod-ns
    user: admin
EOF
"#;
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            Kubectl::with_program(path.to_string_lossy())
        }

        #[test]
        fn test_named_context_is_looked_up_in_the_local_config() {
            let dir = tempfile::tempdir().unwrap();
            let kubectl = config_view_kubectl(dir.path());

            let spec = ContextSpec::Named("production".into());
            let ctx = ResolvedContext::resolve(&spec, &kubectl).unwrap();
            assert_eq!(ctx.cluster, "prod-cluster");
            assert_eq!(ctx.user.as_deref(), Some("admin"));
            // The inner mapping has no explicit name, so the display name
            // falls back to the namespace rather than the reference
            assert_eq!(ctx.name, "prod-ns");
        }

        #[test]
        fn test_unknown_named_context_fails() {
            let dir = tempfile::tempdir().unwrap();
            let kubectl = config_view_kubectl(dir.path());

            let spec = ContextSpec::Named("missing".into());
            let err = ResolvedContext::resolve(&spec, &kubectl).unwrap_err();
            assert!(matches!(err, Error::ContextNotFound(name) if name == "missing"));
        }
    }
}
