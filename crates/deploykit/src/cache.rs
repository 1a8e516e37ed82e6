//! Run-scoped cache of remote resource listings.
//!
//! One entry per pluralized kind, holding the last listing fetched via
//! `kubectl get <kinds> -o yaml`. The cache is owned by the orchestrator and
//! passed by reference into reconciliation calls. Entries are point-in-time
//! snapshots: they stay correct only until remote state changes, and
//! staleness around mutating operations is the caller's concern to manage by
//! asking for a refresh.

use kubekit::Kubectl;
use serde_yaml::Value;
use std::collections::HashMap;

/// Cached resource listings, keyed by pluralized kind.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: HashMap<String, Value>,
}

impl ResourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The listing for a kind, fetching when asked to refresh or when no
    /// entry exists yet. A fetch fully replaces the entry; names no longer
    /// present remotely disappear from subsequent lookups.
    pub fn listing(
        &mut self,
        kubectl: &Kubectl,
        kinds: &str,
        refresh: bool,
    ) -> kubekit::Result<&Value> {
        if refresh || !self.entries.contains_key(kinds) {
            let listing = kubectl.get_resources(kinds)?;
            self.entries.insert(kinds.to_string(), listing);
        }
        Ok(&self.entries[kinds])
    }

    /// Replace the entry for a kind with a known listing.
    pub fn seed(&mut self, kinds: impl Into<String>, listing: Value) {
        self.entries.insert(kinds.into(), listing);
    }

    /// Whether a listing for the kind has been fetched.
    pub fn contains(&self, kinds: &str) -> bool {
        self.entries.contains_key(kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(names: &[&str]) -> Value {
        let mut yaml = String::from("items:\n");
        for name in names {
            yaml.push_str(&format!("- metadata:\n    name: {name}\n"));
        }
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_seeded_entry_is_served_without_fetching() {
        let mut cache = ResourceCache::new();
        cache.seed("Services", listing(&["web"]));
        // A fetch would fail loudly: the binary does not exist
        let kubectl = Kubectl::with_program("kubectl-that-does-not-exist");

        let served = cache.listing(&kubectl, "Services", false).unwrap();
        let items = served.get("items").and_then(Value::as_sequence).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_missing_entry_forces_a_fetch() {
        let mut cache = ResourceCache::new();
        let kubectl = Kubectl::with_program("kubectl-that-does-not-exist");

        // refresh=false still fetches when nothing is cached, which here
        // surfaces as a spawn failure
        assert!(cache.listing(&kubectl, "Services", false).is_err());
    }

    #[test]
    fn test_refresh_fully_replaces_the_entry() {
        let mut cache = ResourceCache::new();
        cache.seed("Services", listing(&["web", "worker"]));
        cache.seed("Services", listing(&["web"]));

        let kubectl = Kubectl::with_program("kubectl-that-does-not-exist");
        let served = cache.listing(&kubectl, "Services", false).unwrap();
        let items = served.get("items").and_then(Value::as_sequence).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["metadata"]["name"].as_str(), Some("web"));
    }

    #[test]
    fn test_entries_are_keyed_by_kind() {
        let mut cache = ResourceCache::new();
        cache.seed("Services", listing(&["web"]));
        assert!(cache.contains("Services"));
        assert!(!cache.contains("Pods"));
    }
}
