//! Realm delegate configuration
//!
//! A [`DelegateConfig`] is the immutable value object a
//! [`ConfigProvider`] produces for a realm: the delegate type
//! identifier plus free-form string properties. The registry treats the
//! properties as opaque: only the delegate itself knows which of them
//! are connection-relevant (see
//! [`PushDelegate::requires_replacement`](crate::delegate::PushDelegate::requires_replacement)).

use crate::error::{PushlineError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one realm's push delegate.
///
/// The `delegate_type` identifier selects a factory from the registry's
/// registration table; it is a plain key, never an executable type
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateConfig {
    /// Delegate type identifier (e.g. `"console"`, `"memory"`).
    pub delegate_type: String,
    /// Delegate-specific properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl DelegateConfig {
    /// Create a configuration with no properties.
    pub fn new(delegate_type: impl Into<String>) -> Self {
        Self {
            delegate_type: delegate_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Add one property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property value.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|s| s.as_str())
    }

    /// Boolean property; anything other than `"true"` reads as the
    /// default when absent, and `false` otherwise.
    pub fn bool_property(&self, name: &str, default: bool) -> bool {
        self.property(name).map(|v| v == "true").unwrap_or(default)
    }

    /// Numeric property; unparsable values fall back to the default.
    pub fn usize_property(&self, name: &str, default: usize) -> usize {
        self.property(name)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default)
    }
}

/// Source of per-realm delegate configuration.
///
/// Implementations must be safe to call repeatedly and concurrently for
/// different realms. Failures should be reported as
/// [`PushlineError::ConfigResolution`].
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Resolve the delegate configuration for a realm.
    async fn resolve(&self, realm: &str) -> Result<DelegateConfig>;
}

/// In-memory config provider for embedded and test usage.
///
/// Holds realm configurations in a concurrent map; nothing is
/// persisted. Pair it with
/// [`ChangeListener`](crate::listener::ChangeListener) by emitting an
/// organization change event after mutating a realm's entry.
pub struct InMemoryConfigProvider {
    configs: DashMap<String, DelegateConfig>,
}

impl InMemoryConfigProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            configs: DashMap::new(),
        }
    }

    /// Set a realm's configuration, returning the previous one if any.
    pub fn insert(&self, realm: impl Into<String>, config: DelegateConfig) -> Option<DelegateConfig> {
        self.configs.insert(realm.into(), config)
    }

    /// Remove a realm's configuration.
    pub fn remove(&self, realm: &str) -> Option<DelegateConfig> {
        self.configs.remove(realm).map(|(_, c)| c)
    }

    /// Number of configured realms.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether any realm is configured.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for InMemoryConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn resolve(&self, realm: &str) -> Result<DelegateConfig> {
        self.configs
            .get(realm)
            .map(|c| c.value().clone())
            .ok_or_else(|| {
                PushlineError::config_resolution(realm, "no configuration registered for realm")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_helpers() {
        let config = DelegateConfig::new("console")
            .with_property("prefix", "[push] ")
            .with_property("log_body", "true")
            .with_property("capacity", "64")
            .with_property("bad_number", "sixty-four");

        assert_eq!(config.property("prefix"), Some("[push] "));
        assert_eq!(config.property("missing"), None);
        assert!(config.bool_property("log_body", false));
        assert!(!config.bool_property("missing", false));
        assert!(config.bool_property("missing", true));
        assert_eq!(config.usize_property("capacity", 128), 64);
        assert_eq!(config.usize_property("bad_number", 128), 128);
        assert_eq!(config.usize_property("missing", 128), 128);
    }

    #[tokio::test]
    async fn test_in_memory_provider_resolve() {
        let provider = InMemoryConfigProvider::new();
        provider.insert("acme", DelegateConfig::new("console"));

        let config = provider.resolve("acme").await.unwrap();
        assert_eq!(config.delegate_type, "console");
    }

    #[tokio::test]
    async fn test_in_memory_provider_unknown_realm() {
        let provider = InMemoryConfigProvider::new();
        let err = provider.resolve("ghost").await.unwrap_err();
        assert!(matches!(err, PushlineError::ConfigResolution { .. }));
    }

    #[tokio::test]
    async fn test_in_memory_provider_replace_and_remove() {
        let provider = InMemoryConfigProvider::new();
        assert!(provider.is_empty());

        provider.insert("acme", DelegateConfig::new("console"));
        let previous = provider.insert("acme", DelegateConfig::new("memory"));
        assert_eq!(previous.unwrap().delegate_type, "console");
        assert_eq!(provider.len(), 1);

        let removed = provider.remove("acme").unwrap();
        assert_eq!(removed.delegate_type, "memory");
        assert!(provider.resolve("acme").await.is_err());
    }
}
