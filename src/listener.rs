//! Configuration-change listener
//!
//! Translates external configuration-change events into proactive
//! delegate refreshes, so a realm's delegate is replaced or updated as
//! soon as its configuration changes rather than on the next send.
//!
//! Events carry the identity of the configuration service that emitted
//! them; the listener acts only on organization-scoped events matching
//! its own service name and version, and maps the event's organization
//! path to a realm through an injected mapping function. Everything
//! else is a no-op.

use crate::registry::DelegateRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Service identity the listener reacts to unless overridden.
pub const DEFAULT_SERVICE_NAME: &str = "pushline";
/// Service version the listener reacts to unless overridden.
pub const DEFAULT_SERVICE_VERSION: &str = "1.0";

/// Scope of a configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigChangeScope {
    /// Service schema changed.
    Schema,
    /// Service-wide (global) configuration changed.
    Global,
    /// One organization's configuration changed.
    Organization,
}

/// Kind of change within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigChangeKind {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ConfigChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigChangeKind::Added => write!(f, "added"),
            ConfigChangeKind::Modified => write!(f, "modified"),
            ConfigChangeKind::Removed => write!(f, "removed"),
        }
    }
}

/// A configuration-change event from the external config service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    /// Change scope.
    pub scope: ConfigChangeScope,
    /// Name of the service whose configuration changed.
    pub service_name: String,
    /// Version of that service.
    pub service_version: String,
    /// Organization path the change applies to (organization scope).
    pub org_path: String,
    /// Configuration group.
    pub group_name: String,
    /// Path of the changed component within the service.
    pub component_path: String,
    /// Kind of change.
    pub kind: ConfigChangeKind,
}

impl ConfigChangeEvent {
    /// An organization-scoped modification event with the default
    /// service identity.
    pub fn organization(org_path: impl Into<String>) -> Self {
        Self {
            scope: ConfigChangeScope::Organization,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            org_path: org_path.into(),
            group_name: String::new(),
            component_path: String::new(),
            kind: ConfigChangeKind::Modified,
        }
    }

    /// Override the service identity.
    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.service_name = name.into();
        self.service_version = version.into();
        self
    }

    /// Override the change kind.
    pub fn with_kind(mut self, kind: ConfigChangeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Maps an organization path to a realm identifier.
pub type RealmMapper = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Feeds matching configuration-change events into the registry's
/// provisioning pipeline.
pub struct ChangeListener {
    service_name: String,
    service_version: String,
    registry: Arc<DelegateRegistry>,
    realm_mapper: RealmMapper,
}

impl ChangeListener {
    /// Create a listener with the default service identity.
    pub fn new(registry: Arc<DelegateRegistry>, realm_mapper: RealmMapper) -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            registry,
            realm_mapper,
        }
    }

    /// Override the service identity this listener matches.
    pub fn with_identity(
        mut self,
        service_name: impl Into<String>,
        service_version: impl Into<String>,
    ) -> Self {
        self.service_name = service_name.into();
        self.service_version = service_version.into();
        self
    }

    /// Handle one event.
    ///
    /// Provisioning failures are logged and swallowed: there is no
    /// caller to propagate them to, and the registry keeps whatever
    /// delegate the realm had.
    pub async fn handle_event(&self, event: &ConfigChangeEvent) {
        if event.scope != ConfigChangeScope::Organization {
            return;
        }
        if event.service_name != self.service_name
            || event.service_version != self.service_version
        {
            debug!(
                service = %event.service_name,
                version = %event.service_version,
                "ignoring change event for foreign service"
            );
            return;
        }

        let realm = (self.realm_mapper)(&event.org_path);
        info!(
            realm = %realm,
            kind = %event.kind,
            "configuration changed, refreshing push delegate"
        );

        if let Err(e) = self.registry.refresh(&realm).await {
            error!(
                realm = %realm,
                error = %e,
                "unable to refresh push delegate after configuration change"
            );
        }
    }

    /// Drain events from a channel until it closes.
    pub async fn run(self, mut events: mpsc::Receiver<ConfigChangeEvent>) {
        info!(
            service = %self.service_name,
            version = %self.service_version,
            "change listener started"
        );
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
        info!("change listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelegateConfig, InMemoryConfigProvider};
    use crate::delegate::CONSOLE_DELEGATE_TYPE;

    fn listener_setup() -> (ChangeListener, Arc<DelegateRegistry>, Arc<InMemoryConfigProvider>) {
        let provider = Arc::new(InMemoryConfigProvider::new());
        let registry = Arc::new(DelegateRegistry::with_builtins(provider.clone()));
        let listener = ChangeListener::new(
            registry.clone(),
            Box::new(|org| org.trim_start_matches("o=").to_string()),
        );
        (listener, registry, provider)
    }

    #[tokio::test]
    async fn test_organization_event_provisions_proactively() {
        let (listener, registry, provider) = listener_setup();
        provider.insert("acme", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));

        listener.handle_event(&ConfigChangeEvent::organization("o=acme")).await;

        assert!(registry.lookup("acme").is_some());
        assert_eq!(registry.stats().delegates_installed, 1);
    }

    #[tokio::test]
    async fn test_foreign_service_event_is_ignored() {
        let (listener, registry, provider) = listener_setup();
        provider.insert("acme", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));

        let event = ConfigChangeEvent::organization("o=acme").with_service("mailer", "2.0");
        listener.handle_event(&event).await;

        assert!(registry.lookup("acme").is_none());
    }

    #[tokio::test]
    async fn test_non_organization_scope_is_noop() {
        let (listener, registry, provider) = listener_setup();
        provider.insert("acme", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));

        let mut event = ConfigChangeEvent::organization("o=acme");
        event.scope = ConfigChangeScope::Schema;
        listener.handle_event(&event).await;
        event.scope = ConfigChangeScope::Global;
        listener.handle_event(&event).await;

        assert!(registry.lookup("acme").is_none());
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_swallowed() {
        let (listener, registry, _provider) = listener_setup();

        // No configuration for the realm; handle_event must not panic
        // or propagate.
        listener.handle_event(&ConfigChangeEvent::organization("o=ghost")).await;

        assert!(registry.lookup("ghost").is_none());
        assert_eq!(registry.stats().provision_failures, 1);
    }

    #[tokio::test]
    async fn test_custom_identity_matches() {
        let (listener, registry, provider) = listener_setup();
        let listener = listener.with_identity("push-svc", "3.1");
        provider.insert("acme", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));

        // Default identity no longer matches.
        listener.handle_event(&ConfigChangeEvent::organization("o=acme")).await;
        assert!(registry.lookup("acme").is_none());

        let event = ConfigChangeEvent::organization("o=acme").with_service("push-svc", "3.1");
        listener.handle_event(&event).await;
        assert!(registry.lookup("acme").is_some());
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let (listener, registry, provider) = listener_setup();
        provider.insert("a", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));
        provider.insert("b", DelegateConfig::new(CONSOLE_DELEGATE_TYPE));

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(listener.run(rx));

        tx.send(ConfigChangeEvent::organization("o=a")).await.unwrap();
        tx.send(ConfigChangeEvent::organization("o=b")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(registry.lookup("a").is_some());
        assert!(registry.lookup("b").is_some());
        assert_eq!(registry.stats().delegates_installed, 2);
    }
}
