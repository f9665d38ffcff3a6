//! Realm-scoped push delegate registry
//!
//! The registry is the heart of Pushline. It holds one active
//! [`PushDelegate`] per realm, provisions a delegate lazily the first
//! time a realm is used, and hot-swaps or updates it when that realm's
//! configuration changes.
//!
//! # Architecture
//!
//! - **Realm map**: realm → active delegate. Senders read it lock-free;
//!   entries are only created or swapped under the realm's provisioning
//!   lock, and a swap is a single map operation so readers never observe
//!   an absent entry for a provisioned realm.
//! - **Factory builder table**: delegate type identifier → constructor
//!   closure, registered at startup. Configuration data supplies only
//!   the identifier key; it can never name executable code.
//! - **Factory cache**: delegate type identifier → factory instance,
//!   built from the table on first use and kept for the process
//!   lifetime. Concurrent first requests race benignly: insertion is
//!   first-writer-wins, so exactly one instance survives.
//! - **Lock table**: realm → provisioning lock. All provisioning,
//!   replacement, and in-place updates for one realm serialize on its
//!   lock; unrelated realms proceed independently.
//!
//! # Provisioning pipeline
//!
//! `resolve config → get-or-create factory → produce delegate → apply`,
//! where apply is the install / replace / update-in-place decision made
//! by the delegate updater against the realm's current delegate. The same
//! pipeline runs lazily from [`send`](DelegateRegistry::send) and
//! proactively from [`refresh`](DelegateRegistry::refresh) (the change
//! listener's entry point).
//!
//! There are no timeouts here: a hung factory or delegate `start` blocks
//! that realm's waiters until it returns.

use crate::config::{ConfigProvider, DelegateConfig};
use crate::delegate::{
    ConsolePushDelegateFactory, DelegateFactory, InMemoryPushDelegateFactory, PushDelegate,
    CONSOLE_DELEGATE_TYPE, MEMORY_DELEGATE_TYPE,
};
use crate::error::{PushlineError, Result};
use crate::message::PushMessage;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

mod updater;

use updater::DelegateUpdater;

/// Constructor closure for a delegate factory.
///
/// Builders must be side-effect-free: when two tasks race to create the
/// same factory, the loser's instance is dropped unused.
pub type DelegateFactoryBuilder = Box<dyn Fn() -> Result<Arc<dyn DelegateFactory>> + Send + Sync>;

/// Counters for registry activity.
#[derive(Debug, Default)]
pub(crate) struct RegistryStats {
    pub(crate) messages_sent: AtomicU64,
    pub(crate) send_failures: AtomicU64,
    pub(crate) delegates_installed: AtomicU64,
    pub(crate) delegates_replaced: AtomicU64,
    pub(crate) in_place_updates: AtomicU64,
    pub(crate) provision_failures: AtomicU64,
    pub(crate) close_failures: AtomicU64,
}

impl RegistryStats {
    fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            delegates_installed: self.delegates_installed.load(Ordering::Relaxed),
            delegates_replaced: self.delegates_replaced.load(Ordering::Relaxed),
            in_place_updates: self.in_place_updates.load(Ordering::Relaxed),
            provision_failures: self.provision_failures.load(Ordering::Relaxed),
            close_failures: self.close_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the registry's counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStatsSnapshot {
    /// Messages successfully handed to a delegate.
    pub messages_sent: u64,
    /// Messages a delegate failed to deliver.
    pub send_failures: u64,
    /// First-time delegate installations.
    pub delegates_installed: u64,
    /// Config-driven delegate replacements.
    pub delegates_replaced: u64,
    /// Config changes applied without replacing the delegate.
    pub in_place_updates: u64,
    /// Provisioning pipeline failures.
    pub provision_failures: u64,
    /// Superseded delegates that failed to close.
    pub close_failures: u64,
}

/// Maps each realm to its active push delegate and keeps that mapping
/// current as realms are first used and as their configuration changes.
pub struct DelegateRegistry {
    realms: Arc<DashMap<String, Arc<dyn PushDelegate>>>,
    factories: DashMap<String, Arc<dyn DelegateFactory>>,
    builders: DashMap<String, DelegateFactoryBuilder>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    provider: Arc<dyn ConfigProvider>,
    updater: DelegateUpdater,
    stats: Arc<RegistryStats>,
}

impl DelegateRegistry {
    /// Create a registry with an empty delegate type table.
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        let realms: Arc<DashMap<String, Arc<dyn PushDelegate>>> = Arc::new(DashMap::new());
        let stats = Arc::new(RegistryStats::default());

        Self {
            realms: realms.clone(),
            factories: DashMap::new(),
            builders: DashMap::new(),
            locks: DashMap::new(),
            provider,
            updater: DelegateUpdater::new(realms, stats.clone()),
            stats,
        }
    }

    /// Create a registry pre-loaded with the built-in delegate types
    /// (`console`, `memory`).
    pub fn with_builtins(provider: Arc<dyn ConfigProvider>) -> Self {
        let registry = Self::new(provider);
        registry.register_delegate_type(CONSOLE_DELEGATE_TYPE, || {
            Ok(Arc::new(ConsolePushDelegateFactory) as Arc<dyn DelegateFactory>)
        });
        registry.register_delegate_type(MEMORY_DELEGATE_TYPE, || {
            Ok(Arc::new(InMemoryPushDelegateFactory) as Arc<dyn DelegateFactory>)
        });
        registry
    }

    /// Register a delegate type.
    ///
    /// After registration, realm configurations may name `type_id` as
    /// their `delegate_type`. Registering an identifier again replaces
    /// its builder but does not touch an already-cached factory.
    pub fn register_delegate_type<F>(&self, type_id: impl Into<String>, builder: F)
    where
        F: Fn() -> Result<Arc<dyn DelegateFactory>> + Send + Sync + 'static,
    {
        let type_id = type_id.into();
        info!(delegate_type = %type_id, "registered push delegate type");
        self.builders.insert(type_id, Box::new(builder));
    }

    /// Send a message to a realm's active delegate.
    ///
    /// If the realm has no delegate yet, this provisions one first;
    /// concurrent senders for the same realm collapse into a single
    /// provisioning attempt while the rest wait on the realm's lock.
    /// If no delegate can be provisioned the call fails with
    /// [`PushlineError::NoDelegateConfigured`] and the realm stays
    /// unprovisioned; the next send retries naturally.
    pub async fn send(&self, message: &PushMessage, realm: &str) -> Result<()> {
        // Fast path: an installed delegate is reachable without any
        // provisioning lock.
        if let Some(delegate) = self.lookup(realm) {
            return self.dispatch(&delegate, message, realm).await;
        }

        let delegate = {
            let lock = self.realm_lock(realm);
            let _guard = lock.lock().await;

            // Losers of the provisioning race land here after the winner
            // finished; re-check before provisioning again.
            if self.lookup(realm).is_none() {
                if let Err(e) = self.provision(realm).await {
                    warn!(realm = %realm, error = %e, "no push delegate could be provisioned");
                    return Err(PushlineError::no_delegate_because(realm, e));
                }
            }

            self.lookup(realm)
                .ok_or_else(|| PushlineError::no_delegate(realm))?
        };

        self.dispatch(&delegate, message, realm).await
    }

    /// Non-blocking read of a realm's current delegate.
    ///
    /// Diagnostic use only: absence here says nothing under concurrency,
    /// so provisioning decisions always go through the realm lock.
    pub fn lookup(&self, realm: &str) -> Option<Arc<dyn PushDelegate>> {
        self.realms.get(realm).map(|e| e.value().clone())
    }

    /// Re-run the provisioning pipeline for a realm, proactively.
    ///
    /// This is the entry point for configuration-change events: the
    /// realm's delegate is installed, replaced, or updated in place
    /// according to the freshly resolved configuration. Errors surface
    /// to the caller; the registry keeps whatever delegate was active.
    pub async fn refresh(&self, realm: &str) -> Result<()> {
        let lock = self.realm_lock(realm);
        let _guard = lock.lock().await;
        self.provision(realm).await
    }

    /// Number of realms with an active delegate.
    pub fn realm_count(&self) -> usize {
        self.realms.len()
    }

    /// Number of factory instances in the cache.
    pub fn cached_factory_count(&self) -> usize {
        self.factories.len()
    }

    /// Snapshot of the registry's activity counters.
    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.stats.snapshot()
    }

    async fn dispatch(
        &self,
        delegate: &Arc<dyn PushDelegate>,
        message: &PushMessage,
        realm: &str,
    ) -> Result<()> {
        match delegate.send(message).await {
            Ok(()) => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                debug!(
                    realm = %realm,
                    message_id = %message.message_id,
                    "push message dispatched"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    realm = %realm,
                    message_id = %message.message_id,
                    error = %e,
                    "push delegate failed to deliver"
                );
                Err(e)
            }
        }
    }

    /// Drive the full provisioning pipeline for one realm. Callers must
    /// hold the realm's provisioning lock.
    async fn provision(&self, realm: &str) -> Result<()> {
        let result = self.update_delegate(realm).await;
        if let Err(e) = &result {
            // A close failure happens after a completed swap; the realm
            // is on its new delegate, so it does not count against
            // provisioning.
            if !matches!(e, PushlineError::DelegateClose { .. }) {
                self.stats.provision_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn update_delegate(&self, realm: &str) -> Result<()> {
        let config = self.provider.resolve(realm).await?;
        let factory = self.get_or_create_factory(&config.delegate_type)?;

        let produced = factory.produce(&config).await.map_err(|e| {
            PushlineError::null_delegate(&config.delegate_type, e.to_string())
        })?;
        let delegate = produced.ok_or_else(|| {
            PushlineError::null_delegate(&config.delegate_type, "factory returned no delegate")
        })?;

        self.updater.apply(realm, delegate, &config).await
    }

    fn get_or_create_factory(&self, type_id: &str) -> Result<Arc<dyn DelegateFactory>> {
        if let Some(factory) = self.factories.get(type_id) {
            return Ok(factory.value().clone());
        }

        let built = {
            let builder = self.builders.get(type_id).ok_or_else(|| {
                PushlineError::factory_instantiation(
                    type_id,
                    "no delegate type registered under this identifier",
                )
            })?;
            builder.value()()?
        };

        // First writer wins; a racing builder's instance is dropped.
        let factory = self
            .factories
            .entry(type_id.to_string())
            .or_insert(built)
            .value()
            .clone();
        Ok(factory)
    }

    fn realm_lock(&self, realm: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(realm.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}
