//! Delegate transition protocol
//!
//! Given a freshly produced candidate delegate and a realm's current
//! delegate (if any), the updater decides between installing the
//! candidate as the first instance, replacing the current instance, or
//! updating the current instance in place, and executes the transition
//! so that concurrent readers of the realm map never observe an empty
//! window.

use super::RegistryStats;
use crate::config::DelegateConfig;
use crate::delegate::PushDelegate;
use crate::error::{PushlineError, Result};
use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info};

pub(crate) struct DelegateUpdater {
    realms: Arc<DashMap<String, Arc<dyn PushDelegate>>>,
    stats: Arc<RegistryStats>,
}

impl DelegateUpdater {
    pub(crate) fn new(
        realms: Arc<DashMap<String, Arc<dyn PushDelegate>>>,
        stats: Arc<RegistryStats>,
    ) -> Self {
        Self { realms, stats }
    }

    /// Install, replace, or update in place. Callers must hold the
    /// realm's provisioning lock, so the read-then-act sequence below
    /// cannot interleave with another transition for the same realm.
    pub(crate) async fn apply(
        &self,
        realm: &str,
        candidate: Arc<dyn PushDelegate>,
        config: &DelegateConfig,
    ) -> Result<()> {
        let current = self.realms.get(realm).map(|e| e.value().clone());

        match current {
            None => {
                // A delegate becomes visible only after start() succeeds.
                candidate.start().await?;
                self.realms.insert(realm.to_string(), candidate);
                self.stats.delegates_installed.fetch_add(1, Ordering::Relaxed);
                info!(
                    realm = %realm,
                    delegate_type = %config.delegate_type,
                    "push delegate installed"
                );
                Ok(())
            }
            Some(old) if old.requires_replacement(config) => {
                // Start the replacement first: if it cannot come up, the
                // old delegate stays mapped and serving.
                candidate.start().await?;
                // Single map operation: readers observe the old delegate
                // or the new one, never an absent entry.
                self.realms.insert(realm.to_string(), candidate);
                self.stats.delegates_replaced.fetch_add(1, Ordering::Relaxed);
                info!(
                    realm = %realm,
                    delegate_type = %config.delegate_type,
                    "push delegate replaced"
                );

                // A close failure is reported, but the swap stands: the
                // realm keeps the new, working delegate.
                if let Err(e) = old.close().await {
                    self.stats.close_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        realm = %realm,
                        error = %e,
                        "failed to close superseded push delegate"
                    );
                    return Err(PushlineError::delegate_close(realm, e.to_string()));
                }
                Ok(())
            }
            Some(old) => {
                // Identity unchanged; the candidate is discarded unstarted.
                old.update_config(config).await?;
                self.stats.in_place_updates.fetch_add(1, Ordering::Relaxed);
                debug!(realm = %realm, "push delegate updated in place");
                Ok(())
            }
        }
    }
}
