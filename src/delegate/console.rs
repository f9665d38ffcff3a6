//! Console push delegate
//!
//! Writes each delivery to the tracing log instead of a real provider.
//! Useful for development and for smoke-testing realm routing.
//!
//! # Configuration
//!
//! | Key        | Type    | Default | Description                         |
//! |------------|---------|---------|-------------------------------------|
//! | `prefix`   | String  | ``      | Line prefix for each delivery       |
//! | `log_body` | Boolean | false   | Whether to include the message body |
//!
//! Both properties are cosmetic and hot-apply in place; only a change
//! of delegate type forces a replacement.

use super::{DelegateFactory, PushDelegate};
use crate::config::DelegateConfig;
use crate::error::{PushlineError, Result};
use crate::message::PushMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Type identifier for the console delegate.
pub const CONSOLE_DELEGATE_TYPE: &str = "console";

/// A delegate that logs deliveries via `tracing`.
pub struct ConsolePushDelegate {
    config: RwLock<DelegateConfig>,
    running: AtomicBool,
    delivered: AtomicU64,
}

impl ConsolePushDelegate {
    /// Create a delegate from its configuration.
    pub fn new(config: DelegateConfig) -> Self {
        Self {
            config: RwLock::new(config),
            running: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
        }
    }

    /// Number of messages delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PushDelegate for ConsolePushDelegate {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(PushlineError::transmission("console delegate is not started"));
        }

        let (prefix, log_body) = {
            let config = self.config.read().await;
            (
                config.property("prefix").unwrap_or("").to_string(),
                config.bool_property("log_body", false),
            )
        };

        if log_body {
            info!(
                recipient = %message.recipient,
                message_id = %message.message_id,
                priority = %message.priority,
                body = %message.body,
                "{}push delivered",
                prefix
            );
        } else {
            info!(
                recipient = %message.recipient,
                message_id = %message.message_id,
                priority = %message.priority,
                "{}push delivered",
                prefix
            );
        }

        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        info!("console push delegate started");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        info!(delivered = %self.delivered(), "console push delegate closed");
        Ok(())
    }

    fn requires_replacement(&self, config: &DelegateConfig) -> bool {
        config.delegate_type != CONSOLE_DELEGATE_TYPE
    }

    async fn update_config(&self, config: &DelegateConfig) -> Result<()> {
        *self.config.write().await = config.clone();
        debug!("console push delegate reconfigured");
        Ok(())
    }
}

/// Factory for [`ConsolePushDelegate`].
pub struct ConsolePushDelegateFactory;

#[async_trait]
impl DelegateFactory for ConsolePushDelegateFactory {
    fn type_name(&self) -> &str {
        CONSOLE_DELEGATE_TYPE
    }

    async fn produce(&self, config: &DelegateConfig) -> Result<Option<Arc<dyn PushDelegate>>> {
        Ok(Some(Arc::new(ConsolePushDelegate::new(config.clone()))))
    }
}
