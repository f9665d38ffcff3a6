//! In-memory push delegate
//!
//! Buffers deliveries in a bounded ring buffer for later inspection.
//! This is the delegate of choice for embedded usage and integration
//! tests, playing the role the in-memory backends play elsewhere in the
//! ecosystem.
//!
//! The `capacity` property is treated as connection-relevant: changing
//! it forces a replacement, since the buffer cannot be resized without
//! discarding delivery history semantics. `capacity` must parse to a
//! positive integer or the factory refuses to produce a delegate.

use super::{DelegateFactory, PushDelegate};
use crate::config::DelegateConfig;
use crate::error::{PushlineError, Result};
use crate::message::PushMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Type identifier for the in-memory delegate.
pub const MEMORY_DELEGATE_TYPE: &str = "memory";

/// Default ring-buffer capacity when the `capacity` property is absent.
pub const DEFAULT_BUFFER_CAPACITY: usize = 128;

/// A delegate that buffers messages instead of transmitting them.
pub struct InMemoryPushDelegate {
    config: RwLock<DelegateConfig>,
    capacity: usize,
    messages: Mutex<VecDeque<PushMessage>>,
    running: AtomicBool,
}

impl InMemoryPushDelegate {
    /// Create a delegate with the given buffer capacity.
    pub fn new(config: DelegateConfig, capacity: usize) -> Self {
        Self {
            config: RwLock::new(config),
            capacity,
            messages: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            running: AtomicBool::new(false),
        }
    }

    /// The configured buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the buffered messages, oldest first.
    pub async fn messages(&self) -> Vec<PushMessage> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Drop all buffered messages.
    pub async fn clear(&self) {
        self.messages.lock().await.clear();
    }
}

#[async_trait]
impl PushDelegate for InMemoryPushDelegate {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(PushlineError::transmission("in-memory delegate is not started"));
        }

        let mut messages = self.messages.lock().await;
        if messages.len() == self.capacity {
            // Ring-buffer semantics: oldest entry gives way.
            messages.pop_front();
        }
        messages.push_back(message.clone());
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        info!(capacity = %self.capacity, "in-memory push delegate started");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        let buffered = self.messages.lock().await.len();
        info!(buffered = %buffered, "in-memory push delegate closed");
        Ok(())
    }

    fn requires_replacement(&self, config: &DelegateConfig) -> bool {
        config.delegate_type != MEMORY_DELEGATE_TYPE
            || config.usize_property("capacity", DEFAULT_BUFFER_CAPACITY) != self.capacity
    }

    async fn update_config(&self, config: &DelegateConfig) -> Result<()> {
        *self.config.write().await = config.clone();
        debug!("in-memory push delegate reconfigured");
        Ok(())
    }
}

/// Factory for [`InMemoryPushDelegate`].
pub struct InMemoryPushDelegateFactory;

#[async_trait]
impl DelegateFactory for InMemoryPushDelegateFactory {
    fn type_name(&self) -> &str {
        MEMORY_DELEGATE_TYPE
    }

    async fn produce(&self, config: &DelegateConfig) -> Result<Option<Arc<dyn PushDelegate>>> {
        let capacity = match config.property("capacity") {
            None => DEFAULT_BUFFER_CAPACITY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) | Err(_) => {
                    warn!(capacity = %raw, "invalid capacity for in-memory delegate");
                    return Ok(None);
                }
            },
        };

        Ok(Some(Arc::new(InMemoryPushDelegate::new(
            config.clone(),
            capacity,
        ))))
    }
}
