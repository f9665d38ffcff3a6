//! Shared test fixtures for Pushline integration tests
//!
//! Provides recording doubles for the delegate and factory traits so
//! tests can assert exactly how often provisioning touched them, plus a
//! shared event log for cross-instance ordering assertions.
//!
//! In your test file, add:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use pushline::{
    DelegateConfig, DelegateFactory, DelegateRegistry, InMemoryConfigProvider, PushDelegate,
    PushMessage, PushlineError, Result,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared, ordered log of lifecycle events across delegate instances.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Delegate double that records lifecycle and send activity.
///
/// Failure modes and the replacement predicate are toggled through the
/// public atomics after construction.
pub struct RecordingDelegate {
    pub tag: String,
    log: Option<EventLog>,
    pub starts: AtomicU64,
    pub closes: AtomicU64,
    pub sends: AtomicU64,
    pub config_updates: AtomicU64,
    pub replacement_required: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_close: AtomicBool,
    pub fail_send: AtomicBool,
    pub last_config: Mutex<Option<DelegateConfig>>,
}

impl RecordingDelegate {
    pub fn new(tag: &str) -> Arc<Self> {
        Self::build(tag, None)
    }

    /// A delegate that also appends `start:<tag>` / `close:<tag>` to a
    /// shared event log.
    pub fn logged(tag: &str, log: EventLog) -> Arc<Self> {
        Self::build(tag, Some(log))
    }

    fn build(tag: &str, log: Option<EventLog>) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.to_string(),
            log,
            starts: AtomicU64::new(0),
            closes: AtomicU64::new(0),
            sends: AtomicU64::new(0),
            config_updates: AtomicU64::new(0),
            replacement_required: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            last_config: Mutex::new(None),
        })
    }

    fn record(&self, what: &str) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("{}:{}", what, self.tag));
        }
    }
}

#[async_trait]
impl PushDelegate for RecordingDelegate {
    async fn send(&self, _message: &PushMessage) -> Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(PushlineError::transmission("send refused"));
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(PushlineError::transmission("start refused"));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.record("start");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.record("close");
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(PushlineError::transmission("close refused"));
        }
        Ok(())
    }

    fn requires_replacement(&self, _config: &DelegateConfig) -> bool {
        self.replacement_required.load(Ordering::SeqCst)
    }

    async fn update_config(&self, config: &DelegateConfig) -> Result<()> {
        self.config_updates.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

/// Factory double that counts `produce` calls and hands out scripted
/// delegate instances in order (falling back to fresh recording
/// delegates when the script runs dry).
pub struct RecordingFactory {
    type_id: String,
    pub produces: AtomicU64,
    pub produce_none: AtomicBool,
    scripted: Mutex<VecDeque<Arc<RecordingDelegate>>>,
}

impl RecordingFactory {
    pub fn new(type_id: &str) -> Arc<Self> {
        Arc::new(Self {
            type_id: type_id.to_string(),
            produces: AtomicU64::new(0),
            produce_none: AtomicBool::new(false),
            scripted: Mutex::new(VecDeque::new()),
        })
    }

    /// Queue the next delegate this factory will produce.
    pub fn script(&self, delegate: Arc<RecordingDelegate>) {
        self.scripted.lock().unwrap().push_back(delegate);
    }
}

#[async_trait]
impl DelegateFactory for RecordingFactory {
    fn type_name(&self) -> &str {
        &self.type_id
    }

    async fn produce(&self, _config: &DelegateConfig) -> Result<Option<Arc<dyn PushDelegate>>> {
        self.produces.fetch_add(1, Ordering::SeqCst);
        if self.produce_none.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let next = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RecordingDelegate::new("auto"));
        Ok(Some(next as Arc<dyn PushDelegate>))
    }
}

/// Registry wired to a recording factory under the `"recording"` type.
pub fn recording_setup() -> (
    Arc<DelegateRegistry>,
    Arc<InMemoryConfigProvider>,
    Arc<RecordingFactory>,
) {
    let provider = Arc::new(InMemoryConfigProvider::new());
    let registry = Arc::new(DelegateRegistry::new(provider.clone()));
    let factory = RecordingFactory::new("recording");

    let handle = factory.clone();
    registry.register_delegate_type("recording", move || {
        Ok(handle.clone() as Arc<dyn DelegateFactory>)
    });

    (registry, provider, factory)
}

/// A minimal configuration selecting the recording delegate type.
pub fn recording_config() -> DelegateConfig {
    DelegateConfig::new("recording")
}
