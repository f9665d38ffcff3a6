//! Push delegate SDK
//!
//! A *delegate* is the live object that transmits push messages for one
//! realm via one concrete provider. This module defines:
//! - [`PushDelegate`]: capability set of an active delegate
//! - [`DelegateFactory`]: produces delegate instances from configuration
//! - Built-in delegates: [`ConsolePushDelegate`] (logs deliveries, for
//!   debugging) and [`InMemoryPushDelegate`] (buffers deliveries, for
//!   embedded and test usage)
//!
//! Provider-specific delegates (GCM, APNS, SNS, ...) live outside this
//! crate; they implement the same two traits and are registered with
//! the registry under their own type identifier.
//!
//! # Ownership model
//!
//! After installation the registry is the sole caller of the lifecycle
//! methods (`start`, `close`, `update_config`), while any number of
//! sender tasks may call `send` concurrently. Implementations therefore
//! take `&self` everywhere and keep mutable state behind interior
//! mutability. A delegate that has been closed is never started or
//! installed again.

use crate::config::DelegateConfig;
use crate::error::Result;
use crate::message::PushMessage;
use async_trait::async_trait;
use std::sync::Arc;

mod console;
mod memory;

pub use console::{ConsolePushDelegate, ConsolePushDelegateFactory, CONSOLE_DELEGATE_TYPE};
pub use memory::{
    InMemoryPushDelegate, InMemoryPushDelegateFactory, DEFAULT_BUFFER_CAPACITY,
    MEMORY_DELEGATE_TYPE,
};

/// An active push delegate for one realm.
#[async_trait]
pub trait PushDelegate: Send + Sync {
    /// Transmit a message to the provider.
    ///
    /// Must be safe for concurrent invocation. Failures surface to the
    /// sender as [`PushlineError::Transmission`](crate::error::PushlineError::Transmission);
    /// the registry never retries.
    async fn send(&self, message: &PushMessage) -> Result<()>;

    /// Bring up whatever services the delegate needs (connections,
    /// background tasks). Called exactly once, before the delegate
    /// becomes visible to senders.
    async fn start(&self) -> Result<()>;

    /// Tear down the delegate's resources. Called exactly once, after
    /// the delegate has been superseded. A closed delegate is never
    /// reused.
    async fn close(&self) -> Result<()>;

    /// Whether `config` differs from the running configuration in a
    /// connection-relevant way, so that this delegate must be torn down
    /// and replaced rather than updated in place.
    ///
    /// The predicate lives on the delegate because only the backend
    /// implementation knows which properties require teardown and which
    /// are cosmetic.
    fn requires_replacement(&self, config: &DelegateConfig) -> bool;

    /// Apply a non-structural configuration change to the live
    /// delegate. Only called when [`requires_replacement`](Self::requires_replacement)
    /// returned `false` for `config`.
    async fn update_config(&self, config: &DelegateConfig) -> Result<()>;
}

/// Produces delegate instances from configuration.
///
/// One factory instance exists per delegate type for the process
/// lifetime; the registry caches it on first use.
#[async_trait]
pub trait DelegateFactory: Send + Sync {
    /// The delegate type identifier this factory handles.
    fn type_name(&self) -> &str;

    /// Produce a delegate for the given configuration.
    ///
    /// Returning `Ok(None)` means the configuration cannot yield a
    /// usable delegate; the registry treats that as a definite
    /// provisioning error, never as "no change needed".
    async fn produce(&self, config: &DelegateConfig) -> Result<Option<Arc<dyn PushDelegate>>>;
}
