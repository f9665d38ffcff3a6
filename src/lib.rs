#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Pushline
//!
//! Pushline multiplexes outbound push-notification delivery across many
//! isolated tenants ("realms"). Each realm is configured independently
//! to use its own notification backend (a different provider, different
//! credentials), and Pushline keeps one live delegate per realm,
//! provisioning it lazily on first use and hot-swapping it when the
//! realm's configuration changes.
//!
//! ## Features
//!
//! - **Realm-scoped routing**: one active delegate per realm, looked up
//!   lock-free on the send path
//! - **Lazy provisioning**: a realm's delegate is built the first time
//!   the realm is used; concurrent first senders collapse into a single
//!   provisioning attempt
//! - **Hot-swap on config change**: a change event replaces or updates
//!   the delegate in place without ever leaving the realm's delivery
//!   path empty
//! - **Pluggable backends**: delegate types are registered as factory
//!   builders under plain string identifiers; configuration never names
//!   executable code
//! - **Built-in observability**: structured `tracing` logs and atomic
//!   activity counters
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use pushline::{
//!     DelegateConfig, DelegateRegistry, InMemoryConfigProvider, PushMessage,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pushline::Result<()> {
//!     let provider = Arc::new(InMemoryConfigProvider::new());
//!     provider.insert("acme", DelegateConfig::new("console"));
//!
//!     let registry = DelegateRegistry::with_builtins(provider);
//!
//!     // First send provisions the realm's delegate, later sends reuse it.
//!     let message = PushMessage::new("device-token", "hello from pushline");
//!     registry.send(&message, "acme").await?;
//!     Ok(())
//! }
//! ```
//!
//! Provider-specific delegates implement [`PushDelegate`] and
//! [`DelegateFactory`] and are registered with
//! [`DelegateRegistry::register_delegate_type`]. Configuration changes
//! are pushed through a [`ChangeListener`] wired to the external config
//! service's event stream.

pub mod config;
pub mod delegate;
pub mod error;
pub mod listener;
pub mod message;
pub mod registry;

pub use config::{ConfigProvider, DelegateConfig, InMemoryConfigProvider};
pub use delegate::{
    ConsolePushDelegate, ConsolePushDelegateFactory, DelegateFactory, InMemoryPushDelegate,
    InMemoryPushDelegateFactory, PushDelegate, CONSOLE_DELEGATE_TYPE, MEMORY_DELEGATE_TYPE,
};
pub use error::{PushlineError, Result};
pub use listener::{
    ChangeListener, ConfigChangeEvent, ConfigChangeKind, ConfigChangeScope, RealmMapper,
};
pub use message::{MessagePriority, PushMessage};
pub use registry::{DelegateFactoryBuilder, DelegateRegistry, RegistryStatsSnapshot};
