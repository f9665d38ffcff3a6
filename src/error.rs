//! Error types for Pushline
//!
//! A single error enum covers the whole crate. Provisioning errors are
//! specific about which stage failed (configuration resolution, factory
//! instantiation, delegate production) so that operators can tell a
//! missing realm configuration apart from a broken delegate type.

use thiserror::Error;

/// Result type alias for Pushline operations
pub type Result<T> = std::result::Result<T, PushlineError>;

/// Main error type for Pushline
#[derive(Debug, Error)]
pub enum PushlineError {
    /// The config provider could not supply a delegate configuration
    /// for the realm.
    #[error("unable to resolve push configuration for realm '{realm}': {detail}")]
    ConfigResolution { realm: String, detail: String },

    /// The delegate type identifier is unknown, or its factory builder
    /// failed.
    #[error("unable to instantiate delegate factory '{delegate_type}': {detail}")]
    FactoryInstantiation { delegate_type: String, detail: String },

    /// A factory yielded no usable delegate. Treated as a definite
    /// error, never as "no change needed".
    #[error("delegate factory '{delegate_type}' produced no usable delegate: {detail}")]
    NullDelegate { delegate_type: String, detail: String },

    /// `send` was called for a realm with no installable delegate. The
    /// underlying provisioning failure, if any, is chained as the
    /// source.
    #[error("no push delegate configured for realm '{realm}'")]
    NoDelegateConfigured {
        realm: String,
        #[source]
        source: Option<Box<PushlineError>>,
    },

    /// The active delegate failed to deliver a message. Surfaced to the
    /// sender verbatim; the registry never retries.
    #[error("push transmission failed: {0}")]
    Transmission(String),

    /// The superseded delegate failed to release its resources during a
    /// replacement. The new delegate stays active regardless.
    #[error("error closing superseded delegate for realm '{realm}': {detail}")]
    DelegateClose { realm: String, detail: String },
}

impl PushlineError {
    pub fn config_resolution(realm: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConfigResolution {
            realm: realm.into(),
            detail: detail.into(),
        }
    }

    pub fn factory_instantiation(
        delegate_type: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::FactoryInstantiation {
            delegate_type: delegate_type.into(),
            detail: detail.into(),
        }
    }

    pub fn null_delegate(delegate_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NullDelegate {
            delegate_type: delegate_type.into(),
            detail: detail.into(),
        }
    }

    pub fn no_delegate(realm: impl Into<String>) -> Self {
        Self::NoDelegateConfigured {
            realm: realm.into(),
            source: None,
        }
    }

    /// A `NoDelegateConfigured` carrying the provisioning failure that
    /// caused it.
    pub fn no_delegate_because(realm: impl Into<String>, cause: PushlineError) -> Self {
        Self::NoDelegateConfigured {
            realm: realm.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn transmission(detail: impl Into<String>) -> Self {
        Self::Transmission(detail.into())
    }

    pub fn delegate_close(realm: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DelegateClose {
            realm: realm.into(),
            detail: detail.into(),
        }
    }
}
