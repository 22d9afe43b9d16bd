//! Error types for the persistence router.
//!
//! Two layers are kept apart:
//!
//! - [`ProviderError`] describes a single provider call failing. These never
//!   escape the router; they are folded into attempt outcomes and surface as
//!   warnings or as an error result.
//! - [`RouterError`] describes conditions the caller must handle itself:
//!   malformed input, cancellation and configuration problems.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::types::ProviderType;

/// Failure of one provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not be activated or is not registered.
    #[error("provider {provider} is unavailable: {message}")]
    Unavailable {
        provider: ProviderType,
        message: String,
    },

    /// The call did not complete before its deadline.
    #[error("timeout occurred after {}", format_timeout(.timeout))]
    Timeout {
        provider: ProviderType,
        timeout: Duration,
    },

    /// The provider reported an explicit error.
    #[error("provider {provider} rejected the request: {message}")]
    Rejected {
        provider: ProviderType,
        message: String,
    },

    /// The provider has no record with the requested identifier.
    #[error("record {id} not found in provider {provider}")]
    NotFound { provider: ProviderType, id: Uuid },
}

impl ProviderError {
    /// Creates an unavailable error.
    pub fn unavailable(provider: ProviderType, message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            provider,
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(provider: ProviderType, message: impl Into<String>) -> Self {
        ProviderError::Rejected {
            provider,
            message: message.into(),
        }
    }

    /// Returns the provider the error came from.
    pub fn provider(&self) -> ProviderType {
        match self {
            ProviderError::Unavailable { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Rejected { provider, .. }
            | ProviderError::NotFound { provider, .. } => *provider,
        }
    }

    /// Returns true for deadline failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

/// Errors surfaced to callers of the router.
///
/// Provider failures are never reported through this type.
#[derive(Error, Debug)]
pub enum RouterError {
    /// The record cannot be routed (e.g. a nil identifier).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A routing strategy failed before any provider was called.
    #[error("routing strategy failed: {0}")]
    Strategy(String),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ProviderError::Timeout {
            provider: ProviderType::Ipfs,
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "timeout occurred after 10s");
        assert!(err.is_timeout());
        assert_eq!(err.provider(), ProviderType::Ipfs);
    }

    #[test]
    fn test_rejected_message_names_provider() {
        let err = ProviderError::rejected(ProviderType::Sqlite, "disk full");
        assert_eq!(
            err.to_string(),
            "provider sqlite rejected the request: disk full"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: RouterError = ConfigError::NoCurrentProvider.into();
        assert!(matches!(err, RouterError::Config(_)));
    }
}
