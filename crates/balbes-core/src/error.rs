// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Balbes chat agent.

use strum::Display;
use thiserror::Error;

/// Classification of a failed provider call.
///
/// Drives the model fallback chain: retryable kinds move on to the next
/// model, everything else aborts the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP 429 or an explicit rate-limit response.
    RateLimited,
    /// The request did not complete within the configured bound.
    Timeout,
    /// Transient server-side failure (5xx, 529, dropped connection).
    Transient,
    /// Missing or rejected credentials (401/403).
    Auth,
    /// The provider rejected the request shape (400/404/422).
    InvalidRequest,
    /// Anything that does not fit the buckets above.
    Other,
}

impl ProviderErrorKind {
    /// Whether a failure of this kind should fall through to the next model.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::Transient)
    }

    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            408 => Self::Timeout,
            500..=599 => Self::Transient,
            401 | 403 => Self::Auth,
            400 | 404 | 409 | 413 | 422 => Self::InvalidRequest,
            _ => Self::Other,
        }
    }
}

/// The primary error type used across all Balbes adapter traits and core operations.
#[derive(Debug, Error)]
pub enum BalbesError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, rejected send, download failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model provider errors, tagged with a retry classification.
    #[error("provider error ({kind}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BalbesError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the generation fallback chain may continue past this error.
    ///
    /// Timeouts are always retryable; provider errors defer to their kind.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { kind, .. } => kind.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(ProviderErrorKind::from_status(429), ProviderErrorKind::RateLimited);
        assert_eq!(ProviderErrorKind::from_status(503), ProviderErrorKind::Transient);
        assert_eq!(ProviderErrorKind::from_status(529), ProviderErrorKind::Transient);
        assert_eq!(ProviderErrorKind::from_status(401), ProviderErrorKind::Auth);
        assert_eq!(ProviderErrorKind::from_status(400), ProviderErrorKind::InvalidRequest);
        assert_eq!(ProviderErrorKind::from_status(302), ProviderErrorKind::Other);
    }

    #[test]
    fn retryable_kinds() {
        assert!(ProviderErrorKind::RateLimited.is_retryable());
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(ProviderErrorKind::Transient.is_retryable());
        assert!(!ProviderErrorKind::Auth.is_retryable());
        assert!(!ProviderErrorKind::InvalidRequest.is_retryable());
        assert!(!ProviderErrorKind::Other.is_retryable());
    }

    #[test]
    fn error_retryability() {
        let timeout = BalbesError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(timeout.is_retryable());
        assert!(BalbesError::provider(ProviderErrorKind::Transient, "502").is_retryable());
        assert!(!BalbesError::provider(ProviderErrorKind::Auth, "bad key").is_retryable());
        assert!(!BalbesError::channel("send failed").is_retryable());
        assert!(!BalbesError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn provider_error_display_includes_kind() {
        let err = BalbesError::provider(ProviderErrorKind::RateLimited, "slow down");
        assert_eq!(err.to_string(), "provider error (rate_limited): slow down");
    }
}
