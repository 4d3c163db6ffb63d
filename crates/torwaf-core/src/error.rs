//! Error types for the torwaf system
//!
//! This module defines all error types used throughout the crate.
//!
//! The first five variants form the run-failure taxonomy reported to
//! operators. Feed and locate failures always happen before any write, so a
//! run that fails with one of them never touched the remote IP set.

use thiserror::Error;

/// Result type alias for torwaf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the torwaf system
#[derive(Error, Debug)]
pub enum Error {
    /// Transport or HTTP failure while fetching a feed
    #[error("Fetch error ({feed}): {message}")]
    Fetch {
        /// Feed name
        feed: String,
        /// Error message
        message: String,
    },

    /// Feed payload could not be parsed at the top level
    #[error("Parse error ({feed}): {message}")]
    Parse {
        /// Feed name
        feed: String,
        /// Error message
        message: String,
    },

    /// Target IP set does not exist in the remote service
    #[error("IP set not found: {0}")]
    NotFound(String),

    /// Lock token was stale at write time
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// Remote service rejected the write for any other reason
    #[error("Update rejected: {0}")]
    Update(String),

    /// Remote service failed a list/get call
    #[error("Service error ({provider}): {message}")]
    Service {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification channel errors
    #[error("Notification error: {0}")]
    Notify(String),

}

impl Error {
    /// Create a feed fetch error
    pub fn fetch(feed: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            feed: feed.into(),
            message: message.into(),
        }
    }

    /// Create a feed parse error
    pub fn parse(feed: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            feed: feed.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a stale lock token error
    pub fn concurrent_modification(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    /// Create a rejected update error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Create a service (list/get) error
    pub fn service(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Stable short label for the failure kind
    ///
    /// Used in notification subjects and structured logs so operators can
    /// tell feed outages apart from service-side conflicts.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Fetch { .. } => "fetch",
            Error::Parse { .. } => "parse",
            Error::NotFound(_) => "not_found",
            Error::ConcurrentModification(_) => "concurrent_modification",
            Error::Update(_) => "update",
            Error::Service { .. } => "service",
            Error::Config(_) => "config",
            Error::Notify(_) => "notify",
        }
    }

    /// Whether the failure happened while writing the IP set
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Error::ConcurrentModification(_) | Error::Update(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_feed_name() {
        let err = Error::fetch("bulk-list", "HTTP 503");
        assert_eq!(err.to_string(), "Fetch error (bulk-list): HTTP 503");
    }

    #[test]
    fn test_write_failures_are_distinct() {
        assert!(Error::concurrent_modification("stale").is_write_failure());
        assert!(Error::update("limit exceeded").is_write_failure());

        assert!(!Error::fetch("bulk-list", "timeout").is_write_failure());
        assert!(!Error::parse("relay-directory", "bad json").is_write_failure());
        assert!(!Error::not_found("Tor-IPSet").is_write_failure());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::not_found("x").kind(), "not_found");
        assert_eq!(
            Error::concurrent_modification("x").kind(),
            "concurrent_modification"
        );
        assert_eq!(Error::service("wafv2", "denied").kind(), "service");
    }

    #[test]
    fn test_boxes_as_std_error() {
        // Callers propagate with `?` into anyhow or boxed errors
        let boxed: Box<dyn std::error::Error + Send + Sync> = Error::config("bad scope").into();
        assert_eq!(boxed.to_string(), "Configuration error: bad scope");
    }
}
