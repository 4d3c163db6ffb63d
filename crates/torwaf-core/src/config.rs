//! Configuration types for the torwaf system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::traits::Scope;
use serde::{Deserialize, Serialize};

/// Default bulk exit list URL
pub const DEFAULT_BULK_LIST_URL: &str = "https://check.torproject.org/torbulkexitlist";

/// Default relay directory URL (query parameters are added by the feed)
pub const DEFAULT_RELAY_DIRECTORY_URL: &str = "https://onionoo.torproject.org/details";

/// Default region; CloudFront-scoped IP sets only live here
pub const DEFAULT_REGION: &str = "us-east-1";

/// Main torwaf configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Managed IP set
    pub ip_set: IpSetConfig,

    /// IP-set service configuration
    pub provider: ProviderConfig,

    /// Notification channel
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Feeds to merge into the desired address set
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl SyncConfig {
    /// Create a configuration for the named IP set with default feeds,
    /// WAFv2 in the default region, and notifications disabled
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            ip_set: IpSetConfig {
                name: name.into(),
                scope,
            },
            provider: ProviderConfig::default(),
            notifier: NotifierConfig::default(),
            feeds: default_feeds(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ip_set.validate()?;
        self.provider.validate()?;
        self.notifier.validate()?;

        if self.feeds.is_empty() {
            return Err(crate::Error::config("No feeds configured"));
        }
        for feed in &self.feeds {
            feed.validate()?;
        }

        // CloudFront IP sets can only be managed through us-east-1
        if let ProviderConfig::Wafv2 { region, .. } = &self.provider
            && self.ip_set.scope == Scope::Cloudfront
            && region != DEFAULT_REGION
        {
            return Err(crate::Error::config(format!(
                "CLOUDFRONT scope requires region {}, got {}",
                DEFAULT_REGION, region
            )));
        }

        Ok(())
    }
}

/// Identity of the managed IP set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSetConfig {
    /// IP set name
    pub name: String,

    /// Deployment scope
    pub scope: Scope,
}

impl IpSetConfig {
    /// Validate the IP set identity
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("IP set name cannot be empty"));
        }

        if self.name.len() > 128 {
            return Err(crate::Error::config(format!(
                "IP set name too long: {} chars (max 128)",
                self.name.len()
            )));
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::config(format!(
                "IP set name '{}' contains invalid characters. Valid: A-Z a-z 0-9 - _",
                self.name
            )));
        }

        Ok(())
    }
}

/// IP-set service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// AWS WAFv2
    Wafv2 {
        /// AWS region of the WAFv2 endpoint
        region: String,
        /// Log the update instead of sending it
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Wafv2 { region, .. } => {
                if region.is_empty() {
                    return Err(crate::Error::config("WAFv2 region cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Wafv2 { .. } => "wafv2",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Wafv2 {
            region: DEFAULT_REGION.to_string(),
            dry_run: false,
        }
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// No notifications
    #[default]
    Disabled,

    /// AWS SNS topic
    Sns {
        /// Topic ARN
        topic_arn: String,
        /// Region of the topic (defaults to the region in the ARN)
        #[serde(default)]
        region: Option<String>,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Disabled => Ok(()),
            NotifierConfig::Sns { topic_arn, .. } => {
                if topic_arn.is_empty() {
                    return Err(crate::Error::config("SNS topic ARN cannot be empty"));
                }
                if !topic_arn.starts_with("arn:") {
                    return Err(crate::Error::config(format!(
                        "SNS topic ARN must start with 'arn:'. Got: {}",
                        topic_arn
                    )));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom notifier config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name, or `None` when disabled
    pub fn type_name(&self) -> Option<&str> {
        match self {
            NotifierConfig::Disabled => None,
            NotifierConfig::Sns { .. } => Some("sns"),
            NotifierConfig::Custom { factory, .. } => Some(factory),
        }
    }
}

/// Feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedConfig {
    /// Plain-text list, one address per line
    BulkList {
        /// URL to fetch
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// JSON relay directory with per-relay exit addresses
    RelayDirectory {
        /// URL to fetch (without query string)
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom feed
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl FeedConfig {
    /// Validate the feed configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FeedConfig::BulkList { url, timeout_secs }
            | FeedConfig::RelayDirectory { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Feed URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Feed URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if !(1..=300).contains(timeout_secs) {
                    return Err(crate::Error::config(format!(
                        "Feed timeout must be between 1 and 300 seconds. Got: {}",
                        timeout_secs
                    )));
                }
                Ok(())
            }
            FeedConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom feed factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom feed config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the feed type name
    pub fn type_name(&self) -> &str {
        match self {
            FeedConfig::BulkList { .. } => "bulk_list",
            FeedConfig::RelayDirectory { .. } => "relay_directory",
            FeedConfig::Custom { factory, .. } => factory,
        }
    }
}

/// The two public exit-node feeds
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::BulkList {
            url: DEFAULT_BULK_LIST_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        },
        FeedConfig::RelayDirectory {
            url: DEFAULT_RELAY_DIRECTORY_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        },
    ]
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::new("Tor-IPSet", Scope::Cloudfront);
        assert!(config.validate().is_ok());
        assert_eq!(config.feeds.len(), 2);
        assert!(matches!(config.notifier, NotifierConfig::Disabled));
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert!(SyncConfig::new("", Scope::Regional).validate().is_err());
        assert!(SyncConfig::new("tor ip set", Scope::Regional).validate().is_err());
        assert!(
            SyncConfig::new("a".repeat(129), Scope::Regional)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_cloudfront_requires_us_east_1() {
        let mut config = SyncConfig::new("Tor-IPSet", Scope::Cloudfront);
        config.provider = ProviderConfig::Wafv2 {
            region: "eu-west-1".to_string(),
            dry_run: false,
        };
        assert!(config.validate().is_err());

        config.ip_set.scope = Scope::Regional;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_feed_validation() {
        let bad_scheme = FeedConfig::BulkList {
            url: "ftp://example.com/list".to_string(),
            timeout_secs: 30,
        };
        assert!(bad_scheme.validate().is_err());

        let bad_timeout = FeedConfig::RelayDirectory {
            url: DEFAULT_RELAY_DIRECTORY_URL.to_string(),
            timeout_secs: 0,
        };
        assert!(bad_timeout.validate().is_err());

        let mut config = SyncConfig::new("Tor-IPSet", Scope::Cloudfront);
        config.feeds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sns_topic_validation() {
        let ok = NotifierConfig::Sns {
            topic_arn: "arn:aws:sns:us-east-1:123456789012:tor-ipset".to_string(),
            region: None,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.type_name(), Some("sns"));

        let bad = NotifierConfig::Sns {
            topic_arn: "tor-ipset".to_string(),
            region: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SyncConfig = serde_json::from_value(serde_json::json!({
            "ip_set": { "name": "Tor-IPSet", "scope": "CLOUDFRONT" },
            "provider": { "type": "wafv2", "region": "us-east-1" }
        }))
        .unwrap();

        assert_eq!(config.feeds.len(), 2);
        assert!(matches!(
            config.provider,
            ProviderConfig::Wafv2 { dry_run: false, .. }
        ));
        assert!(config.validate().is_ok());
    }
}
