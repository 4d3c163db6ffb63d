//! Plugin-based component registry
//!
//! The registry allows feeds, IP-set services and notifiers to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use torwaf_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//!
//! // Implementation crates register their factories
//! torwaf_feed_http::register(&registry);
//! torwaf_provider_wafv2::register(&registry);
//!
//! // Create components from config
//! let service = registry.create_ip_set_service(&config.provider).await?;
//! ```

use crate::config::{FeedConfig, NotifierConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{AddressFeed, IpSetService, Notifier};
use crate::traits::{FeedFactory, IpSetServiceFactory, NotifierFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Component registry for plugin-based construction
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Async factories are stored behind `Arc` so
/// the lock is released before awaiting them.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered feed factories
    feeds: RwLock<HashMap<String, Box<dyn FeedFactory>>>,

    /// Registered IP-set service factories
    providers: RwLock<HashMap<String, Arc<dyn IpSetServiceFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Arc<dyn NotifierFactory>>>,
}

// A poisoned lock only means a factory panicked while registering; the map
// itself is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed factory
    ///
    /// # Parameters
    ///
    /// - `name`: Feed type name (e.g., "bulk_list", "relay_directory")
    /// - `factory`: Factory object for creating feed instances
    pub fn register_feed(&self, name: impl Into<String>, factory: Box<dyn FeedFactory>) {
        write(&self.feeds).insert(name.into(), factory);
    }

    /// Register an IP-set service factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "wafv2")
    /// - `factory`: Factory object for creating service instances
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        factory: Box<dyn IpSetServiceFactory>,
    ) {
        write(&self.providers).insert(name.into(), Arc::from(factory));
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "sns")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        write(&self.notifiers).insert(name.into(), Arc::from(factory));
    }

    /// Create a feed from configuration
    pub fn create_feed(&self, config: &FeedConfig) -> Result<Box<dyn AddressFeed>> {
        let feed_type = config.type_name();
        let feeds = read(&self.feeds);

        let factory = feeds
            .get(feed_type)
            .ok_or_else(|| Error::config(format!("Unknown feed type: {}", feed_type)))?;

        factory.create(config)
    }

    /// Create every configured feed, in order
    pub fn create_feeds(&self, configs: &[FeedConfig]) -> Result<Vec<Box<dyn AddressFeed>>> {
        configs.iter().map(|config| self.create_feed(config)).collect()
    }

    /// Create an IP-set service from configuration
    pub async fn create_ip_set_service(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn IpSetService>> {
        let provider_type = config.type_name();

        // Release the lock before calling async create
        let factory = read(&self.providers)
            .get(provider_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config).await
    }

    /// Create a notifier from configuration
    ///
    /// Returns `Ok(None)` when notifications are disabled.
    pub async fn create_notifier(
        &self,
        config: &NotifierConfig,
    ) -> Result<Option<Box<dyn Notifier>>> {
        let Some(notifier_type) = config.type_name() else {
            return Ok(None);
        };

        let factory = read(&self.notifiers)
            .get(notifier_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config).await.map(Some)
    }

    /// List all registered feed types
    pub fn list_feeds(&self) -> Vec<String> {
        read(&self.feeds).keys().cloned().collect()
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        read(&self.providers).keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        read(&self.notifiers).keys().cloned().collect()
    }

    /// Check if a feed type is registered
    pub fn has_feed(&self, name: &str) -> bool {
        read(&self.feeds).contains_key(name)
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        read(&self.providers).contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        read(&self.notifiers).contains_key(name)
    }
}
