// # torwaf-core
//
// Core library for keeping a WAF IP set in sync with the public Tor
// exit-node feeds.
//
// ## Architecture Overview
//
// - **AddressFeed**: Trait for fetching exit-node addresses from a source
// - **IpSetService**: Trait for reading and replacing the managed IP set
// - **Notifier**: Trait for publishing run reports
// - **IpSetLocator**: Finds the IP set by name across paginated listings
// - **Reconciler**: Orchestrates fetch → merge → locate → compare → update → report
// - **ComponentRegistry**: Plugin-based registry for feeds, services and notifiers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from service adapters
// 2. **Write Safety**: Nothing is written unless every feed and the lookup succeeded
// 3. **Idempotency**: An unchanged feed never produces a write
// 4. **Fail Loud**: No retries; every failure reaches the caller with its kind
// 5. **Library-First**: All core functionality can be used as a library

pub mod address;
pub mod config;
pub mod error;
pub mod locator;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod traits;

// Re-export core types for convenience
pub use address::{Address, AddressSet, merge};
pub use config::{FeedConfig, IpSetConfig, NotifierConfig, ProviderConfig, SyncConfig};
pub use error::{Error, Result};
pub use locator::IpSetLocator;
pub use reconciler::Reconciler;
pub use registry::ComponentRegistry;
pub use report::{Notification, ReconciliationResult, RunReport};
pub use traits::{AddressFeed, IpSetService, Notifier, Scope};
