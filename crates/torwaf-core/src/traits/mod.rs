//! Core traits for the torwaf system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressFeed`]: Fetch exit-node addresses from an external source
//! - [`IpSetService`]: Read and replace the managed IP set
//! - [`Notifier`]: Publish run reports

pub mod feed;
pub mod ip_set_service;
pub mod notifier;

pub use feed::{AddressFeed, FeedFactory};
pub use ip_set_service::{
    IpSetPage, IpSetService, IpSetServiceFactory, IpSetSummary, IpSetUpdate, LockToken,
    ManagedIpSet, Scope,
};
pub use notifier::{Notifier, NotifierFactory};
