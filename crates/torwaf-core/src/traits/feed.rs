// # Address Feed Trait
//
// Defines the interface for fetching a list of exit-node addresses from an
// external source.
//
// ## Implementations
//
// - Bulk exit list (plain text): `torwaf-feed-http` crate
// - Relay directory (JSON): `torwaf-feed-http` crate
//
// ## Usage
//
// ```rust,ignore
// use torwaf_core::AddressFeed;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let feed = /* AddressFeed implementation */;
//
//     let addresses = feed.fetch().await?;
//     println!("{} returned {} addresses", feed.feed_name(), addresses.len());
//
//     Ok(())
// }
// ```

use crate::address::AddressSet;
use async_trait::async_trait;

/// Trait for address feed implementations
///
/// A feed performs exactly one fetch per call and normalizes the response
/// into an [`AddressSet`]. Individual malformed entries are dropped; only a
/// failed request or an unreadable payload is an error.
///
/// # Trust Level: Untrusted
///
/// Feeds are external integrations.
///
/// ## Allowed Capabilities
/// - ✅ One HTTP request to their configured URL per `fetch()`
/// - ✅ Parse and validate the response
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed fetch aborts the run)
/// - ❌ Cache results between calls
/// - ❌ Talk to the IP-set service or the notifier
#[async_trait]
pub trait AddressFeed: Send + Sync {
    /// Fetch the current addresses from this feed
    ///
    /// # Returns
    ///
    /// - `Ok(AddressSet)`: Every valid address the feed listed
    /// - `Err(Error::Fetch)`: Transport failure or non-2xx status
    /// - `Err(Error::Parse)`: The payload could not be read at all
    async fn fetch(&self) -> Result<AddressSet, crate::Error>;

    /// Get the feed name (for logging and error messages)
    fn feed_name(&self) -> &'static str;
}

/// Helper trait for constructing feeds from configuration
pub trait FeedFactory: Send + Sync {
    /// Create an AddressFeed instance from configuration
    fn create(
        &self,
        config: &crate::config::FeedConfig,
    ) -> Result<Box<dyn AddressFeed>, crate::Error>;
}
