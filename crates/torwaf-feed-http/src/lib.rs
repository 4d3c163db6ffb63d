// # HTTP Exit-Node Feeds
//
// This crate provides the two public Tor exit-node feeds for torwaf.
//
// ## Feeds
//
// - **Bulk exit list** (`bulk_list`): plain text, one address per line,
//   published by the Tor check service.
// - **Relay directory** (`relay_directory`): JSON details document listing
//   running relays with the Exit flag and the addresses they exit from.
//
// The two lists overlap heavily but neither is a superset of the other, so
// the reconciler merges both.
//
// ## Architecture
//
// Each `fetch()` makes exactly one GET request. There is no caching and no
// retry; a failed request fails the run.

use torwaf_core::ComponentRegistry;
use torwaf_core::config::FeedConfig;
use torwaf_core::traits::{AddressFeed, FeedFactory};
use torwaf_core::{AddressSet, Error, Result};

use serde::Deserialize;
use std::time::Duration;

/// Default request timeout for feed requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay directory query: running relays with the Exit flag
const RELAY_DIRECTORY_QUERY: &[(&str, &str)] = &[("flag", "Exit"), ("running", "true")];

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("torwaf/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Send a GET request and return the body of a 2xx response
async fn get_text(request: reqwest::RequestBuilder, feed: &str) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::fetch(feed, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::fetch(
            feed,
            format!("HTTP error: {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| Error::fetch(feed, format!("Failed to read response: {}", e)))
}

/// Plain-text bulk exit list
pub struct BulkListFeed {
    /// URL to fetch the list from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl BulkListFeed {
    /// Feed name used in logs and errors
    pub const NAME: &'static str = "bulk-list";

    /// Create a bulk list feed with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a bulk list feed with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl AddressFeed for BulkListFeed {
    async fn fetch(&self) -> Result<AddressSet> {
        tracing::debug!("Fetching bulk exit list from {}", self.url);

        let body = get_text(self.client.get(&self.url), Self::NAME).await?;
        let (addresses, dropped) = parse_bulk_list(&body);

        if dropped > 0 {
            tracing::warn!("Bulk exit list: dropped {} unparseable lines", dropped);
        }

        Ok(addresses)
    }

    fn feed_name(&self) -> &'static str {
        Self::NAME
    }
}

/// Parse a newline-delimited list, skipping blank lines
///
/// Returns the addresses and the number of non-blank lines that were not
/// valid addresses.
pub fn parse_bulk_list(body: &str) -> (AddressSet, usize) {
    AddressSet::parse_lossy(body.lines().map(str::trim).filter(|line| !line.is_empty()))
}

/// JSON relay directory
pub struct RelayDirectoryFeed {
    /// Base URL of the details document (query is added per request)
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl RelayDirectoryFeed {
    /// Feed name used in logs and errors
    pub const NAME: &'static str = "relay-directory";

    /// Create a relay directory feed with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a relay directory feed with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl AddressFeed for RelayDirectoryFeed {
    async fn fetch(&self) -> Result<AddressSet> {
        tracing::debug!("Fetching relay directory from {}", self.url);

        let request = self.client.get(&self.url).query(RELAY_DIRECTORY_QUERY);
        let body = get_text(request, Self::NAME).await?;
        let (addresses, dropped) = parse_relay_directory(&body)?;

        if dropped > 0 {
            tracing::warn!(
                "Relay directory: dropped {} malformed exit addresses",
                dropped
            );
        }

        Ok(addresses)
    }

    fn feed_name(&self) -> &'static str {
        Self::NAME
    }
}

#[derive(Debug, Deserialize)]
struct RelayDetails {
    #[serde(default)]
    relays: Vec<Relay>,
}

#[derive(Debug, Deserialize)]
struct Relay {
    #[serde(default)]
    exit_addresses: Vec<serde_json::Value>,
}

/// Extract every valid exit address from a relay details document
///
/// Entries that aren't strings or don't parse are dropped and counted.
/// Only a document that isn't valid JSON of the expected shape is an error.
pub fn parse_relay_directory(body: &str) -> Result<(AddressSet, usize)> {
    let details: RelayDetails = serde_json::from_str(body)
        .map_err(|e| Error::parse(RelayDirectoryFeed::NAME, format!("Invalid JSON: {}", e)))?;

    let mut non_strings = 0;
    let tokens: Vec<&str> = details
        .relays
        .iter()
        .flat_map(|relay| relay.exit_addresses.iter())
        .filter_map(|value| {
            let token = value.as_str();
            if token.is_none() {
                non_strings += 1;
            }
            token
        })
        .collect();

    let (addresses, dropped) = AddressSet::parse_lossy(tokens);
    Ok((addresses, dropped + non_strings))
}

/// Factory for creating bulk list feeds
pub struct BulkListFactory;

impl FeedFactory for BulkListFactory {
    fn create(&self, config: &FeedConfig) -> Result<Box<dyn AddressFeed>> {
        match config {
            FeedConfig::BulkList { url, timeout_secs } => Ok(Box::new(
                BulkListFeed::with_timeout(url.clone(), Duration::from_secs(*timeout_secs))?,
            )),
            _ => Err(Error::config("Invalid config for bulk list feed")),
        }
    }
}

/// Factory for creating relay directory feeds
pub struct RelayDirectoryFactory;

impl FeedFactory for RelayDirectoryFactory {
    fn create(&self, config: &FeedConfig) -> Result<Box<dyn AddressFeed>> {
        match config {
            FeedConfig::RelayDirectory { url, timeout_secs } => Ok(Box::new(
                RelayDirectoryFeed::with_timeout(url.clone(), Duration::from_secs(*timeout_secs))?,
            )),
            _ => Err(Error::config("Invalid config for relay directory feed")),
        }
    }
}

/// Register both HTTP feeds with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_feed("bulk_list", Box::new(BulkListFactory));
    registry.register_feed("relay_directory", Box::new(RelayDirectoryFactory));
}
