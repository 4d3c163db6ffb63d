//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record every call so the
//! tests can assert on what the reconciler did and, just as often, on what
//! it did not do.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use torwaf_core::error::{Error, Result};
use torwaf_core::traits::{
    AddressFeed, IpSetPage, IpSetService, IpSetSummary, IpSetUpdate, LockToken, ManagedIpSet,
    Notifier, Scope,
};
use torwaf_core::{Address, AddressSet, Reconciler, SyncConfig};

/// Name of the managed IP set in every test
pub const IP_SET_NAME: &str = "Tor-IPSet";

/// Build an address set from literals
pub fn addresses(items: &[&str]) -> AddressSet {
    items
        .iter()
        .map(|s| s.parse::<Address>().expect("valid test address"))
        .collect()
}

/// A feed that returns a fixed set, or fails
pub struct StaticFeed {
    name: &'static str,
    addresses: Option<AddressSet>,
    fetch_call_count: Arc<AtomicUsize>,
}

impl StaticFeed {
    pub fn new(name: &'static str, items: &[&str]) -> Self {
        Self {
            name,
            addresses: Some(addresses(items)),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A feed built from raw feed tokens; malformed ones are dropped
    pub fn from_raw(name: &'static str, tokens: &[&str]) -> Self {
        let (parsed, _dropped) = AddressSet::parse_lossy(tokens.iter().copied());
        Self {
            name,
            addresses: Some(parsed),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A feed whose fetch always fails with `Error::Fetch`
    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            addresses: None,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times fetch() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    /// Create a new StaticFeed that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            name: other.name,
            addresses: other.addresses.clone(),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
        }
    }
}

#[async_trait::async_trait]
impl AddressFeed for StaticFeed {
    async fn fetch(&self) -> Result<AddressSet> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.addresses
            .clone()
            .ok_or_else(|| Error::fetch(self.name, "HTTP error: 503 Service Unavailable"))
    }

    fn feed_name(&self) -> &'static str {
        self.name
    }
}

/// How the mock service should fail an update
#[derive(Debug, Clone, Copy)]
pub enum UpdateFailure {
    /// Another writer got there first
    StaleToken,
    /// The service refused the payload
    Rejected,
}

/// Remote IP set contents plus its lock version
#[derive(Debug, Default)]
struct RemoteState {
    addresses: Vec<String>,
    version: u64,
}

/// Every call the mock service received
#[derive(Debug, Default)]
struct CallLog {
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    update_calls: AtomicUsize,
    markers: Mutex<Vec<Option<String>>>,
    updates: Mutex<Vec<IpSetUpdate>>,
}

/// A mock IpSetService with paginated listings and optimistic locking
pub struct MockIpSetService {
    /// Summaries per page; page N+1 is reached with marker "marker-N+1"
    pages: Arc<Vec<Vec<IpSetSummary>>>,
    state: Arc<Mutex<RemoteState>>,
    calls: Arc<CallLog>,
    update_failure: Option<UpdateFailure>,
    /// Last page carries `Some("")` instead of `None`
    empty_final_marker: bool,
    /// Accept updates without applying them
    dry_run: bool,
}

fn summary(name: &str) -> IpSetSummary {
    IpSetSummary {
        name: name.to_string(),
        id: format!("id-{}", name),
    }
}

impl MockIpSetService {
    /// A service with one page holding the managed IP set and a neighbour
    pub fn new(current: &[&str]) -> Self {
        Self::paged(vec![vec!["Other-IPSet", IP_SET_NAME]], current)
    }

    /// A service whose listing is split over the given pages of names
    pub fn paged(pages: Vec<Vec<&str>>, current: &[&str]) -> Self {
        let pages = pages
            .into_iter()
            .map(|names| names.into_iter().map(summary).collect())
            .collect();

        Self {
            pages: Arc::new(pages),
            state: Arc::new(Mutex::new(RemoteState {
                addresses: current.iter().map(|s| s.to_string()).collect(),
                version: 1,
            })),
            calls: Arc::new(CallLog::default()),
            update_failure: None,
            empty_final_marker: false,
            dry_run: false,
        }
    }

    /// End the listing with an empty marker, as some services do
    pub fn ending_with_empty_marker(mut self) -> Self {
        self.empty_final_marker = true;
        self
    }

    /// Accept every update but leave the remote state untouched
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Make every update fail
    pub fn failing_updates(mut self, failure: UpdateFailure) -> Self {
        self.update_failure = Some(failure);
        self
    }

    /// Create a new MockIpSetService that shares state and counters
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            pages: Arc::clone(&other.pages),
            state: Arc::clone(&other.state),
            calls: Arc::clone(&other.calls),
            update_failure: other.update_failure,
            empty_final_marker: other.empty_final_marker,
            dry_run: other.dry_run,
        }
    }

    pub fn list_call_count(&self) -> usize {
        self.calls.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.calls.update_calls.load(Ordering::SeqCst)
    }

    /// Markers passed to list_ip_sets(), in call order
    pub fn listed_markers(&self) -> Vec<Option<String>> {
        self.calls.markers.lock().unwrap().clone()
    }

    /// Update payloads received, in call order
    pub fn updates(&self) -> Vec<IpSetUpdate> {
        self.calls.updates.lock().unwrap().clone()
    }

    /// Current remote addresses
    pub fn addresses(&self) -> Vec<String> {
        self.state.lock().unwrap().addresses.clone()
    }
}

#[async_trait::async_trait]
impl IpSetService for MockIpSetService {
    async fn list_ip_sets(&self, _scope: Scope, next_marker: Option<&str>) -> Result<IpSetPage> {
        self.calls.list_calls.fetch_add(1, Ordering::SeqCst);
        self.calls
            .markers
            .lock()
            .unwrap()
            .push(next_marker.map(str::to_string));

        let index = match next_marker {
            None => 0,
            Some(marker) => marker
                .strip_prefix("marker-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::service("mock", format!("bad marker {}", marker)))?,
        };

        let ip_sets = self.pages.get(index).cloned().unwrap_or_default();
        let next_marker = if index + 1 < self.pages.len() {
            Some(format!("marker-{}", index + 1))
        } else if self.empty_final_marker {
            Some(String::new())
        } else {
            None
        };

        Ok(IpSetPage {
            ip_sets,
            next_marker,
        })
    }

    async fn get_ip_set(&self, name: &str, scope: Scope, id: &str) -> Result<ManagedIpSet> {
        self.calls.get_calls.fetch_add(1, Ordering::SeqCst);

        if id != format!("id-{}", name) {
            return Err(Error::not_found(format!("no IP set with id {}", id)));
        }

        let state = self.state.lock().unwrap();
        Ok(ManagedIpSet {
            name: name.to_string(),
            scope,
            id: id.to_string(),
            addresses: state.addresses.clone(),
            lock_token: LockToken::new(format!("token-{}", state.version)),
        })
    }

    async fn update_ip_set(&self, update: &IpSetUpdate) -> Result<()> {
        self.calls.update_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.updates.lock().unwrap().push(update.clone());

        let mut state = self.state.lock().unwrap();

        if let Some(UpdateFailure::StaleToken) = self.update_failure {
            // Simulate a writer that landed between our read and write
            state.version += 1;
        }

        if update.lock_token.as_str() != format!("token-{}", state.version) {
            return Err(Error::concurrent_modification(
                "The lock token is no longer valid",
            ));
        }

        if let Some(UpdateFailure::Rejected) = self.update_failure {
            return Err(Error::update("Addresses exceed the IP set limit"));
        }

        if self.dry_run {
            return Ok(());
        }

        state.addresses = update.addresses.clone();
        state.version += 1;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A notifier that records what it was asked to publish
pub struct RecordingNotifier {
    published: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A notifier whose publish always fails (after recording the attempt)
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Subject/message pairs published so far
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    /// Create a new RecordingNotifier that shares its log with an existing one
    pub fn sharing_log_with(other: &Self) -> Self {
        Self {
            published: Arc::clone(&other.published),
            fail: other.fail,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), message.to_string()));

        if self.fail {
            return Err(Error::notify("topic does not exist"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new(IP_SET_NAME, Scope::Regional)
}

/// Helper to build a reconciler over shared test doubles
pub fn reconciler(
    feeds: Vec<Box<dyn AddressFeed>>,
    service: &MockIpSetService,
    notifier: Option<&RecordingNotifier>,
) -> Reconciler {
    Reconciler::new(
        feeds,
        Box::new(MockIpSetService::sharing_state_with(service)),
        notifier.map(|n| Box::new(RecordingNotifier::sharing_log_with(n)) as Box<dyn Notifier>),
        minimal_config(),
    )
    .expect("reconciler construction succeeds")
}
