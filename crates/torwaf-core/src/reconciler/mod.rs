//! Core reconciler
//!
//! The Reconciler is responsible for:
//! - Fetching every configured feed
//! - Merging the results into the desired address set
//! - Locating the managed IP set and comparing it with the desired set
//! - Replacing the IP set's addresses when they differ
//! - Reporting the outcome to the notifier, if one is configured
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ AddressFeed  │── AddressSet ──┐
//! └──────────────┘                │ merge
//! ┌──────────────┐                ▼
//! │ AddressFeed  │── AddressSet ─►┌──────────────┐
//! └──────────────┘                │  Reconciler  │
//!                                 └──────────────┘
//!                                        │
//!                    ┌───────────────────┼───────────────────┐
//!                    ▼                   ▼                   ▼
//!           ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//!           │ IpSetLocator │    │ IpSetService │    │   Notifier   │
//!           │ (list + get) │    │   (update)   │    │  (optional)  │
//!           └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch each feed in order; any failure aborts the run
//! 2. Merge the feeds into the desired set
//! 3. Locate the IP set and read its addresses and lock token
//! 4. If the CIDR sets match, stop (no write)
//! 5. Otherwise replace the addresses, guarded by the lock token
//! 6. Publish the outcome, then return it unchanged
//!
//! Nothing is retried. A stale lock token surfaces as
//! [`Error::ConcurrentModification`] and the next scheduled run starts over
//! with a fresh read.

use crate::address::{AddressSet, canonical_cidr};
use crate::config::{IpSetConfig, SyncConfig};
use crate::error::{Error, Result};
use crate::locator::IpSetLocator;
use crate::report::{FeedCount, Notification, ReconciliationResult, RunReport};
use crate::traits::{AddressFeed, IpSetService, IpSetUpdate, Notifier};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// How many merged addresses to show in debug output
const SAMPLE_SIZE: usize = 20;

/// Core reconciler
///
/// Owns the collaborators for one IP set. Each call to [`Reconciler::run()`]
/// is a complete, independent run; nothing carries over between runs.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run()`] once per scheduled invocation
/// 3. Map the returned `Result` to the host's success/failure signal
pub struct Reconciler {
    /// Feeds merged into the desired set
    feeds: Vec<Box<dyn AddressFeed>>,

    /// Remote IP-set service
    service: Box<dyn IpSetService>,

    /// Optional notification channel
    notifier: Option<Box<dyn Notifier>>,

    /// Managed IP set identity
    ip_set: IpSetConfig,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `feeds`: Feed implementations, fetched in this order
    /// - `service`: IP-set service implementation
    /// - `notifier`: Notifier, or `None` to skip notifications
    /// - `config`: torwaf configuration
    pub fn new(
        feeds: Vec<Box<dyn AddressFeed>>,
        service: Box<dyn IpSetService>,
        notifier: Option<Box<dyn Notifier>>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        if feeds.is_empty() {
            return Err(Error::config("Reconciler needs at least one feed"));
        }

        Ok(Self {
            feeds,
            service,
            notifier,
            ip_set: config.ip_set,
        })
    }

    /// Run one complete reconciliation and report it
    ///
    /// The notifier sees both successes and failures. Whatever happens
    /// while notifying, the returned value is the run's own outcome.
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        info!(
            "Starting sync of IP set {} (scope: {}, provider: {})",
            self.ip_set.name,
            self.ip_set.scope,
            self.service.provider_name()
        );

        let outcome = self.execute(started_at).await;

        match &outcome {
            Ok(report) => match report.result {
                ReconciliationResult::Updated { count } => {
                    info!("IP set {} updated, now {} addresses", self.ip_set.name, count)
                }
                ReconciliationResult::NoOp { count } => {
                    info!("IP set {} unchanged ({} addresses)", self.ip_set.name, count)
                }
            },
            Err(e) => error!("Sync of IP set {} failed [{}]: {}", self.ip_set.name, e.kind(), e),
        }

        self.notify(&outcome, started_at).await;

        outcome
    }

    async fn execute(&self, started_at: DateTime<Utc>) -> Result<RunReport> {
        let (desired, feeds) = self.fetch_all().await?;
        let merged = desired.len();
        let result = self.reconcile(&desired).await?;

        Ok(RunReport {
            ip_set: self.ip_set.name.clone(),
            result,
            feeds,
            merged,
            dry_run: self.service.is_dry_run(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Fetch every feed and merge the results
    ///
    /// Fails on the first feed error, before anything else is contacted.
    pub async fn fetch_all(&self) -> Result<(AddressSet, Vec<FeedCount>)> {
        let mut desired = AddressSet::new();
        let mut counts = Vec::with_capacity(self.feeds.len());

        for feed in &self.feeds {
            let addresses = feed.fetch().await?;
            info!("Feed {} returned {} addresses", feed.feed_name(), addresses.len());

            counts.push(FeedCount {
                feed: feed.feed_name(),
                addresses: addresses.len(),
            });
            desired = desired.merge(addresses);
        }

        info!("Merged {} unique addresses", desired.len());
        debug!(
            "First {} merged addresses: {}",
            SAMPLE_SIZE,
            desired
                .iter()
                .take(SAMPLE_SIZE)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok((desired, counts))
    }

    /// Bring the IP set in line with `desired`
    ///
    /// # Returns
    ///
    /// - `Ok(ReconciliationResult::NoOp)`: Already in sync, nothing written
    /// - `Ok(ReconciliationResult::Updated)`: Addresses replaced
    /// - `Err(Error::NotFound)`: The IP set doesn't exist
    /// - `Err(Error::ConcurrentModification)`: Lock token went stale
    /// - `Err(Error::Update)`: Write rejected for another reason
    pub async fn reconcile(&self, desired: &AddressSet) -> Result<ReconciliationResult> {
        let current = IpSetLocator::new(self.service.as_ref())
            .locate(&self.ip_set.name, self.ip_set.scope)
            .await?;

        let current_cidrs: BTreeSet<String> =
            current.addresses.iter().map(|a| canonical_cidr(a)).collect();
        let desired_cidrs = desired.to_cidr_set();

        if current_cidrs == desired_cidrs {
            debug!(
                "IP set {} already matches the feeds, skipping update",
                current.name
            );
            return Ok(ReconciliationResult::NoOp {
                count: current_cidrs.len(),
            });
        }

        let added = desired_cidrs.difference(&current_cidrs).count();
        let removed = current_cidrs.difference(&desired_cidrs).count();
        info!(
            "IP set {} differs from the feeds: {} to add, {} to remove",
            current.name, added, removed
        );

        // BTreeSet iteration is already lexicographic
        let update = IpSetUpdate {
            name: current.name,
            scope: current.scope,
            id: current.id,
            lock_token: current.lock_token,
            addresses: desired_cidrs.into_iter().collect(),
        };

        self.service.update_ip_set(&update).await?;

        if self.service.is_dry_run() {
            warn!(
                "Dry run: IP set {} was not modified, the report is simulated",
                update.name
            );
        }

        Ok(ReconciliationResult::Updated {
            count: update.addresses.len(),
        })
    }

    /// Publish the outcome of a run
    ///
    /// Notification errors are logged and swallowed.
    async fn notify(&self, outcome: &Result<RunReport>, started_at: DateTime<Utc>) {
        let Some(notifier) = &self.notifier else {
            debug!("No notifier configured, skipping notification");
            return;
        };

        let notification = match outcome {
            Ok(report) => Notification::for_report(report),
            Err(e) => Notification::for_failure(
                &self.ip_set.name,
                e,
                Utc::now().signed_duration_since(started_at),
            ),
        };

        match notifier
            .publish(&notification.subject, &notification.message)
            .await
        {
            Ok(()) => debug!("Notification sent via {}", notifier.notifier_name()),
            Err(e) => warn!(
                "Failed to send notification via {}: {}",
                notifier.notifier_name(),
                e
            ),
        }
    }
}
