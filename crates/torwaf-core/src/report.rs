//! Run outcomes and the notification text derived from them

use crate::error::Error;
use chrono::{DateTime, Utc};

/// Outcome of a successful reconciliation
///
/// A failed reconciliation is the `Err` side of the surrounding `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// The IP set already matched; nothing was written
    NoOp {
        /// Addresses currently in the IP set
        count: usize,
    },
    /// The IP set was replaced
    Updated {
        /// Addresses written
        count: usize,
    },
}

impl ReconciliationResult {
    /// Number of addresses the IP set holds after the run
    pub fn count(&self) -> usize {
        match self {
            ReconciliationResult::NoOp { count } | ReconciliationResult::Updated { count } => {
                *count
            }
        }
    }

    /// Whether a write was issued
    pub fn is_update(&self) -> bool {
        matches!(self, ReconciliationResult::Updated { .. })
    }
}

/// Addresses a single feed contributed to a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCount {
    /// Feed name
    pub feed: &'static str,
    /// Valid addresses returned
    pub addresses: usize,
}

/// Summary of one complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Managed IP set name
    pub ip_set: String,
    /// Reconciliation outcome
    pub result: ReconciliationResult,
    /// Per-feed address counts, in fetch order
    pub feeds: Vec<FeedCount>,
    /// Size of the merged address set
    pub merged: usize,
    /// The service skipped the write
    pub dry_run: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

/// A subject/message pair ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short ASCII subject
    pub subject: String,
    /// Human-readable body
    pub message: String,
}

// SNS rejects subjects of 100 characters or more
const MAX_SUBJECT_LEN: usize = 99;

fn subject(text: String) -> String {
    let mut text: String = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect();
    text.truncate(MAX_SUBJECT_LEN);
    text
}

impl Notification {
    /// Notification for a successful run
    pub fn for_report(report: &RunReport) -> Self {
        let elapsed = format_duration(report.duration());

        if report.dry_run {
            return Self::for_dry_run(report, &elapsed);
        }

        match report.result {
            ReconciliationResult::Updated { count } => Self {
                subject: subject(format!("IP set {} updated", report.ip_set)),
                message: format!(
                    "IP set '{}' was updated and now has {} addresses. (run took {})",
                    report.ip_set, count, elapsed
                ),
            },
            ReconciliationResult::NoOp { count } => Self {
                subject: subject(format!("IP set {} unchanged", report.ip_set)),
                message: format!(
                    "IP set '{}' did not need an update. It still has {} addresses. (run took {})",
                    report.ip_set, count, elapsed
                ),
            },
        }
    }

    fn for_dry_run(report: &RunReport, elapsed: &str) -> Self {
        let (subject_text, outcome) = match report.result {
            ReconciliationResult::Updated { count } => (
                format!("[DRY-RUN] IP set {} would be updated", report.ip_set),
                format!("would have been updated to {} addresses", count),
            ),
            ReconciliationResult::NoOp { count } => (
                format!("[DRY-RUN] IP set {} unchanged", report.ip_set),
                format!("did not need an update. It still has {} addresses", count),
            ),
        };

        Self {
            subject: subject(subject_text),
            message: format!(
                "IP set '{}' {}. Dry run, nothing was written. (run took {})",
                report.ip_set, outcome, elapsed
            ),
        }
    }

    /// Notification for a failed run
    pub fn for_failure(ip_set: &str, error: &Error, elapsed: chrono::Duration) -> Self {
        Self {
            subject: subject(format!("IP set {} sync failed ({})", ip_set, error.kind())),
            message: format!(
                "Run failed: {} (run took {})",
                error,
                format_duration(elapsed)
            ),
        }
    }
}

fn format_duration(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}
