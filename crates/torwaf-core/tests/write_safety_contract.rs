//! Contract Test: Write Safety
//!
//! Constraints verified:
//! - A failed feed aborts the run before the IP-set service is contacted
//! - Feeds after the failing one are not fetched
//! - The failure kind identifies the feed outage
//!
//! If this test fails, a feed outage could empty the IP set.

mod common;

use common::*;
use std::sync::Arc;
use torwaf_core::Error;

#[tokio::test]
async fn failing_first_feed_aborts_before_service_calls() {
    let service = MockIpSetService::new(&["1.2.3.4/32"]);
    let second = Arc::new(StaticFeed::new("relay-directory", &["5.6.7.8"]));

    let result = reconciler(
        vec![
            Box::new(StaticFeed::failing("bulk-list")),
            Box::new(StaticFeed::sharing_counters_with(&second)),
        ],
        &service,
        None,
    )
    .run()
    .await;

    let err = result.expect_err("feed failure must fail the run");
    assert!(matches!(err, Error::Fetch { ref feed, .. } if feed == "bulk-list"));
    assert!(!err.is_write_failure());

    assert_eq!(second.fetch_call_count(), 0, "Later feeds must not be fetched");
    assert_eq!(service.list_call_count(), 0);
    assert_eq!(service.get_call_count(), 0);
    assert_eq!(service.update_call_count(), 0);
    assert_eq!(service.addresses(), vec!["1.2.3.4/32"]);
}

#[tokio::test]
async fn failing_second_feed_aborts_before_service_calls() {
    let service = MockIpSetService::new(&["1.2.3.4/32"]);

    let result = reconciler(
        vec![
            Box::new(StaticFeed::new("bulk-list", &["1.2.3.4", "5.6.7.8"])),
            Box::new(StaticFeed::failing("relay-directory")),
        ],
        &service,
        None,
    )
    .run()
    .await;

    assert!(matches!(result, Err(Error::Fetch { .. })));
    assert_eq!(service.list_call_count(), 0);
    assert_eq!(service.update_call_count(), 0);
}

#[tokio::test]
async fn each_feed_is_fetched_once_per_run() {
    let service = MockIpSetService::new(&[]);
    let bulk = Arc::new(StaticFeed::new("bulk-list", &["1.2.3.4"]));
    let relays = Arc::new(StaticFeed::new("relay-directory", &["5.6.7.8"]));

    reconciler(
        vec![
            Box::new(StaticFeed::sharing_counters_with(&bulk)),
            Box::new(StaticFeed::sharing_counters_with(&relays)),
        ],
        &service,
        None,
    )
    .run()
    .await
    .expect("run succeeds");

    assert_eq!(bulk.fetch_call_count(), 1);
    assert_eq!(relays.fetch_call_count(), 1);
}
