//! Detached work tests.
//!
//! Covers fire-and-forget replication, load-balance writes and background
//! retries, observed through router events.
//!
//! Run with: `cargo test -p hyperdrive-persistence --test detached_tests`

mod common;

use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use hyperdrive_persistence::config::BackgroundRetryConfig;
use hyperdrive_persistence::router::{RouterEvent, SaveOptions};
use hyperdrive_persistence::types::{AutoMode, SaveMode};

use common::*;

fn retry_policy() -> BackgroundRetryConfig {
    BackgroundRetryConfig {
        enabled: true,
        max_attempts: 3,
        interval: Duration::from_secs(5),
    }
}

// ============================================================================
// Detached Replication
// ============================================================================

#[tokio::test]
async fn test_detached_replication_reports_through_events() {
    let t = router_with(
        quiet_config(&[A, B, C]).build().unwrap(),
        &[
            (A, Behavior::Succeed),
            (B, Behavior::Reject("read only")),
            (C, Behavior::Succeed),
        ],
    );
    let mut rx = t.router.subscribe();
    let record = identity_record("alice");

    let result = t
        .router
        .save(
            record.clone(),
            SaveOptions::new().with_replication(AutoMode::Enabled),
        )
        .await
        .unwrap();

    assert_saved(&result, 0);
    assert_eq!(result.attempts().len(), 1);

    match next_event(&mut rx).await {
        RouterEvent::ReplicationCompleted(report) => {
            assert_eq!(report.record_id(), record.id());
            assert_eq!(report.source(), A);
            assert_eq!(report.succeeded(), vec![C]);
            assert_eq!(report.failed(), vec![B]);
            assert!(
                report
                    .outcomes()
                    .iter()
                    .all(|o| o.mode() == SaveMode::AutoReplication)
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(t.provider(C).stored(record.id()).is_some());
}

#[tokio::test]
async fn test_global_replication_switch_is_honored() {
    let t = router_with(
        quiet_config(&[A, B]).auto_replication(true).build().unwrap(),
        &[(A, Behavior::Succeed), (B, Behavior::Succeed)],
    );

    let result = t
        .router
        .save(identity_record("bob"), SaveOptions::new().wait_for_replication(true))
        .await
        .unwrap();
    assert_eq!(result.attempts().len(), 2);

    let result = t
        .router
        .save(
            identity_record("bob"),
            SaveOptions::new()
                .with_replication(AutoMode::Disabled)
                .wait_for_replication(true),
        )
        .await
        .unwrap();
    assert_eq!(result.attempts().len(), 1);
}

// ============================================================================
// Load Balancing
// ============================================================================

#[tokio::test]
async fn test_load_balance_writes_to_selected_provider() {
    let t = router_with(
        quiet_config(&[A])
            .auto_load_balance(true)
            .load_balance_list([D])
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed), (D, Behavior::Succeed)],
    );
    let mut rx = t.router.subscribe();
    let record = identity_record("carol");

    let result = t.router.save(record.clone(), SaveOptions::new()).await.unwrap();
    assert_saved(&result, 0);

    match next_event(&mut rx).await {
        RouterEvent::LoadBalanced {
            record_id,
            provider,
            message,
        } => {
            assert_eq!(record_id, record.id());
            assert_eq!(provider, D);
            assert_eq!(
                message,
                "Auto-load balanced to neo4j provider for optimal performance"
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(t.provider(D).stored(record.id()).is_some());
}

#[tokio::test]
async fn test_load_balance_failure_is_reported() {
    let t = router_with(
        quiet_config(&[A])
            .auto_load_balance(true)
            .load_balance_list([D])
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed), (D, Behavior::Reject("overloaded"))],
    );
    let mut rx = t.router.subscribe();

    let result = t
        .router
        .save(identity_record("dave"), SaveOptions::new())
        .await
        .unwrap();
    assert_saved(&result, 0);

    match next_event(&mut rx).await {
        RouterEvent::LoadBalanceFailed {
            provider, reason, ..
        } => {
            assert_eq!(provider, D);
            assert!(reason.contains("overloaded"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_load_balance_skips_provider_holding_record() {
    let t = router_with(
        quiet_config(&[A])
            .auto_load_balance(true)
            .load_balance_list([A])
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed)],
    );
    let mut rx = t.router.subscribe();

    t.router
        .save(identity_record("erin"), SaveOptions::new())
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
    assert!(next.is_err(), "no load-balance event expected");
    assert_eq!(t.provider(A).saves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_balance_skips_replication_targets() {
    let t = router_with(
        quiet_config(&[A, B])
            .auto_load_balance(true)
            .load_balance_list([B])
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed), (B, Behavior::Succeed)],
    );
    let mut rx = t.router.subscribe();

    t.router
        .save(
            identity_record("frank"),
            SaveOptions::new()
                .with_replication(AutoMode::Enabled)
                .wait_for_replication(true),
        )
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
    assert!(next.is_err(), "no load-balance event expected");
    assert_eq!(t.save_counts(&[A, B]), vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_load_balance_disabled_per_call() {
    let t = router_with(
        quiet_config(&[A])
            .auto_load_balance(true)
            .load_balance_list([D])
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed), (D, Behavior::Succeed)],
    );

    t.router
        .save(
            identity_record("grace"),
            SaveOptions::new().with_load_balance(AutoMode::Disabled),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(t.provider(D).saves(), 0);
}

// ============================================================================
// Background Retry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_background_retry_exhaustion() {
    let t = router_with(
        quiet_config(&[A, B])
            .background_retry(retry_policy())
            .build()
            .unwrap(),
        &[(A, Behavior::Reject("down")), (B, Behavior::Reject("down"))],
    );
    let mut rx = t.router.subscribe();
    let record = identity_record("heidi");
    let started = tokio::time::Instant::now();

    let result = t.router.save(record.clone(), SaveOptions::new()).await.unwrap();
    assert_failed(&result);
    assert_eq!(t.save_counts(&[A, B]), vec![1, 1]);

    for expected in 1..=3 {
        match next_event(&mut rx).await {
            RouterEvent::RetryAttemptFailed {
                record_id,
                attempt,
                message,
            } => {
                assert_eq!(record_id, record.id());
                assert_eq!(attempt, expected);
                assert!(message.starts_with("All registered providers"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    match next_event(&mut rx).await {
        RouterEvent::RetryExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(started.elapsed() >= Duration::from_secs(15));
    assert_eq!(t.save_counts(&[A, B]), vec![4, 4]);
    assert!(result.is_error());
}

#[tokio::test(start_paused = true)]
async fn test_background_retry_stops_at_first_success() {
    let t = router_with(
        quiet_config(&[A, B])
            .background_retry(retry_policy())
            .build()
            .unwrap(),
        &[(A, Behavior::Succeed), (B, Behavior::Reject("down"))],
    );
    t.provider(A).then(Behavior::Reject("warming up"));
    let mut rx = t.router.subscribe();
    let record = identity_record("ivan");

    let result = t.router.save(record.clone(), SaveOptions::new()).await.unwrap();
    assert_failed(&result);

    match next_event(&mut rx).await {
        RouterEvent::RetrySucceeded {
            record_id,
            attempt,
            provider,
        } => {
            assert_eq!(record_id, record.id());
            assert_eq!(attempt, 1);
            assert_eq!(provider, Some(A));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(t.provider(A).saves(), 2);
    assert!(t.provider(A).stored(record.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_background_retries() {
    let t = router_with(
        quiet_config(&[A])
            .background_retry(retry_policy())
            .build()
            .unwrap(),
        &[(A, Behavior::Reject("down"))],
    );
    let mut rx = t.router.subscribe();

    let result = t
        .router
        .save(identity_record("judy"), SaveOptions::new())
        .await
        .unwrap();
    assert_failed(&result);

    t.router.shutdown();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(t.provider(A).saves(), 1);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_no_retry_when_disabled() {
    let t = router_with(
        quiet_config(&[A]).build().unwrap(),
        &[(A, Behavior::Reject("down"))],
    );

    t.router
        .save(identity_record("mallory"), SaveOptions::new())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(t.provider(A).saves(), 1);
}
