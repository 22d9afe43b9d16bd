//! Assertion helpers for routed results.

use hyperdrive_persistence::router::{RouterEvent, RoutedResult};
use hyperdrive_persistence::types::{ProviderType, SaveMode};
use tokio::sync::broadcast;

/// Asserts the attempt sequence, as (provider, mode) pairs.
pub fn assert_attempts(result: &RoutedResult, expected: &[(ProviderType, SaveMode)]) {
    let actual: Vec<(ProviderType, SaveMode)> = result
        .attempts()
        .iter()
        .map(|a| (a.provider(), a.mode()))
        .collect();
    assert_eq!(actual, expected, "unexpected attempt sequence");
}

/// Asserts a successful save with the given warning count.
pub fn assert_saved(result: &RoutedResult, warnings: usize) {
    assert!(
        !result.is_error(),
        "expected success, got: {}",
        result.message()
    );
    assert!(result.is_saved());
    assert!(result.payload().is_some());
    assert_eq!(
        result.warning_count(),
        warnings,
        "inner messages: {:?}",
        result.inner_messages()
    );
}

/// Asserts a failed call.
pub fn assert_failed(result: &RoutedResult) {
    assert!(result.is_error(), "expected failure, got: {}", result.message());
    assert!(!result.is_saved());
    assert!(result.payload().is_none());
}

/// Receives the next router event.
pub async fn next_event(rx: &mut broadcast::Receiver<RouterEvent>) -> RouterEvent {
    rx.recv().await.expect("router event")
}
