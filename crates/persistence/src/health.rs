//! Call health tracking for storage providers.
//!
//! Every provider call made by the router is recorded here: response time on
//! success, the error on failure, and the number of calls still in flight.
//! Load-balance selection reads these statistics.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hyperdrive_persistence::config::HealthConfig;
//! use hyperdrive_persistence::health::HealthMonitor;
//! use hyperdrive_persistence::types::ProviderType;
//!
//! let monitor = HealthMonitor::new(HealthConfig::default());
//! monitor.record_success(ProviderType::MongoDb, Duration::from_millis(12));
//!
//! assert!(monitor.is_healthy(ProviderType::MongoDb));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::HealthConfig;
use crate::types::ProviderType;

const RESPONSE_SAMPLES: usize = 10;

/// Health status for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderHealthStatus {
    /// Provider identifier.
    pub provider: ProviderType,

    /// Whether the provider is currently healthy.
    pub is_healthy: bool,

    /// Last successful call.
    pub last_success: Option<Instant>,

    /// Last failed call.
    pub last_failure: Option<Instant>,

    /// Consecutive failure count.
    pub consecutive_failures: u32,

    /// Consecutive success count.
    pub consecutive_successes: u32,

    /// Last error message (if any).
    pub last_error: Option<String>,

    /// Average response time in milliseconds.
    pub avg_response_time_ms: f64,

    /// Calls currently running against the provider.
    pub in_flight: u32,

    /// Total calls recorded.
    pub total_calls: u64,

    /// Total failed calls recorded.
    pub total_failures: u64,

    /// Response time samples for averaging.
    response_times: Vec<u64>,
}

impl ProviderHealthStatus {
    /// Creates a new health status for a provider.
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            is_healthy: true,
            last_success: None,
            last_failure: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_error: None,
            avg_response_time_ms: 0.0,
            in_flight: 0,
            total_calls: 0,
            total_failures: 0,
            response_times: Vec::with_capacity(RESPONSE_SAMPLES),
        }
    }

    /// Records a successful call.
    pub fn record_success(&mut self, response_time_ms: u64) {
        self.last_success = Some(Instant::now());
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.total_calls += 1;

        self.response_times.push(response_time_ms);
        if self.response_times.len() > RESPONSE_SAMPLES {
            self.response_times.remove(0);
        }
        self.avg_response_time_ms = self.response_times.iter().map(|&t| t as f64).sum::<f64>()
            / self.response_times.len() as f64;
    }

    /// Records a failed call.
    pub fn record_failure(&mut self, error: String) {
        self.last_failure = Some(Instant::now());
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_error = Some(error);
        self.total_calls += 1;
        self.total_failures += 1;
    }

    /// Returns true once at least one response time has been sampled.
    pub fn has_samples(&self) -> bool {
        !self.response_times.is_empty()
    }

    /// Updates healthy status based on thresholds.
    pub fn update_health(&mut self, failure_threshold: u32, success_threshold: u32) {
        if self.consecutive_failures >= failure_threshold {
            if self.is_healthy {
                warn!(
                    provider = %self.provider,
                    failures = self.consecutive_failures,
                    "Provider marked unhealthy"
                );
            }
            self.is_healthy = false;
        } else if self.consecutive_successes >= success_threshold {
            if !self.is_healthy {
                info!(
                    provider = %self.provider,
                    successes = self.consecutive_successes,
                    "Provider recovered"
                );
            }
            self.is_healthy = true;
        }
    }

    /// Returns how long since the last successful call.
    pub fn time_since_success(&self) -> Option<Duration> {
        self.last_success.map(|t| t.elapsed())
    }
}

type StatusMap = Arc<RwLock<HashMap<ProviderType, ProviderHealthStatus>>>;

/// Shared health statistics for all providers.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    status: StatusMap,
}

impl HealthMonitor {
    /// Creates a new health monitor.
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            status: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Marks a call as started. The call counts as in flight until the
    /// returned guard is dropped.
    pub fn begin_call(&self, provider: ProviderType) -> InFlightGuard {
        self.status
            .write()
            .entry(provider)
            .or_insert_with(|| ProviderHealthStatus::new(provider))
            .in_flight += 1;

        InFlightGuard {
            provider,
            status: self.status.clone(),
        }
    }

    /// Records a successful call.
    pub fn record_success(&self, provider: ProviderType, elapsed: Duration) {
        let mut status_map = self.status.write();
        let status = status_map
            .entry(provider)
            .or_insert_with(|| ProviderHealthStatus::new(provider));
        status.record_success(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        status.update_health(self.config.failure_threshold, self.config.success_threshold);
    }

    /// Records a failed call.
    pub fn record_failure(&self, provider: ProviderType, error: impl Into<String>) {
        let mut status_map = self.status.write();
        let status = status_map
            .entry(provider)
            .or_insert_with(|| ProviderHealthStatus::new(provider));
        status.record_failure(error.into());
        status.update_health(self.config.failure_threshold, self.config.success_threshold);
    }

    /// Gets the health status for a provider.
    pub fn status(&self, provider: ProviderType) -> Option<ProviderHealthStatus> {
        self.status.read().get(&provider).cloned()
    }

    /// Gets the health status for all providers seen so far.
    pub fn all_status(&self) -> HashMap<ProviderType, ProviderHealthStatus> {
        self.status.read().clone()
    }

    /// Returns true unless the provider has crossed the failure threshold.
    ///
    /// Providers that have never been called are considered healthy.
    pub fn is_healthy(&self, provider: ProviderType) -> bool {
        self.status
            .read()
            .get(&provider)
            .map(|s| s.is_healthy)
            .unwrap_or(true)
    }

    /// Returns the number of calls in flight against a provider.
    pub fn in_flight(&self, provider: ProviderType) -> u32 {
        self.status
            .read()
            .get(&provider)
            .map(|s| s.in_flight)
            .unwrap_or(0)
    }

    /// Returns the rolling average response time, if any samples exist.
    pub fn avg_response_time_ms(&self, provider: ProviderType) -> Option<f64> {
        self.status
            .read()
            .get(&provider)
            .filter(|s| s.has_samples())
            .map(|s| s.avg_response_time_ms)
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

/// Decrements a provider's in-flight count on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    provider: ProviderType,
    status: StatusMap,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(status) = self.status.write().get_mut(&self.provider) {
            status.in_flight = status.in_flight.saturating_sub(1);
        }
    }
}
