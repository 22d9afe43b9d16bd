//! Load-balance target selection.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::health::HealthMonitor;
use crate::types::{LoadBalancingStrategy, ProviderType};

/// Picks a provider from a candidate list.
///
/// Unhealthy candidates are skipped unless every candidate is unhealthy.
#[derive(Debug, Default)]
pub(crate) struct LoadBalanceSelector {
    cursor: AtomicUsize,
}

impl LoadBalanceSelector {
    pub(crate) fn select(
        &self,
        strategy: LoadBalancingStrategy,
        candidates: &[ProviderType],
        health: &HealthMonitor,
    ) -> Option<ProviderType> {
        if candidates.is_empty() {
            return None;
        }

        let healthy: Vec<ProviderType> = candidates
            .iter()
            .copied()
            .filter(|p| health.is_healthy(*p))
            .collect();
        let pool = if healthy.is_empty() {
            candidates.to_vec()
        } else {
            healthy
        };

        match strategy {
            LoadBalancingStrategy::RoundRobin => self.round_robin(&pool),
            LoadBalancingStrategy::LeastConnections => {
                pool.iter().copied().min_by_key(|p| health.in_flight(*p))
            }
            LoadBalancingStrategy::Performance => {
                fastest(&pool, health).or_else(|| pool.first().copied())
            }
            LoadBalancingStrategy::Auto => {
                fastest(&pool, health).or_else(|| self.round_robin(&pool))
            }
        }
    }

    fn round_robin(&self, pool: &[ProviderType]) -> Option<ProviderType> {
        if pool.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        Some(pool[index])
    }
}

/// Lowest rolling average response time among measured providers.
fn fastest(pool: &[ProviderType], health: &HealthMonitor) -> Option<ProviderType> {
    pool.iter()
        .filter_map(|p| health.avg_response_time_ms(*p).map(|ms| (*p, ms)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(CmpOrdering::Equal))
        .map(|(p, _)| p)
}
