//! Opportunistic extra write to spread read traffic.

use std::collections::HashSet;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::DynRegistry;
use crate::error::RouterResult;
use crate::types::{ProviderType, Record, SaveMode};

use super::events::{EventBus, RouterEvent};
use super::invoker::{AttemptOutcome, TimedInvoker};

/// Issues one extra write to the registry's load-balance pick.
///
/// Always runs detached. The pick is skipped when it already holds the
/// record or when the routed call touched it in any way: every provider
/// attempted during first attempt and failover, and every replication
/// target, counts as touched whether or not its write succeeded.
pub(crate) struct LoadBalanceCoordinator {
    registry: DynRegistry,
    invoker: TimedInvoker,
}

impl LoadBalanceCoordinator {
    pub(crate) fn new(registry: DynRegistry, invoker: TimedInvoker) -> Self {
        Self { registry, invoker }
    }

    async fn balance(
        &self,
        record: &Record,
        holder: ProviderType,
        touched: &HashSet<ProviderType>,
        cancel: &CancellationToken,
    ) -> RouterResult<Option<AttemptOutcome>> {
        let Some(target) = self.registry.select_load_balance_target() else {
            debug!(record_id = %record.id(), "No load-balance target available");
            return Ok(None);
        };

        if target == holder || touched.contains(&target) {
            debug!(
                record_id = %record.id(),
                provider = %target,
                "Load-balance target already holds the record"
            );
            return Ok(None);
        }

        let outcome = self
            .invoker
            .save(target, record, SaveMode::AutoLoadBalance, cancel)
            .await?;
        Ok(Some(outcome))
    }

    pub(crate) fn spawn_detached(
        self,
        record: Record,
        holder: ProviderType,
        touched: HashSet<ProviderType>,
        cancel: CancellationToken,
        events: EventBus,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let record_id = record.id();
            match self.balance(&record, holder, &touched, &cancel).await {
                Ok(Some(outcome)) if outcome.is_success() => {
                    let message = format!(
                        "Auto-load balanced to {} provider for optimal performance",
                        outcome.provider()
                    );
                    info!(record_id = %record_id, provider = %outcome.provider(), "{}", message);
                    events.emit(RouterEvent::LoadBalanced {
                        record_id,
                        provider: outcome.provider(),
                        message,
                    });
                }
                Ok(Some(outcome)) => {
                    let reason = outcome.message().unwrap_or_default().to_string();
                    warn!(
                        record_id = %record_id,
                        provider = %outcome.provider(),
                        error = %reason,
                        "Load-balance write failed"
                    );
                    events.emit(RouterEvent::LoadBalanceFailed {
                        record_id,
                        provider: outcome.provider(),
                        reason,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!(record_id = %record_id, error = %e, "Load balancing stopped"),
            }
        })
    }
}
