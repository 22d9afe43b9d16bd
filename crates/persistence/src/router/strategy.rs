//! Optional routing front door.
//!
//! A [`RoutingStrategySelector`] is consulted before failover routing when
//! [`RoutingMode::StrategyFirst`](crate::config::RoutingMode::StrategyFirst)
//! is configured. Declining, failing, or returning an error result all fall
//! back to failover routing.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::core::DynRegistry;
use crate::error::RouterResult;
use crate::types::{LoadBalancingStrategy, ProviderType, Record, RecordKind, SaveMode};

use super::invoker::TimedInvoker;
use super::options::{LoadOptions, SaveOptions};
use super::result::{Operation, ResultAggregator, RoutedResult};

/// A call offered to the front door.
#[derive(Debug, Clone)]
pub enum RoutingRequest {
    /// Save a stamped record.
    Save {
        /// The record.
        record: Record,
        /// The caller's options.
        options: SaveOptions,
    },
    /// Load a record.
    Load {
        /// Record identifier.
        id: Uuid,
        /// Record kind.
        kind: RecordKind,
        /// The caller's options.
        options: LoadOptions,
    },
}

impl RoutingRequest {
    /// Returns the record identifier.
    pub fn record_id(&self) -> Uuid {
        match self {
            RoutingRequest::Save { record, .. } => record.id(),
            RoutingRequest::Load { id, .. } => *id,
        }
    }

    /// Returns the caller's preferred provider.
    pub fn preferred_provider(&self) -> Option<ProviderType> {
        match self {
            RoutingRequest::Save { options, .. } => options.provider,
            RoutingRequest::Load { options, .. } => options.provider,
        }
    }

    /// Returns the caller's cancellation token, or a fresh one.
    pub fn cancel_token(&self) -> CancellationToken {
        let cancel = match self {
            RoutingRequest::Save { options, .. } => options.cancel.as_ref(),
            RoutingRequest::Load { options, .. } => options.cancel.as_ref(),
        };
        cancel.cloned().unwrap_or_default()
    }
}

/// A routing strategy tried before failover routing.
#[async_trait]
pub trait RoutingStrategySelector: Send + Sync {
    /// Routes a request with a strategy.
    ///
    /// `Ok(None)` declines the request. Any `Err` other than cancellation,
    /// and any result with `is_error()`, is treated the same way.
    async fn try_route(
        &self,
        request: &RoutingRequest,
        strategy: LoadBalancingStrategy,
    ) -> RouterResult<Option<RoutedResult>>;
}

/// Routes each call to the registry's load-balance pick.
///
/// Makes a single attempt with no failover, replication or load balancing.
pub struct AutoStrategyRouter {
    registry: DynRegistry,
    invoker: TimedInvoker,
}

impl AutoStrategyRouter {
    /// Creates the router.
    pub fn new(registry: DynRegistry, invoker: TimedInvoker) -> Self {
        Self { registry, invoker }
    }
}

#[async_trait]
impl RoutingStrategySelector for AutoStrategyRouter {
    async fn try_route(
        &self,
        request: &RoutingRequest,
        strategy: LoadBalancingStrategy,
    ) -> RouterResult<Option<RoutedResult>> {
        let preferred = request
            .preferred_provider()
            .unwrap_or_else(|| self.registry.current_provider_type());
        let Some(target) = self.registry.select_with_strategy(strategy) else {
            debug!(strategy = %strategy, "No provider selected by routing strategy");
            return Ok(None);
        };
        let cancel = request.cancel_token();

        let mut aggregator = match request {
            RoutingRequest::Save { record, .. } => {
                let mut aggregator = ResultAggregator::new(Operation::Save, record.id());
                let outcome = self
                    .invoker
                    .save(target, record, SaveMode::FirstAttempt, &cancel)
                    .await?;
                aggregator.record(outcome);
                aggregator
            }
            RoutingRequest::Load { id, kind, .. } => {
                let mut aggregator = ResultAggregator::new(Operation::Load, *id);
                let outcome = self
                    .invoker
                    .load(target, *id, *kind, SaveMode::FirstAttempt, &cancel)
                    .await?;
                aggregator.record(outcome);
                aggregator
            }
        };

        if aggregator.has_success() && target != preferred {
            aggregator.note(format!(
                "Auto-load balanced to {target} provider for optimal performance"
            ));
        }

        Ok(Some(aggregator.finish()))
    }
}
