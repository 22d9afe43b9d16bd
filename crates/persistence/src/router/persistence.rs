//! The persistence router.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::config::{ConfigError, RouterConfig, RoutingMode};
use crate::core::{DynRegistry, ProviderRegistry};
use crate::error::{RouterError, RouterResult};
use crate::health::HealthMonitor;
use crate::registry::{ProviderManager, format_provider_list};
use crate::types::{ProviderType, Record, RecordKind, SaveMode};

use super::events::{EventBus, RouterEvent};
use super::invoker::{AttemptOutcome, TimedInvoker};
use super::load_balance::LoadBalanceCoordinator;
use super::options::{LoadOptions, SaveOptions};
use super::replication::ReplicationCoordinator;
use super::result::{Operation, ResultAggregator, RoutedResult};
use super::retry::BackgroundRetryScheduler;
use super::strategy::{AutoStrategyRouter, RoutingRequest, RoutingStrategySelector};

/// Switches resolved once at the start of a call.
#[derive(Debug, Clone, Copy)]
struct ResolvedModes {
    failover: bool,
    replication: bool,
    load_balance: bool,
}

impl ResolvedModes {
    fn for_save(options: &SaveOptions, registry: &dyn ProviderRegistry, config: &RouterConfig) -> Self {
        let failover = options.failover.resolve(registry.is_auto_failover_enabled());
        let replication = options
            .replication
            .resolve(registry.is_auto_replication_enabled());
        let load_balance = options
            .load_balance
            .resolve(registry.is_auto_load_balance_enabled());
        let legacy = config.storage_providers.legacy_replication_triggers_failover;

        Self {
            failover: failover || (legacy && replication),
            replication,
            load_balance,
        }
    }
}

/// What the strategy front door decided.
enum FrontDoorOutcome {
    /// The front door produced the result.
    Routed(RoutedResult),
    /// Fall back to failover routing. Carries the front door's failed
    /// attempts so the fallback skips those providers.
    Fallback(Vec<AttemptOutcome>),
}

struct RouterInner {
    registry: DynRegistry,
    config: RouterConfig,
    invoker: TimedInvoker,
    health: Arc<HealthMonitor>,
    events: EventBus,
    shutdown: CancellationToken,
    front_door: Option<Arc<dyn RoutingStrategySelector>>,
}

/// Routes saves and loads across storage providers.
///
/// A save tries the preferred provider, then the failover list in order,
/// stopping at the first success. A successful save is then optionally
/// replicated to the rest of the failover list and written once more to a
/// load-balance pick. A save that fails everywhere is retried in the
/// background.
///
/// Cloning is cheap; clones share the registry, configuration and detached
/// work.
///
/// # Example
///
/// ```ignore
/// use hyperdrive_persistence::router::{PersistenceRouter, SaveOptions};
/// use hyperdrive_persistence::types::{AutoMode, Record};
///
/// let (router, manager) = PersistenceRouter::from_config(config)?;
/// manager.register(Arc::new(MongoProvider::connect(..).await?));
/// manager.register(Arc::new(SqliteProvider::open(..)?));
///
/// let result = router
///     .save(
///         Record::identity(id, payload),
///         SaveOptions::new()
///             .with_replication(AutoMode::Enabled)
///             .wait_for_replication(true),
///     )
///     .await?;
///
/// if result.is_error() {
///     eprintln!("{}", result.detailed_message().unwrap_or_default());
/// }
/// ```
#[derive(Clone)]
pub struct PersistenceRouter {
    inner: Arc<RouterInner>,
}

impl PersistenceRouter {
    /// Creates a router over a registry.
    ///
    /// With [`RoutingMode::StrategyFirst`] the built-in
    /// [`AutoStrategyRouter`] is used as the front door.
    pub fn new(registry: DynRegistry, config: RouterConfig) -> Self {
        Self::build(registry, config, None)
    }

    /// Creates a router with a custom front door.
    ///
    /// The selector is only consulted with [`RoutingMode::StrategyFirst`].
    pub fn with_strategy_selector(
        registry: DynRegistry,
        config: RouterConfig,
        selector: Arc<dyn RoutingStrategySelector>,
    ) -> Self {
        Self::build(registry, config, Some(selector))
    }

    /// Creates a router and a [`ProviderManager`] from configuration.
    ///
    /// Providers are registered on the returned manager.
    pub fn from_config(config: RouterConfig) -> Result<(Self, Arc<ProviderManager>), ConfigError> {
        config.validate()?;
        let health = Arc::new(HealthMonitor::new(config.health.clone()));
        let manager = Arc::new(ProviderManager::from_config(&config.storage_providers, health)?);
        let router = Self::new(manager.clone(), config);
        Ok((router, manager))
    }

    fn build(
        registry: DynRegistry,
        config: RouterConfig,
        selector: Option<Arc<dyn RoutingStrategySelector>>,
    ) -> Self {
        let health = registry
            .health_monitor()
            .unwrap_or_else(|| Arc::new(HealthMonitor::new(config.health.clone())));
        let invoker = TimedInvoker::new(
            registry.clone(),
            health.clone(),
            config.storage_providers.call_timeout,
        );

        let front_door = match config.routing.mode {
            RoutingMode::Legacy => None,
            RoutingMode::StrategyFirst => Some(selector.unwrap_or_else(|| {
                Arc::new(AutoStrategyRouter::new(registry.clone(), invoker.clone()))
                    as Arc<dyn RoutingStrategySelector>
            })),
        };

        Self {
            inner: Arc::new(RouterInner {
                registry,
                config,
                invoker,
                health,
                events: EventBus::new(),
                shutdown: CancellationToken::new(),
                front_door,
            }),
        }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &DynRegistry {
        &self.inner.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Returns the health monitor calls are recorded in.
    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.inner.health
    }

    /// Returns the provider used when a call does not name one.
    pub fn current_provider_type(&self) -> ProviderType {
        self.inner.registry.current_provider_type()
    }

    /// Subscribes to detached work outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.inner.events.subscribe()
    }

    /// Stops all detached replication, load balancing and retries.
    pub fn shutdown(&self) {
        info!("Persistence router shutting down");
        self.inner.shutdown.cancel();
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.inner.events
    }

    fn prepare(record: &mut Record, actor: Option<Uuid>) -> RouterResult<()> {
        if record.id().is_nil() {
            return Err(RouterError::InvalidRecord(
                "record identifier must not be nil".to_string(),
            ));
        }
        record.stamp(actor);
        Ok(())
    }

    /// Saves a record.
    ///
    /// Provider failures never produce an `Err`; they are reported in the
    /// [`RoutedResult`]. `Err` means the record was malformed or the caller
    /// cancelled.
    #[instrument(skip(self, record, options), fields(record_id = %record.id(), kind = %record.kind()))]
    pub async fn save(&self, mut record: Record, options: SaveOptions) -> RouterResult<RoutedResult> {
        Self::prepare(&mut record, options.actor)?;
        self.save_prepared(record, options, Vec::new()).await
    }

    async fn save_prepared(
        &self,
        record: Record,
        options: SaveOptions,
        prior: Vec<AttemptOutcome>,
    ) -> RouterResult<RoutedResult> {
        let result = self.save_once(&record, &options, prior).await?;

        if result.is_error() && self.inner.config.background_retry.enabled {
            info!(
                record_id = %record.id(),
                attempts = self.inner.config.background_retry.max_attempts,
                interval = ?self.inner.config.background_retry.interval,
                "Scheduling background retries"
            );
            BackgroundRetryScheduler::new(self.clone(), self.inner.config.background_retry.clone())
                .schedule(record, options);
        }

        Ok(result)
    }

    /// One full save: failover, then replication, then load balancing.
    ///
    /// `prior` holds failed attempts already made for this save; their
    /// providers are not tried again.
    pub(crate) async fn save_once(
        &self,
        record: &Record,
        options: &SaveOptions,
        prior: Vec<AttemptOutcome>,
    ) -> RouterResult<RoutedResult> {
        let inner = &self.inner;
        let modes = ResolvedModes::for_save(options, inner.registry.as_ref(), &inner.config);
        let preferred = options
            .provider
            .unwrap_or_else(|| inner.registry.current_provider_type());
        let failover_list = inner.registry.failover_list(options.category);
        let cancel = options.cancel.clone().unwrap_or_default();

        let mut aggregator = ResultAggregator::new(Operation::Save, record.id());
        let mut tried = HashSet::new();
        for outcome in prior {
            tried.insert(outcome.provider());
            aggregator.record(outcome);
        }

        if tried.insert(preferred) {
            let first = inner
                .invoker
                .save(preferred, record, SaveMode::FirstAttempt, &cancel)
                .await?;
            aggregator.record(first);
        }

        if !aggregator.has_success() && modes.failover {
            for candidate in failover_list.iter().copied() {
                if !tried.insert(candidate) {
                    continue;
                }
                debug!(record_id = %record.id(), provider = %candidate, "Failing over");
                let outcome = inner
                    .invoker
                    .save(candidate, record, SaveMode::AutoFailover, &cancel)
                    .await?;
                let saved = outcome.is_success();
                aggregator.record(outcome);
                if saved {
                    break;
                }
            }
        }

        let Some((winner, stored)) = aggregator.winner().map(|(p, r)| (p, r.clone())) else {
            error!(
                record_id = %record.id(),
                providers = %format_provider_list(&aggregator.attempted_providers()),
                "Save failed on every provider"
            );
            return Ok(aggregator.finish());
        };

        if modes.replication {
            let targets: Vec<ProviderType> = failover_list
                .iter()
                .copied()
                .filter(|p| !tried.contains(p))
                .collect();

            if targets.is_empty() {
                debug!(record_id = %record.id(), "No replication targets");
            } else {
                let coordinator = ReplicationCoordinator::new(inner.invoker.clone());
                if options.wait_for_replication {
                    let report = coordinator
                        .replicate(&stored, winner, &targets, &cancel)
                        .await;
                    aggregator.record_replication(report);
                } else {
                    coordinator.spawn_detached(
                        stored.clone(),
                        winner,
                        targets.clone(),
                        inner.shutdown.child_token(),
                        inner.events.clone(),
                    );
                }
                tried.extend(targets);
            }
        }

        if modes.load_balance && !cancel.is_cancelled() {
            LoadBalanceCoordinator::new(inner.registry.clone(), inner.invoker.clone())
                .spawn_detached(
                    stored,
                    winner,
                    tried,
                    inner.shutdown.child_token(),
                    inner.events.clone(),
                );
        }

        Ok(aggregator.finish())
    }

    /// Loads a record.
    ///
    /// Tries the preferred provider and, when failover is enabled, the
    /// failover list. Loads never replicate or load-balance.
    #[instrument(skip(self, options), fields(record_id = %id, kind = %kind))]
    pub async fn load(
        &self,
        id: Uuid,
        kind: RecordKind,
        options: LoadOptions,
    ) -> RouterResult<RoutedResult> {
        if id.is_nil() {
            return Err(RouterError::InvalidRecord(
                "record identifier must not be nil".to_string(),
            ));
        }
        self.load_once(id, kind, &options, Vec::new()).await
    }

    async fn load_once(
        &self,
        id: Uuid,
        kind: RecordKind,
        options: &LoadOptions,
        prior: Vec<AttemptOutcome>,
    ) -> RouterResult<RoutedResult> {
        let inner = &self.inner;
        let failover = options
            .failover
            .resolve(inner.registry.is_auto_failover_enabled());
        let preferred = options
            .provider
            .unwrap_or_else(|| inner.registry.current_provider_type());
        let cancel = options.cancel.clone().unwrap_or_default();

        let mut aggregator = ResultAggregator::new(Operation::Load, id);
        let mut tried = HashSet::new();
        for outcome in prior {
            tried.insert(outcome.provider());
            aggregator.record(outcome);
        }

        if tried.insert(preferred) {
            let first = inner
                .invoker
                .load(preferred, id, kind, SaveMode::FirstAttempt, &cancel)
                .await?;
            aggregator.record(first);
        }

        if !aggregator.has_success() && failover {
            for candidate in inner.registry.failover_list(options.category) {
                if !tried.insert(candidate) {
                    continue;
                }
                let outcome = inner
                    .invoker
                    .load(candidate, id, kind, SaveMode::AutoFailover, &cancel)
                    .await?;
                let loaded = outcome.is_success();
                aggregator.record(outcome);
                if loaded {
                    break;
                }
            }
        }

        let result = aggregator.finish();
        if result.is_error() {
            error!(record_id = %id, "Load failed on every provider");
        }
        Ok(result)
    }

    /// Saves through the front door when configured, falling back to
    /// [`save`](Self::save).
    ///
    /// On fallback, providers the front door already tried are not tried
    /// again, and their failures count as warnings of the returned result.
    pub async fn save_routed(
        &self,
        mut record: Record,
        options: SaveOptions,
    ) -> RouterResult<RoutedResult> {
        if let Some(front_door) = &self.inner.front_door {
            Self::prepare(&mut record, options.actor)?;
            let request = RoutingRequest::Save {
                record: record.clone(),
                options: options.clone(),
            };
            return match self.try_front_door(front_door.as_ref(), &request).await? {
                FrontDoorOutcome::Routed(result) => Ok(result),
                FrontDoorOutcome::Fallback(prior) => {
                    self.save_prepared(record, options, prior).await
                }
            };
        }
        self.save(record, options).await
    }

    /// Loads through the front door when configured, falling back to
    /// [`load`](Self::load) without retrying providers the front door tried.
    pub async fn load_routed(
        &self,
        id: Uuid,
        kind: RecordKind,
        options: LoadOptions,
    ) -> RouterResult<RoutedResult> {
        if let Some(front_door) = &self.inner.front_door {
            if id.is_nil() {
                return Err(RouterError::InvalidRecord(
                    "record identifier must not be nil".to_string(),
                ));
            }
            let request = RoutingRequest::Load {
                id,
                kind,
                options: options.clone(),
            };
            return match self.try_front_door(front_door.as_ref(), &request).await? {
                FrontDoorOutcome::Routed(result) => Ok(result),
                FrontDoorOutcome::Fallback(prior) => {
                    self.load_once(id, kind, &options, prior).await
                }
            };
        }
        self.load(id, kind, options).await
    }

    async fn try_front_door(
        &self,
        front_door: &dyn RoutingStrategySelector,
        request: &RoutingRequest,
    ) -> RouterResult<FrontDoorOutcome> {
        let strategy = self.inner.config.routing.strategy;
        match front_door.try_route(request, strategy).await {
            Ok(Some(result)) if !result.is_error() => Ok(FrontDoorOutcome::Routed(result)),
            Ok(Some(result)) => {
                debug!(
                    record_id = %request.record_id(),
                    message = %result.message(),
                    "Routing strategy failed, falling back to failover routing"
                );
                Ok(FrontDoorOutcome::Fallback(result.attempts().to_vec()))
            }
            Ok(None) => {
                debug!(
                    record_id = %request.record_id(),
                    "Routing strategy declined, falling back to failover routing"
                );
                Ok(FrontDoorOutcome::Fallback(Vec::new()))
            }
            Err(RouterError::Cancelled) => Err(RouterError::Cancelled),
            Err(e) => {
                debug!(
                    record_id = %request.record_id(),
                    error = %e,
                    "Routing strategy errored, falling back to failover routing"
                );
                Ok(FrontDoorOutcome::Fallback(Vec::new()))
            }
        }
    }
}

impl std::fmt::Debug for PersistenceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceRouter")
            .field("config", &self.inner.config)
            .field("front_door", &self.inner.front_door.is_some())
            .finish_non_exhaustive()
    }
}
