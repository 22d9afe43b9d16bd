//! Concrete provider registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{ConfigError, StorageProvidersConfig};
use crate::core::{ActivatedProvider, DynProvider, ProviderRegistry};
use crate::error::ProviderError;
use crate::health::HealthMonitor;
use crate::types::{FailoverCategory, LoadBalancingStrategy, ProviderDescriptor, ProviderType};

use super::list::{dedupe_providers, parse_provider_list};
use super::selection::LoadBalanceSelector;

struct RegisteredProvider {
    descriptor: ProviderDescriptor,
    provider: DynProvider,
}

/// In-process provider registry.
///
/// All state sits behind short-lived locks that are never held across an
/// await, so the manager can be shared freely between concurrent calls.
pub struct ProviderManager {
    providers: RwLock<HashMap<ProviderType, RegisteredProvider>>,
    current: RwLock<ProviderType>,
    failover_lists: RwLock<HashMap<FailoverCategory, Vec<ProviderType>>>,
    load_balance_list: RwLock<Vec<ProviderType>>,
    strategy: RwLock<LoadBalancingStrategy>,
    auto_failover: AtomicBool,
    auto_replication: AtomicBool,
    auto_load_balance: AtomicBool,
    default_timeout: Duration,
    provider_timeouts: HashMap<ProviderType, Duration>,
    selector: LoadBalanceSelector,
    health: Arc<HealthMonitor>,
}

impl ProviderManager {
    /// Creates a manager with default settings and no providers.
    pub fn new(current: ProviderType) -> Self {
        Self::with_settings(&StorageProvidersConfig::default(), current, Arc::default())
    }

    /// Creates a manager from configuration.
    ///
    /// The current provider is the configured one, or the head of the
    /// default failover list.
    pub fn from_config(
        config: &StorageProvidersConfig,
        health: Arc<HealthMonitor>,
    ) -> Result<Self, ConfigError> {
        let current = config
            .current_provider
            .or_else(|| config.failover_list.first().copied())
            .ok_or(ConfigError::NoCurrentProvider)?;

        Ok(Self::with_settings(config, current, health))
    }

    fn with_settings(
        config: &StorageProvidersConfig,
        current: ProviderType,
        health: Arc<HealthMonitor>,
    ) -> Self {
        let mut failover_lists = HashMap::new();
        for category in [
            FailoverCategory::Default,
            FailoverCategory::Login,
            FailoverCategory::EmailLookup,
            FailoverCategory::UsernameLookup,
        ] {
            let list = config.failover_list(category);
            if !list.is_empty() {
                failover_lists.insert(category, dedupe_providers(list.iter().copied()));
            }
        }

        Self {
            providers: RwLock::new(HashMap::new()),
            current: RwLock::new(current),
            failover_lists: RwLock::new(failover_lists),
            load_balance_list: RwLock::new(dedupe_providers(
                config.load_balance_list.iter().copied(),
            )),
            strategy: RwLock::new(config.load_balancing_strategy),
            auto_failover: AtomicBool::new(config.auto_failover_enabled),
            auto_replication: AtomicBool::new(config.auto_replication_enabled),
            auto_load_balance: AtomicBool::new(config.auto_load_balance_enabled),
            default_timeout: config.call_timeout,
            provider_timeouts: config.provider_timeouts.clone(),
            selector: LoadBalanceSelector::default(),
            health,
        }
    }

    /// Registers a provider, replacing any provider of the same type.
    ///
    /// The call timeout comes from the per-provider override or the default.
    pub fn register(&self, provider: DynProvider) -> ProviderDescriptor {
        let provider_type = provider.provider_type();
        let timeout = self
            .provider_timeouts
            .get(&provider_type)
            .copied()
            .unwrap_or(self.default_timeout);
        let descriptor = ProviderDescriptor::new(provider_type, provider.name(), timeout);
        self.register_with_descriptor(descriptor.clone(), provider);
        descriptor
    }

    /// Registers a provider with an explicit descriptor.
    pub fn register_with_descriptor(&self, descriptor: ProviderDescriptor, provider: DynProvider) {
        info!(
            provider = %descriptor.provider_type,
            name = %descriptor.name,
            timeout = ?descriptor.timeout,
            "Registered storage provider"
        );
        self.providers.write().insert(
            descriptor.provider_type,
            RegisteredProvider {
                descriptor,
                provider,
            },
        );
    }

    /// Removes a provider. Returns true if it was registered.
    pub fn unregister(&self, provider: ProviderType) -> bool {
        self.providers.write().remove(&provider).is_some()
    }

    /// Returns true if a provider is registered.
    pub fn is_registered(&self, provider: ProviderType) -> bool {
        self.providers.read().contains_key(&provider)
    }

    /// Returns all registered provider types, sorted.
    pub fn registered_providers(&self) -> Vec<ProviderType> {
        let mut providers: Vec<_> = self.providers.read().keys().copied().collect();
        providers.sort();
        providers
    }

    /// Sets the provider used when a call does not name one.
    pub fn set_current_provider_type(&self, provider: ProviderType) {
        *self.current.write() = provider;
    }

    /// Replaces the failover list for a category, returning the previous one.
    ///
    /// Duplicates are dropped, keeping the first occurrence. Callers that
    /// need a temporary list can restore the returned one afterwards.
    pub fn replace_failover_list(
        &self,
        category: FailoverCategory,
        list: impl IntoIterator<Item = ProviderType>,
    ) -> Vec<ProviderType> {
        let list = dedupe_providers(list);
        let mut lists = self.failover_lists.write();
        let previous = lists.get(&category).cloned().unwrap_or_default();
        if list.is_empty() {
            lists.remove(&category);
        } else {
            lists.insert(category, list);
        }
        previous
    }

    /// Replaces a failover list from a comma-separated string.
    pub fn set_failover_list_from_str(
        &self,
        category: FailoverCategory,
        list: &str,
    ) -> Result<Vec<ProviderType>, ConfigError> {
        let parsed = parse_provider_list(list)?;
        Ok(self.replace_failover_list(category, parsed))
    }

    /// Replaces the load-balance candidates.
    pub fn set_load_balance_list(&self, list: impl IntoIterator<Item = ProviderType>) {
        *self.load_balance_list.write() = dedupe_providers(list);
    }

    /// Returns the load-balance candidates.
    pub fn load_balance_list(&self) -> Vec<ProviderType> {
        self.load_balance_list.read().clone()
    }

    /// Sets the load-balancing strategy.
    pub fn set_load_balancing_strategy(&self, strategy: LoadBalancingStrategy) {
        *self.strategy.write() = strategy;
    }

    /// Returns the load-balancing strategy.
    pub fn load_balancing_strategy(&self) -> LoadBalancingStrategy {
        *self.strategy.read()
    }

    /// Sets the global auto-failover default.
    pub fn set_auto_failover_enabled(&self, enabled: bool) {
        self.auto_failover.store(enabled, Ordering::Relaxed);
    }

    /// Sets the global auto-replication default.
    pub fn set_auto_replication_enabled(&self, enabled: bool) {
        self.auto_replication.store(enabled, Ordering::Relaxed);
    }

    /// Sets the global auto-load-balance default.
    pub fn set_auto_load_balance_enabled(&self, enabled: bool) {
        self.auto_load_balance.store(enabled, Ordering::Relaxed);
    }

    /// Returns the shared health monitor.
    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }
}

#[async_trait]
impl ProviderRegistry for ProviderManager {
    fn descriptor(&self, provider: ProviderType) -> Option<ProviderDescriptor> {
        self.providers
            .read()
            .get(&provider)
            .map(|r| r.descriptor.clone())
    }

    async fn activate(&self, provider: ProviderType) -> Result<ActivatedProvider, ProviderError> {
        let (descriptor, handle) = {
            let providers = self.providers.read();
            match providers.get(&provider) {
                Some(registered) => (
                    registered.descriptor.clone(),
                    registered.provider.clone(),
                ),
                None => {
                    return Err(ProviderError::unavailable(
                        provider,
                        "provider is not registered",
                    ));
                }
            }
        };

        handle.activate().await.map_err(|e| match e {
            ProviderError::Unavailable { .. } => e,
            other => ProviderError::unavailable(provider, format!("activation failed: {other}")),
        })?;

        debug!(provider = %provider, "Provider activated");
        Ok(ActivatedProvider::new(descriptor, handle))
    }

    fn current_provider_type(&self) -> ProviderType {
        *self.current.read()
    }

    fn failover_list(&self, category: FailoverCategory) -> Vec<ProviderType> {
        let lists = self.failover_lists.read();
        lists
            .get(&category)
            .or_else(|| lists.get(&FailoverCategory::Default))
            .cloned()
            .unwrap_or_default()
    }

    fn is_auto_failover_enabled(&self) -> bool {
        self.auto_failover.load(Ordering::Relaxed)
    }

    fn is_auto_replication_enabled(&self) -> bool {
        self.auto_replication.load(Ordering::Relaxed)
    }

    fn is_auto_load_balance_enabled(&self) -> bool {
        self.auto_load_balance.load(Ordering::Relaxed)
    }

    fn select_load_balance_target(&self) -> Option<ProviderType> {
        self.select_with_strategy(self.load_balancing_strategy())
    }

    fn select_with_strategy(&self, strategy: LoadBalancingStrategy) -> Option<ProviderType> {
        if !self.is_auto_load_balance_enabled() {
            return None;
        }
        let candidates = self.load_balance_list();
        self.selector.select(strategy, &candidates, &self.health)
    }

    fn health_monitor(&self) -> Option<Arc<HealthMonitor>> {
        Some(self.health.clone())
    }
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("providers", &self.registered_providers())
            .field("current", &self.current_provider_type())
            .field("strategy", &self.load_balancing_strategy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::core::StorageProvider;
    use crate::types::{Record, RecordKind};

    struct NullProvider(ProviderType);

    #[async_trait]
    impl StorageProvider for NullProvider {
        fn provider_type(&self) -> ProviderType {
            self.0
        }

        async fn save(&self, record: &Record) -> Result<Record, ProviderError> {
            Ok(record.clone())
        }

        async fn load(&self, id: Uuid, _kind: RecordKind) -> Result<Record, ProviderError> {
            Ok(Record::identity(id, json!({})))
        }
    }

    #[test]
    fn test_from_config_defaults_current_to_list_head() {
        let config = StorageProvidersConfig {
            failover_list: vec![ProviderType::Sqlite, ProviderType::MongoDb],
            ..Default::default()
        };
        let manager = ProviderManager::from_config(&config, Arc::default()).unwrap();
        assert_eq!(manager.current_provider_type(), ProviderType::Sqlite);
    }

    #[test]
    fn test_from_config_requires_current_provider() {
        let result = ProviderManager::from_config(&StorageProvidersConfig::default(), Arc::default());
        assert!(matches!(result, Err(ConfigError::NoCurrentProvider)));
    }

    #[test]
    fn test_register_uses_timeout_override() {
        let config = StorageProvidersConfig {
            current_provider: Some(ProviderType::Ipfs),
            provider_timeouts: HashMap::from([(ProviderType::Ipfs, Duration::from_secs(30))]),
            ..Default::default()
        };
        let manager = ProviderManager::from_config(&config, Arc::default()).unwrap();

        let ipfs = manager.register(Arc::new(NullProvider(ProviderType::Ipfs)));
        let sqlite = manager.register(Arc::new(NullProvider(ProviderType::Sqlite)));

        assert_eq!(ipfs.timeout, Duration::from_secs(30));
        assert_eq!(sqlite.timeout, Duration::from_secs(10));
        assert_eq!(
            manager.registered_providers(),
            vec![ProviderType::Sqlite, ProviderType::Ipfs]
        );
    }

    #[test]
    fn test_replace_failover_list_returns_previous_and_dedupes() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        manager.replace_failover_list(
            FailoverCategory::Default,
            [ProviderType::MongoDb, ProviderType::Sqlite],
        );

        let previous = manager.replace_failover_list(
            FailoverCategory::Default,
            [ProviderType::Ipfs, ProviderType::Ipfs, ProviderType::MongoDb],
        );

        assert_eq!(previous, vec![ProviderType::MongoDb, ProviderType::Sqlite]);
        assert_eq!(
            manager.failover_list(FailoverCategory::Default),
            vec![ProviderType::Ipfs, ProviderType::MongoDb]
        );
    }

    #[test]
    fn test_category_list_falls_back_to_default() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        manager.replace_failover_list(FailoverCategory::Default, [ProviderType::MongoDb]);
        manager.replace_failover_list(FailoverCategory::Login, [ProviderType::Sqlite]);

        assert_eq!(
            manager.failover_list(FailoverCategory::Login),
            vec![ProviderType::Sqlite]
        );
        assert_eq!(
            manager.failover_list(FailoverCategory::UsernameLookup),
            vec![ProviderType::MongoDb]
        );
    }

    #[test]
    fn test_set_failover_list_from_str() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        manager
            .set_failover_list_from_str(FailoverCategory::Default, "MongoDb, Neo4j")
            .unwrap();
        assert_eq!(
            manager.failover_list(FailoverCategory::Default),
            vec![ProviderType::MongoDb, ProviderType::Neo4j]
        );

        assert!(
            manager
                .set_failover_list_from_str(FailoverCategory::Default, "MongoDb, Punchcard")
                .is_err()
        );
    }

    #[test]
    fn test_select_respects_global_switch() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        manager.set_load_balance_list([ProviderType::Sqlite]);
        assert_eq!(manager.select_load_balance_target(), Some(ProviderType::Sqlite));

        manager.set_auto_load_balance_enabled(false);
        assert_eq!(manager.select_load_balance_target(), None);
    }

    #[tokio::test]
    async fn test_activate_unregistered_provider() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        let err = manager.activate(ProviderType::Solana).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Unavailable {
                provider: ProviderType::Solana,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_activate_does_not_change_current() {
        let manager = ProviderManager::new(ProviderType::MongoDb);
        manager.register(Arc::new(NullProvider(ProviderType::Sqlite)));

        let activated = manager.activate(ProviderType::Sqlite).await.unwrap();

        assert_eq!(activated.provider_type(), ProviderType::Sqlite);
        assert_eq!(manager.current_provider_type(), ProviderType::MongoDb);
    }
}
