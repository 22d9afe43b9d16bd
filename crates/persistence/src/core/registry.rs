//! Provider registry trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::health::HealthMonitor;
use crate::types::{FailoverCategory, LoadBalancingStrategy, ProviderDescriptor, ProviderType};

use super::ActivatedProvider;

/// Catalog of providers consulted by the router.
///
/// The router reads the registry once per call: the current provider, the
/// failover list for the call's category, and the global switches are all
/// snapshotted before the first attempt. Activation does not change the
/// current provider; the router always names the provider it wants.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Returns the descriptor of a registered provider.
    fn descriptor(&self, provider: ProviderType) -> Option<ProviderDescriptor>;

    /// Activates a provider for one call.
    async fn activate(&self, provider: ProviderType) -> Result<ActivatedProvider, ProviderError>;

    /// Returns the provider used when a call does not name one.
    fn current_provider_type(&self) -> ProviderType;

    /// Returns the ordered failover list for a category.
    fn failover_list(&self, category: FailoverCategory) -> Vec<ProviderType>;

    /// Global auto-failover default.
    fn is_auto_failover_enabled(&self) -> bool;

    /// Global auto-replication default.
    fn is_auto_replication_enabled(&self) -> bool;

    /// Global auto-load-balance default.
    fn is_auto_load_balance_enabled(&self) -> bool;

    /// Picks the provider best suited to absorb additional load, using the
    /// registry's configured strategy.
    fn select_load_balance_target(&self) -> Option<ProviderType>;

    /// Picks a load-balance target with an explicit strategy.
    fn select_with_strategy(&self, strategy: LoadBalancingStrategy) -> Option<ProviderType> {
        let _ = strategy;
        self.select_load_balance_target()
    }

    /// Returns the health monitor the registry selects with, if any.
    ///
    /// The router records call statistics into it so selection sees them.
    fn health_monitor(&self) -> Option<Arc<HealthMonitor>> {
        None
    }
}

/// Type alias for a shared registry.
pub type DynRegistry = Arc<dyn ProviderRegistry>;
