//! Router harness with mock providers.

use std::collections::HashMap;
use std::sync::Arc;

use hyperdrive_persistence::config::{RouterConfig, RouterConfigBuilder};
use hyperdrive_persistence::registry::ProviderManager;
use hyperdrive_persistence::router::PersistenceRouter;
use hyperdrive_persistence::types::ProviderType;

use super::providers::{Behavior, MockProvider};

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A router wired to mock providers.
pub struct TestRouter {
    /// The router under test.
    pub router: PersistenceRouter,
    /// The registry behind it.
    pub manager: Arc<ProviderManager>,
    /// The mock providers by type.
    pub providers: HashMap<ProviderType, Arc<MockProvider>>,
}

impl TestRouter {
    /// Returns a mock provider.
    pub fn provider(&self, provider: ProviderType) -> &Arc<MockProvider> {
        &self.providers[&provider]
    }

    /// Returns the save count for each provider, in the given order.
    pub fn save_counts(&self, providers: &[ProviderType]) -> Vec<usize> {
        providers.iter().map(|p| self.provider(*p).saves()).collect()
    }
}

/// A config builder with replication, load balancing and background
/// retries switched off, so each test enables only what it exercises.
pub fn quiet_config(failover_list: &[ProviderType]) -> RouterConfigBuilder {
    RouterConfig::builder()
        .failover_list(failover_list.iter().copied())
        .auto_replication(false)
        .auto_load_balance(false)
        .without_background_retry()
}

/// Builds a router and registers one mock provider per entry.
pub fn router_with(config: RouterConfig, providers: &[(ProviderType, Behavior)]) -> TestRouter {
    init_tracing();

    let (router, manager) =
        PersistenceRouter::from_config(config).expect("valid test configuration");

    let providers = providers
        .iter()
        .map(|(provider_type, behavior)| {
            let mock = MockProvider::new(*provider_type, behavior.clone());
            manager.register(mock.clone());
            (*provider_type, mock)
        })
        .collect();

    TestRouter {
        router,
        manager,
        providers,
    }
}
