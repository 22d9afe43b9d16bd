//! Per-call routing options.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::{AutoMode, FailoverCategory, ProviderType};

/// Options for a routed save.
///
/// The defaults defer every switch to the registry's global settings, target
/// the current provider and the default failover list, and do not wait for
/// replication.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Preferred provider; `None` uses the registry's current provider.
    pub provider: Option<ProviderType>,
    /// Auto-failover switch.
    pub failover: AutoMode,
    /// Auto-replication switch.
    pub replication: AutoMode,
    /// Auto-load-balance switch.
    pub load_balance: AutoMode,
    /// Wait for replication before returning.
    pub wait_for_replication: bool,
    /// Which failover list applies.
    pub category: FailoverCategory,
    /// Actor stamped as the modifier; defaults to the record's own id.
    pub actor: Option<Uuid>,
    /// Caller cancellation.
    pub cancel: Option<CancellationToken>,
}

impl SaveOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred provider.
    pub fn with_provider(mut self, provider: ProviderType) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the failover mode.
    pub fn with_failover(mut self, mode: AutoMode) -> Self {
        self.failover = mode;
        self
    }

    /// Sets the replication mode.
    pub fn with_replication(mut self, mode: AutoMode) -> Self {
        self.replication = mode;
        self
    }

    /// Sets the load-balance mode.
    pub fn with_load_balance(mut self, mode: AutoMode) -> Self {
        self.load_balance = mode;
        self
    }

    /// Waits for replication before returning.
    pub fn wait_for_replication(mut self, wait: bool) -> Self {
        self.wait_for_replication = wait;
        self
    }

    /// Sets the failover category.
    pub fn with_category(mut self, category: FailoverCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the modifying actor.
    pub fn with_actor(mut self, actor: Uuid) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Options for a routed load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Preferred provider; `None` uses the registry's current provider.
    pub provider: Option<ProviderType>,
    /// Auto-failover switch.
    pub failover: AutoMode,
    /// Which failover list applies.
    pub category: FailoverCategory,
    /// Caller cancellation.
    pub cancel: Option<CancellationToken>,
}

impl LoadOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred provider.
    pub fn with_provider(mut self, provider: ProviderType) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the failover mode.
    pub fn with_failover(mut self, mode: AutoMode) -> Self {
        self.failover = mode;
        self
    }

    /// Sets the failover category.
    pub fn with_category(mut self, category: FailoverCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}
