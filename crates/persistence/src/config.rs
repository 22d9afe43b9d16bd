//! Configuration for the persistence router.
//!
//! The configuration mirrors the global settings the router reads but does
//! not own: per-provider call timeouts, the global auto-failover,
//! auto-replication and auto-load-balance switches, the failover lists per
//! operation category, and the background retry policy.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hyperdrive_persistence::config::RouterConfig;
//! use hyperdrive_persistence::types::ProviderType;
//!
//! let config = RouterConfig::builder()
//!     .current_provider(ProviderType::MongoDb)
//!     .failover_list([ProviderType::MongoDb, ProviderType::Sqlite, ProviderType::Ipfs])
//!     .call_timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.storage_providers.failover_list.len(), 3);
//! ```
//!
//! The same configuration can be read from JSON, with durations written in
//! humantime format:
//!
//! ```json
//! {
//!   "storage_providers": {
//!     "current_provider": "mongodb",
//!     "call_timeout": "10s",
//!     "provider_timeouts": { "ipfs": "30s" },
//!     "failover_list": ["mongodb", "sqlite", "ipfs"]
//!   },
//!   "background_retry": { "max_attempts": 3, "interval": "5s" }
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{FailoverCategory, LoadBalancingStrategy, ProviderType};

/// Top-level router configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Provider lists, timeouts and global switches.
    #[serde(default)]
    pub storage_providers: StorageProvidersConfig,

    /// Provider health thresholds.
    #[serde(default)]
    pub health: HealthConfig,

    /// Detached retries after a fully failed save.
    #[serde(default)]
    pub background_retry: BackgroundRetryConfig,

    /// Optional strategy front door.
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl RouterConfig {
    /// Returns a builder.
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::new()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// Returns non-fatal warnings on success.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();
        let providers = &self.storage_providers;

        for (name, list) in providers.named_lists() {
            let mut seen = HashSet::new();
            for provider in list {
                if !seen.insert(provider) {
                    return Err(ConfigError::DuplicateProvider {
                        list: name.to_string(),
                        provider: *provider,
                    });
                }
            }
        }

        if providers.call_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout { provider: None });
        }
        if let Some((provider, _)) = providers
            .provider_timeouts
            .iter()
            .find(|(_, timeout)| timeout.is_zero())
        {
            return Err(ConfigError::InvalidTimeout {
                provider: Some(*provider),
            });
        }

        if self.background_retry.enabled && self.background_retry.interval.is_zero() {
            return Err(ConfigError::InvalidRetryInterval);
        }

        if providers.failover_list.is_empty() {
            warnings.push(ConfigWarning::EmptyFailoverList);
        }

        if providers.auto_load_balance_enabled && providers.load_balance_list.is_empty() {
            warnings.push(ConfigWarning::EmptyLoadBalanceList);
        }

        if let Some(current) = providers.current_provider {
            if !providers.failover_list.is_empty() && !providers.failover_list.contains(&current) {
                warnings.push(ConfigWarning::CurrentProviderNotInFailoverList(current));
            }
        }

        Ok(warnings)
    }
}

/// Provider lists, timeouts and global switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageProvidersConfig {
    /// Provider used when a call does not name one. Defaults to the first
    /// entry of the failover list.
    #[serde(default)]
    pub current_provider: Option<ProviderType>,

    /// Deadline for every provider call.
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub call_timeout: Duration,

    /// Per-provider deadline overrides.
    #[serde(with = "humantime_map_serde", default)]
    pub provider_timeouts: HashMap<ProviderType, Duration>,

    /// Global default for auto-failover.
    #[serde(default = "default_true")]
    pub auto_failover_enabled: bool,

    /// Global default for auto-replication.
    #[serde(default = "default_true")]
    pub auto_replication_enabled: bool,

    /// Global default for auto-load-balancing.
    #[serde(default = "default_true")]
    pub auto_load_balance_enabled: bool,

    /// Failover list for general operations.
    #[serde(default)]
    pub failover_list: Vec<ProviderType>,

    /// Failover list for login lookups. Falls back to `failover_list` when empty.
    #[serde(default)]
    pub login_failover_list: Vec<ProviderType>,

    /// Failover list for email-in-use lookups. Falls back to `failover_list` when empty.
    #[serde(default)]
    pub email_lookup_failover_list: Vec<ProviderType>,

    /// Failover list for username-in-use lookups. Falls back to `failover_list` when empty.
    #[serde(default)]
    pub username_lookup_failover_list: Vec<ProviderType>,

    /// Candidates for load-balance writes.
    #[serde(default)]
    pub load_balance_list: Vec<ProviderType>,

    /// Strategy used to pick a load-balance target.
    #[serde(default)]
    pub load_balancing_strategy: LoadBalancingStrategy,

    /// When set, an enabled replication mode also enables the failover loop.
    #[serde(default)]
    pub legacy_replication_triggers_failover: bool,
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

impl Default for StorageProvidersConfig {
    fn default() -> Self {
        Self {
            current_provider: None,
            call_timeout: default_call_timeout(),
            provider_timeouts: HashMap::new(),
            auto_failover_enabled: true,
            auto_replication_enabled: true,
            auto_load_balance_enabled: true,
            failover_list: Vec::new(),
            login_failover_list: Vec::new(),
            email_lookup_failover_list: Vec::new(),
            username_lookup_failover_list: Vec::new(),
            load_balance_list: Vec::new(),
            load_balancing_strategy: LoadBalancingStrategy::default(),
            legacy_replication_triggers_failover: false,
        }
    }
}

impl StorageProvidersConfig {
    /// Returns the call deadline for a provider.
    pub fn timeout_for(&self, provider: ProviderType) -> Duration {
        self.provider_timeouts
            .get(&provider)
            .copied()
            .unwrap_or(self.call_timeout)
    }

    /// Returns the configured list for a category, falling back to the
    /// default list when the category list is empty.
    pub fn failover_list(&self, category: FailoverCategory) -> &[ProviderType] {
        let list = match category {
            FailoverCategory::Default => &self.failover_list,
            FailoverCategory::Login => &self.login_failover_list,
            FailoverCategory::EmailLookup => &self.email_lookup_failover_list,
            FailoverCategory::UsernameLookup => &self.username_lookup_failover_list,
        };
        if list.is_empty() {
            &self.failover_list
        } else {
            list
        }
    }

    fn named_lists(&self) -> [(&'static str, &Vec<ProviderType>); 5] {
        [
            ("failover_list", &self.failover_list),
            ("login_failover_list", &self.login_failover_list),
            ("email_lookup_failover_list", &self.email_lookup_failover_list),
            (
                "username_lookup_failover_list",
                &self.username_lookup_failover_list,
            ),
            ("load_balance_list", &self.load_balance_list),
        ]
    }
}

/// Provider health thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Number of consecutive failures before marking unhealthy.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
        }
    }
}

/// Detached retry policy after a save fails on every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundRetryConfig {
    /// Whether failed saves are retried in the background.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each retry.
    #[serde(with = "humantime_serde", default = "default_retry_interval")]
    pub interval: Duration,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for BackgroundRetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            interval: default_retry_interval(),
        }
    }
}

/// Whether the strategy front door is consulted before legacy routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Legacy failover routing only.
    #[default]
    Legacy,
    /// Try the routing strategy first, fall back to legacy routing.
    StrategyFirst,
}

/// Front door configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Routing mode.
    #[serde(default)]
    pub mode: RoutingMode,

    /// Strategy passed to the front door.
    #[serde(default)]
    pub strategy: LoadBalancingStrategy,
}

/// Builder for constructing [`RouterConfig`].
#[derive(Debug, Default)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl RouterConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider used when a call does not name one.
    pub fn current_provider(mut self, provider: ProviderType) -> Self {
        self.config.storage_providers.current_provider = Some(provider);
        self
    }

    /// Sets the default failover list.
    pub fn failover_list(mut self, list: impl IntoIterator<Item = ProviderType>) -> Self {
        self.config.storage_providers.failover_list = list.into_iter().collect();
        self
    }

    /// Sets the failover list for a category.
    pub fn category_failover_list(
        mut self,
        category: FailoverCategory,
        list: impl IntoIterator<Item = ProviderType>,
    ) -> Self {
        let list = list.into_iter().collect();
        let providers = &mut self.config.storage_providers;
        match category {
            FailoverCategory::Default => providers.failover_list = list,
            FailoverCategory::Login => providers.login_failover_list = list,
            FailoverCategory::EmailLookup => providers.email_lookup_failover_list = list,
            FailoverCategory::UsernameLookup => providers.username_lookup_failover_list = list,
        }
        self
    }

    /// Sets the load-balance candidates.
    pub fn load_balance_list(mut self, list: impl IntoIterator<Item = ProviderType>) -> Self {
        self.config.storage_providers.load_balance_list = list.into_iter().collect();
        self
    }

    /// Sets the load-balancing strategy.
    pub fn load_balancing_strategy(mut self, strategy: LoadBalancingStrategy) -> Self {
        self.config.storage_providers.load_balancing_strategy = strategy;
        self
    }

    /// Sets the default call timeout.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.storage_providers.call_timeout = timeout;
        self
    }

    /// Overrides the call timeout for one provider.
    pub fn provider_timeout(mut self, provider: ProviderType, timeout: Duration) -> Self {
        self.config
            .storage_providers
            .provider_timeouts
            .insert(provider, timeout);
        self
    }

    /// Sets the global auto-failover default.
    pub fn auto_failover(mut self, enabled: bool) -> Self {
        self.config.storage_providers.auto_failover_enabled = enabled;
        self
    }

    /// Sets the global auto-replication default.
    pub fn auto_replication(mut self, enabled: bool) -> Self {
        self.config.storage_providers.auto_replication_enabled = enabled;
        self
    }

    /// Sets the global auto-load-balance default.
    pub fn auto_load_balance(mut self, enabled: bool) -> Self {
        self.config.storage_providers.auto_load_balance_enabled = enabled;
        self
    }

    /// Lets an enabled replication mode also trigger the failover loop.
    pub fn legacy_replication_triggers_failover(mut self, enabled: bool) -> Self {
        self.config
            .storage_providers
            .legacy_replication_triggers_failover = enabled;
        self
    }

    /// Sets the background retry policy.
    pub fn background_retry(mut self, retry: BackgroundRetryConfig) -> Self {
        self.config.background_retry = retry;
        self
    }

    /// Disables background retries.
    pub fn without_background_retry(mut self) -> Self {
        self.config.background_retry.enabled = false;
        self
    }

    /// Sets the health thresholds.
    pub fn health(mut self, health: HealthConfig) -> Self {
        self.config.health = health;
        self
    }

    /// Sets the routing mode and front door strategy.
    pub fn routing(mut self, mode: RoutingMode, strategy: LoadBalancingStrategy) -> Self {
        self.config.routing = RoutingConfig { mode, strategy };
        self
    }

    /// Builds the configuration, validating it first.
    pub fn build(self) -> Result<RouterConfig, ConfigError> {
        let _ = self.config.validate()?;
        Ok(self.config)
    }

    /// Builds the configuration and returns warnings.
    pub fn build_with_warnings(self) -> Result<(RouterConfig, Vec<ConfigWarning>), ConfigError> {
        let warnings = self.config.validate()?;
        Ok((self.config, warnings))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A provider appears twice in one list.
    #[error("provider {provider} appears more than once in {list}")]
    DuplicateProvider {
        /// The list containing the duplicate.
        list: String,
        /// The duplicated provider.
        provider: ProviderType,
    },

    /// A comma-separated provider list contained unknown names.
    #[error("invalid provider names in list: {}", .invalid.join(", "))]
    InvalidProviderList {
        /// The names that did not parse.
        invalid: Vec<String>,
    },

    /// A call timeout is zero.
    #[error("call timeout must be greater than zero{}", provider_suffix(.provider))]
    InvalidTimeout {
        /// The provider with the bad override, or `None` for the default.
        provider: Option<ProviderType>,
    },

    /// Background retries are enabled with a zero interval.
    #[error("background retry interval must be greater than zero")]
    InvalidRetryInterval,

    /// Neither a current provider nor a failover list is configured.
    #[error("no current provider configured and the failover list is empty")]
    NoCurrentProvider,

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {message}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying I/O error.
        message: String,
    },

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

fn provider_suffix(provider: &Option<ProviderType>) -> String {
    provider
        .map(|p| format!(" for provider {p}"))
        .unwrap_or_default()
}

/// Configuration warnings (non-fatal issues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The default failover list is empty, so failover never happens.
    EmptyFailoverList,

    /// Load balancing is enabled but there are no candidates.
    EmptyLoadBalanceList,

    /// The current provider is not part of the failover list.
    CurrentProviderNotInFailoverList(ProviderType),
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::EmptyFailoverList => {
                write!(f, "failover list is empty - failed calls will not fail over")
            }
            ConfigWarning::EmptyLoadBalanceList => {
                write!(
                    f,
                    "load balancing is enabled but the load-balance list is empty"
                )
            }
            ConfigWarning::CurrentProviderNotInFailoverList(provider) => {
                write!(
                    f,
                    "current provider {} is not in the failover list",
                    provider
                )
            }
        }
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde module for a provider-keyed map of humantime durations.
mod humantime_map_serde {
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::types::ProviderType;

    pub fn serialize<S>(
        map: &HashMap<ProviderType, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted: BTreeMap<ProviderType, String> = map
            .iter()
            .map(|(p, d)| (*p, humantime::format_duration(*d).to_string()))
            .collect();
        formatted.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<ProviderType, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<ProviderType, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(p, s)| {
                humantime::parse_duration(&s)
                    .map(|d| (p, d))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
