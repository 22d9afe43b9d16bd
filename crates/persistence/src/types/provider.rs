//! Provider identity and selection types.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies a storage provider.
///
/// Provider identity is always passed explicitly to every call. There is no
/// process-wide "active provider" switch inside the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// MongoDB document store.
    MongoDb,
    /// SQLite database.
    Sqlite,
    /// Neo4j graph database.
    Neo4j,
    /// Local file storage.
    LocalFile,
    /// IPFS content-addressed storage.
    Ipfs,
    /// Pinata pinning service over IPFS.
    Pinata,
    /// Holochain DHT.
    Holochain,
    /// Ethereum smart-contract storage.
    Ethereum,
    /// Solana program storage.
    Solana,
    /// Arbitrum rollup storage.
    Arbitrum,
    /// EOSIO chain storage.
    Eosio,
    /// Hedera Hashgraph.
    Hashgraph,
    /// Google Cloud storage.
    GoogleCloud,
    /// Azure Cosmos DB.
    AzureCosmosDb,
    /// AWS storage.
    Aws,
    /// ActivityPub federation.
    ActivityPub,
}

impl ProviderType {
    /// All known provider types, in declaration order.
    pub const ALL: [ProviderType; 16] = [
        ProviderType::MongoDb,
        ProviderType::Sqlite,
        ProviderType::Neo4j,
        ProviderType::LocalFile,
        ProviderType::Ipfs,
        ProviderType::Pinata,
        ProviderType::Holochain,
        ProviderType::Ethereum,
        ProviderType::Solana,
        ProviderType::Arbitrum,
        ProviderType::Eosio,
        ProviderType::Hashgraph,
        ProviderType::GoogleCloud,
        ProviderType::AzureCosmosDb,
        ProviderType::Aws,
        ProviderType::ActivityPub,
    ];

    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::MongoDb => "mongodb",
            ProviderType::Sqlite => "sqlite",
            ProviderType::Neo4j => "neo4j",
            ProviderType::LocalFile => "localfile",
            ProviderType::Ipfs => "ipfs",
            ProviderType::Pinata => "pinata",
            ProviderType::Holochain => "holochain",
            ProviderType::Ethereum => "ethereum",
            ProviderType::Solana => "solana",
            ProviderType::Arbitrum => "arbitrum",
            ProviderType::Eosio => "eosio",
            ProviderType::Hashgraph => "hashgraph",
            ProviderType::GoogleCloud => "googlecloud",
            ProviderType::AzureCosmosDb => "azurecosmosdb",
            ProviderType::Aws => "aws",
            ProviderType::ActivityPub => "activitypub",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider type: {0}")]
pub struct ParseProviderTypeError(pub String);

impl FromStr for ProviderType {
    type Err = ParseProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        ProviderType::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseProviderTypeError(s.trim().to_string()))
    }
}

/// A registered provider's routing-relevant settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Provider type tag.
    pub provider_type: ProviderType,
    /// Human-readable name.
    pub name: String,
    /// Deadline applied to every call against this provider.
    pub timeout: Duration,
}

impl ProviderDescriptor {
    /// Creates a descriptor.
    pub fn new(provider_type: ProviderType, name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider_type,
            name: name.into(),
            timeout,
        }
    }
}

/// Operation category selecting which failover list applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverCategory {
    /// General saves and loads.
    #[default]
    Default,
    /// Login lookups.
    Login,
    /// "Is this email in use" lookups.
    EmailLookup,
    /// "Is this username in use" lookups.
    UsernameLookup,
}

impl std::fmt::Display for FailoverCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailoverCategory::Default => write!(f, "default"),
            FailoverCategory::Login => write!(f, "login"),
            FailoverCategory::EmailLookup => write!(f, "email_lookup"),
            FailoverCategory::UsernameLookup => write!(f, "username_lookup"),
        }
    }
}

/// Strategy used to pick a provider for additional load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    /// Rotate through the load-balance list.
    RoundRobin,
    /// Provider with the fewest calls in flight.
    LeastConnections,
    /// Provider with the lowest rolling average response time.
    Performance,
    /// Performance when response samples exist, otherwise round robin.
    #[default]
    Auto,
}

impl std::fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadBalancingStrategy::RoundRobin => write!(f, "round_robin"),
            LoadBalancingStrategy::LeastConnections => write!(f, "least_connections"),
            LoadBalancingStrategy::Performance => write!(f, "performance"),
            LoadBalancingStrategy::Auto => write!(f, "auto"),
        }
    }
}
