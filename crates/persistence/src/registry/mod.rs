//! In-process provider registry.
//!
//! [`ProviderManager`] is the concrete [`ProviderRegistry`](crate::core::ProviderRegistry)
//! used by services embedding the router. It owns:
//!
//! | Concern | Storage |
//! |---------|---------|
//! | Registered providers and their descriptors | `ProviderType -> (descriptor, provider)` |
//! | Current provider | single value, changed only by explicit calls |
//! | Failover lists | one per [`FailoverCategory`](crate::types::FailoverCategory) |
//! | Load-balance candidates and strategy | list + [`LoadBalancingStrategy`](crate::types::LoadBalancingStrategy) |
//! | Global auto-failover/replication/load-balance switches | atomics |
//!
//! Provider lists can also be given as comma-separated names, see
//! [`parse_provider_list`] and [`format_provider_list`].

mod list;
mod manager;
mod selection;

pub use list::{dedupe_providers, format_provider_list, parse_provider_list};
pub use manager::ProviderManager;
