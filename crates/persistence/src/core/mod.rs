//! Collaborator contracts for the persistence router.
//!
//! - [`StorageProvider`] - a backend capable of persisting and loading records
//! - [`ActivatedProvider`] - a provider made ready for calls, with its descriptor
//! - [`ProviderRegistry`] - the provider catalog, failover lists and global switches
//!
//! # Example: Implementing a Provider
//!
//! ```ignore
//! use async_trait::async_trait;
//! use hyperdrive_persistence::core::StorageProvider;
//! use hyperdrive_persistence::error::ProviderError;
//! use hyperdrive_persistence::types::{ProviderType, Record, RecordKind};
//! use uuid::Uuid;
//!
//! struct MongoProvider {
//!     // ... driver handle
//! }
//!
//! #[async_trait]
//! impl StorageProvider for MongoProvider {
//!     fn provider_type(&self) -> ProviderType {
//!         ProviderType::MongoDb
//!     }
//!
//!     async fn save(&self, record: &Record) -> Result<Record, ProviderError> {
//!         // upsert by record.id()
//!     }
//!
//!     async fn load(&self, id: Uuid, kind: RecordKind) -> Result<Record, ProviderError> {
//!         // find by id
//!     }
//! }
//! ```

mod provider;
mod registry;

pub use provider::{ActivatedProvider, DynProvider, StorageProvider};
pub use registry::{DynRegistry, ProviderRegistry};
