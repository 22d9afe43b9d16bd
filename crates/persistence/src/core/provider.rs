//! Storage provider trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::types::{ProviderDescriptor, ProviderType, Record, RecordKind};

/// A backend storage provider.
///
/// Implementations report every failure as a [`ProviderError`]. An explicit
/// rejection and an empty result are both [`ProviderError::Rejected`] or
/// [`ProviderError::NotFound`], never an `Ok` with placeholder data.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns the provider type tag.
    fn provider_type(&self) -> ProviderType;

    /// Returns a human-readable name.
    fn name(&self) -> String {
        self.provider_type().to_string()
    }

    /// Makes the provider ready to receive calls.
    ///
    /// Called before every routed call. Implementations should make repeated
    /// activation cheap.
    async fn activate(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Persists a record and returns the stored version.
    ///
    /// The stored record must keep the identifier it was given.
    async fn save(&self, record: &Record) -> Result<Record, ProviderError>;

    /// Loads a record by identifier.
    async fn load(&self, id: Uuid, kind: RecordKind) -> Result<Record, ProviderError>;
}

/// Type alias for a shared provider.
pub type DynProvider = Arc<dyn StorageProvider>;

/// A provider that has been activated for a call.
#[derive(Clone)]
pub struct ActivatedProvider {
    descriptor: ProviderDescriptor,
    provider: DynProvider,
}

impl ActivatedProvider {
    /// Wraps an activated provider.
    pub fn new(descriptor: ProviderDescriptor, provider: DynProvider) -> Self {
        Self {
            descriptor,
            provider,
        }
    }

    /// Returns the provider descriptor.
    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    /// Returns the provider type.
    pub fn provider_type(&self) -> ProviderType {
        self.descriptor.provider_type
    }

    /// Returns the call deadline.
    pub fn timeout(&self) -> Duration {
        self.descriptor.timeout
    }

    /// Saves a record.
    pub async fn save(&self, record: &Record) -> Result<Record, ProviderError> {
        self.provider.save(record).await
    }

    /// Loads a record.
    pub async fn load(&self, id: Uuid, kind: RecordKind) -> Result<Record, ProviderError> {
        self.provider.load(id, kind).await
    }
}

impl std::fmt::Debug for ActivatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivatedProvider")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
