//! Scripted mock storage providers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use hyperdrive_persistence::core::StorageProvider;
use hyperdrive_persistence::error::ProviderError;
use hyperdrive_persistence::types::{ProviderType, Record, RecordKind};

/// How a mock provider answers a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Store and return the record.
    Succeed,
    /// Return an explicit rejection.
    Reject(&'static str),
    /// Never complete.
    Hang,
    /// Fail activation.
    FailActivation,
    /// Succeed after a delay.
    Delay(Duration),
    /// Succeed, but answer loads by identifier alone, ignoring the kind.
    KindBlind,
}

/// A call received by a mock provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Activation.
    Activate,
    /// Save of the given record.
    Save(Uuid),
    /// Load of the given record.
    Load(Uuid),
}

/// A provider whose answers are scripted per call.
///
/// Scripted behaviors are consumed first, one per call; afterwards the
/// fallback behavior applies.
pub struct MockProvider {
    provider_type: ProviderType,
    script: Mutex<VecDeque<Behavior>>,
    fallback: Mutex<Behavior>,
    calls: Mutex<Vec<Call>>,
    store: Mutex<HashMap<(Uuid, RecordKind), Record>>,
}

impl MockProvider {
    /// Creates a provider with a fallback behavior.
    pub fn new(provider_type: ProviderType, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            provider_type,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
            store: Mutex::new(HashMap::new()),
        })
    }

    /// Queues a behavior for the next call.
    pub fn then(&self, behavior: Behavior) -> &Self {
        self.script.lock().push_back(behavior);
        self
    }

    /// Replaces the fallback behavior.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.fallback.lock() = behavior;
    }

    /// Seeds the store with a record.
    pub fn seed(&self, record: Record) {
        self.store.lock().insert((record.id(), record.kind()), record);
    }

    /// Returns every call received, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Returns the number of save calls.
    pub fn saves(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Save(_)))
            .count()
    }

    /// Returns the number of load calls.
    pub fn loads(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Load(_)))
            .count()
    }

    /// Returns the stored identity record, if any.
    pub fn stored(&self, id: Uuid) -> Option<Record> {
        self.stored_as(id, RecordKind::Identity)
    }

    /// Returns the stored record of a kind, if any.
    pub fn stored_as(&self, id: Uuid, kind: RecordKind) -> Option<Record> {
        self.store.lock().get(&(id, kind)).cloned()
    }

    fn put(&self, record: &Record) {
        self.store
            .lock()
            .insert((record.id(), record.kind()), record.clone());
    }

    fn peek(&self) -> Behavior {
        self.script
            .lock()
            .front()
            .cloned()
            .unwrap_or_else(|| self.fallback.lock().clone())
    }

    fn next(&self) -> Behavior {
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().clone())
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    async fn activate(&self) -> Result<(), ProviderError> {
        self.calls.lock().push(Call::Activate);
        if self.peek() == Behavior::FailActivation {
            self.next();
            return Err(ProviderError::unavailable(
                self.provider_type,
                "connection refused",
            ));
        }
        Ok(())
    }

    async fn save(&self, record: &Record) -> Result<Record, ProviderError> {
        self.calls.lock().push(Call::Save(record.id()));
        match self.next() {
            Behavior::Succeed | Behavior::KindBlind => {
                self.put(record);
                Ok(record.clone())
            }
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                self.put(record);
                Ok(record.clone())
            }
            Behavior::Reject(reason) => Err(ProviderError::rejected(self.provider_type, reason)),
            Behavior::Hang => std::future::pending().await,
            Behavior::FailActivation => Err(ProviderError::unavailable(
                self.provider_type,
                "not activated",
            )),
        }
    }

    async fn load(&self, id: Uuid, kind: RecordKind) -> Result<Record, ProviderError> {
        self.calls.lock().push(Call::Load(id));
        let not_found = ProviderError::NotFound {
            provider: self.provider_type,
            id,
        };
        match self.next() {
            Behavior::Succeed | Behavior::Delay(_) => {
                self.stored_as(id, kind).ok_or(not_found)
            }
            Behavior::KindBlind => self
                .store
                .lock()
                .iter()
                .find(|((stored_id, _), _)| *stored_id == id)
                .map(|(_, record)| record.clone())
                .ok_or(not_found),
            Behavior::Reject(reason) => Err(ProviderError::rejected(self.provider_type, reason)),
            Behavior::Hang => std::future::pending().await,
            Behavior::FailActivation => Err(ProviderError::unavailable(
                self.provider_type,
                "not activated",
            )),
        }
    }
}
