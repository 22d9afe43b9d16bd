//! Notifications for work that outlives the routed call.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::ProviderType;

use super::replication::ReplicationReport;

const EVENT_CAPACITY: usize = 64;

/// Outcome of detached router work.
///
/// Detached replication, load balancing and background retries never change
/// a result already returned to the caller. They report here and in the log.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A detached replication round finished.
    ReplicationCompleted(ReplicationReport),

    /// A load-balance write succeeded.
    LoadBalanced {
        /// The balanced record.
        record_id: Uuid,
        /// The provider that received the extra write.
        provider: ProviderType,
        /// Informational message.
        message: String,
    },

    /// A load-balance write failed.
    LoadBalanceFailed {
        /// The record.
        record_id: Uuid,
        /// The selected provider.
        provider: ProviderType,
        /// Why the write failed.
        reason: String,
    },

    /// A background retry saved the record.
    RetrySucceeded {
        /// The record.
        record_id: Uuid,
        /// 1-based retry number.
        attempt: u32,
        /// The provider that accepted the write.
        provider: Option<ProviderType>,
    },

    /// A background retry failed on every provider.
    RetryAttemptFailed {
        /// The record.
        record_id: Uuid,
        /// 1-based retry number.
        attempt: u32,
        /// The routed result message.
        message: String,
    },

    /// Every background retry failed.
    RetryExhausted {
        /// The record.
        record_id: Uuid,
        /// Number of retries made.
        attempts: u32,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<RouterEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub(crate) fn emit(&self, event: RouterEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }
}
