//! Bounded-time provider calls.
//!
//! Each call runs on its own task. The router waits on that task under the
//! provider's deadline; when the deadline passes the task is detached, not
//! aborted, so the provider may still finish the write later.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::DynRegistry;
use crate::error::{ProviderError, RouterError, RouterResult};
use crate::health::HealthMonitor;
use crate::types::{ProviderType, Record, RecordKind, SaveMode};

/// How a single attempt ended.
#[derive(Debug, Clone)]
pub enum AttemptStatus {
    /// The provider returned a record.
    Success(Record),
    /// The provider failed or rejected the call.
    Error(ProviderError),
    /// The call did not finish before the deadline.
    Timeout(Duration),
}

/// The outcome of one provider attempt.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    provider: ProviderType,
    mode: SaveMode,
    status: AttemptStatus,
    message: Option<String>,
    elapsed: Duration,
}

impl AttemptOutcome {
    /// Returns the provider the attempt ran against.
    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    /// Returns why the attempt was made.
    pub fn mode(&self) -> SaveMode {
        self.mode
    }

    /// Returns how the attempt ended.
    pub fn status(&self) -> &AttemptStatus {
        &self.status
    }

    /// Returns true if the provider returned a record.
    pub fn is_success(&self) -> bool {
        matches!(self.status, AttemptStatus::Success(_))
    }

    /// Returns true if the attempt hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self.status, AttemptStatus::Timeout(_))
    }

    /// Returns the record on success.
    pub fn payload(&self) -> Option<&Record> {
        match &self.status {
            AttemptStatus::Success(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the failure message, if the attempt failed.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns how long the router waited for the attempt.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// A save given up on because the call was cancelled.
    pub(crate) fn abandoned(
        provider: ProviderType,
        record_id: Uuid,
        mode: SaveMode,
        elapsed: Duration,
    ) -> Self {
        let error =
            ProviderError::unavailable(provider, "call cancelled before the provider answered");
        let message = failure_message("saving", record_id, provider, mode, &error.to_string());
        Self {
            provider,
            mode,
            status: AttemptStatus::Error(error),
            message: Some(message),
            elapsed,
        }
    }
}

enum ProviderCall {
    Save(Record),
    Load { id: Uuid, kind: RecordKind },
}

impl ProviderCall {
    fn record_id(&self) -> Uuid {
        match self {
            ProviderCall::Save(record) => record.id(),
            ProviderCall::Load { id, .. } => *id,
        }
    }

    fn kind(&self) -> RecordKind {
        match self {
            ProviderCall::Save(record) => record.kind(),
            ProviderCall::Load { kind, .. } => *kind,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            ProviderCall::Save(_) => "saving",
            ProviderCall::Load { .. } => "loading",
        }
    }
}

fn failure_message(
    verb: &str,
    record_id: Uuid,
    provider: ProviderType,
    mode: SaveMode,
    reason: &str,
) -> String {
    format!("Error {verb} record {record_id} for provider {provider} during {mode}. Reason: {reason}.")
}

/// Runs provider calls under per-provider deadlines.
#[derive(Clone)]
pub struct TimedInvoker {
    registry: DynRegistry,
    health: Arc<HealthMonitor>,
    default_timeout: Duration,
}

impl TimedInvoker {
    /// Creates an invoker.
    pub fn new(registry: DynRegistry, health: Arc<HealthMonitor>, default_timeout: Duration) -> Self {
        Self {
            registry,
            health,
            default_timeout,
        }
    }

    /// Returns the deadline applied to calls against a provider.
    pub fn timeout_for(&self, provider: ProviderType) -> Duration {
        self.registry
            .descriptor(provider)
            .map(|d| d.timeout)
            .unwrap_or(self.default_timeout)
    }

    /// Saves a record to one provider.
    ///
    /// Returns `Err` only when `cancel` fires; provider failures are reported
    /// in the outcome.
    pub async fn save(
        &self,
        provider: ProviderType,
        record: &Record,
        mode: SaveMode,
        cancel: &CancellationToken,
    ) -> RouterResult<AttemptOutcome> {
        self.invoke(provider, ProviderCall::Save(record.clone()), mode, cancel)
            .await
    }

    /// Loads a record from one provider.
    pub async fn load(
        &self,
        provider: ProviderType,
        id: Uuid,
        kind: RecordKind,
        mode: SaveMode,
        cancel: &CancellationToken,
    ) -> RouterResult<AttemptOutcome> {
        self.invoke(provider, ProviderCall::Load { id, kind }, mode, cancel)
            .await
    }

    async fn invoke(
        &self,
        provider: ProviderType,
        call: ProviderCall,
        mode: SaveMode,
        cancel: &CancellationToken,
    ) -> RouterResult<AttemptOutcome> {
        let timeout = self.timeout_for(provider);
        let record_id = call.record_id();
        let kind = call.kind();
        let verb = call.verb();

        let guard = self.health.begin_call(provider);
        let registry = self.registry.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let activated = registry.activate(provider).await?;
            match call {
                ProviderCall::Save(record) => activated.save(&record).await,
                ProviderCall::Load { id, kind } => activated.load(id, kind).await,
            }
        });

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(provider = %provider, record_id = %record_id, "Provider call cancelled");
                return Err(RouterError::Cancelled);
            }
            joined = tokio::time::timeout(timeout, handle) => joined,
        };
        let elapsed = started.elapsed();

        let status = match joined {
            Ok(Ok(Ok(record))) if record.id() != record_id || record.kind() != kind => {
                AttemptStatus::Error(ProviderError::rejected(
                    provider,
                    format!(
                        "provider returned {} record {} instead of {} record {}",
                        record.kind(),
                        record.id(),
                        kind,
                        record_id
                    ),
                ))
            }
            Ok(Ok(Ok(record))) => AttemptStatus::Success(record),
            Ok(Ok(Err(e))) => AttemptStatus::Error(e),
            Ok(Err(join_error)) => AttemptStatus::Error(ProviderError::rejected(
                provider,
                format!("provider call failed: {join_error}"),
            )),
            Err(_) => AttemptStatus::Timeout(timeout),
        };

        let message = match &status {
            AttemptStatus::Success(_) => {
                self.health.record_success(provider, elapsed);
                debug!(
                    provider = %provider,
                    mode = %mode,
                    record_id = %record_id,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Provider call succeeded"
                );
                None
            }
            AttemptStatus::Error(_) | AttemptStatus::Timeout(_) => {
                let reason = match &status {
                    AttemptStatus::Error(e) => e.to_string(),
                    _ => ProviderError::Timeout { provider, timeout }.to_string(),
                };
                self.health.record_failure(provider, reason.clone());
                warn!(
                    provider = %provider,
                    mode = %mode,
                    record_id = %record_id,
                    error = %reason,
                    "Provider call failed"
                );
                Some(failure_message(verb, record_id, provider, mode, &reason))
            }
        };

        Ok(AttemptOutcome {
            provider,
            mode,
            status,
            message,
            elapsed,
        })
    }
}

impl std::fmt::Debug for TimedInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedInvoker")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl AttemptOutcome {
    pub(crate) fn for_test(provider: ProviderType, mode: SaveMode, status: AttemptStatus) -> Self {
        let message = match &status {
            AttemptStatus::Success(_) => None,
            AttemptStatus::Error(e) => Some(format!("Error for provider {provider}. Reason: {e}.")),
            AttemptStatus::Timeout(_) => Some(format!("Error for provider {provider}. Reason: timeout.")),
        };
        Self {
            provider,
            mode,
            status,
            message,
            elapsed: Duration::ZERO,
        }
    }
}
