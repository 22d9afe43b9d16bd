//! Fan-out of a successful write to the rest of the failover list.

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{ProviderType, Record, SaveMode};

use super::events::{EventBus, RouterEvent};
use super::invoker::{AttemptOutcome, TimedInvoker};

/// Outcomes of one replication round.
#[derive(Debug, Clone)]
pub struct ReplicationReport {
    record_id: Uuid,
    source: ProviderType,
    outcomes: Vec<AttemptOutcome>,
}

impl ReplicationReport {
    /// Returns the replicated record's identifier.
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Returns the provider holding the primary write.
    pub fn source(&self) -> ProviderType {
        self.source
    }

    /// Returns one outcome per target, in target order.
    pub fn outcomes(&self) -> &[AttemptOutcome] {
        &self.outcomes
    }

    /// Returns the targets that accepted the replica.
    pub fn succeeded(&self) -> Vec<ProviderType> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(AttemptOutcome::provider)
            .collect()
    }

    /// Returns the targets that failed.
    pub fn failed(&self) -> Vec<ProviderType> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(AttemptOutcome::provider)
            .collect()
    }

    pub(crate) fn into_outcomes(self) -> Vec<AttemptOutcome> {
        self.outcomes
    }
}

/// Writes a record to every replication target concurrently.
///
/// Target failures are warnings only; the primary write already succeeded.
pub(crate) struct ReplicationCoordinator {
    invoker: TimedInvoker,
}

impl ReplicationCoordinator {
    pub(crate) fn new(invoker: TimedInvoker) -> Self {
        Self { invoker }
    }

    /// Replicates and waits for every target.
    ///
    /// Cancellation ends replication without failing it: targets still
    /// pending are reported as failed, since the primary write already holds.
    pub(crate) async fn replicate(
        &self,
        record: &Record,
        source: ProviderType,
        targets: &[ProviderType],
        cancel: &CancellationToken,
    ) -> ReplicationReport {
        let mut tasks: JoinSet<(usize, AttemptOutcome)> = JoinSet::new();

        for (index, target) in targets.iter().copied().enumerate() {
            let invoker = self.invoker.clone();
            let record = record.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let started = Instant::now();
                let outcome = match invoker
                    .save(target, &record, SaveMode::AutoReplication, &cancel)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => AttemptOutcome::abandoned(
                        target,
                        record.id(),
                        SaveMode::AutoReplication,
                        started.elapsed(),
                    ),
                };
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(indexed) => outcomes.push(indexed),
                Err(e) => {
                    warn!(error = %e, "Replication task failed");
                }
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let report = ReplicationReport {
            record_id: record.id(),
            source,
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        let failed = report.failed();
        if failed.is_empty() {
            info!(
                record_id = %report.record_id,
                source = %source,
                targets = targets.len(),
                "Record replicated to all targets"
            );
        } else {
            warn!(
                record_id = %report.record_id,
                source = %source,
                failed = ?failed,
                "Record replication failed for some targets"
            );
        }

        report
    }

    /// Replicates on a detached task and reports through `events`.
    pub(crate) fn spawn_detached(
        self,
        record: Record,
        source: ProviderType,
        targets: Vec<ProviderType>,
        cancel: CancellationToken,
        events: EventBus,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let report = self.replicate(&record, source, &targets, &cancel).await;
            if cancel.is_cancelled() {
                debug!(record_id = %record.id(), "Detached replication stopped by shutdown");
                return;
            }
            events.emit(RouterEvent::ReplicationCompleted(report));
        })
    }
}
