//! Detached retries of saves that failed on every provider.

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BackgroundRetryConfig;
use crate::error::RouterError;
use crate::types::Record;

use super::events::RouterEvent;
use super::options::SaveOptions;
use super::persistence::PersistenceRouter;

/// Re-runs a failed save a fixed number of times.
///
/// Best effort only: nothing is persisted between attempts, and the outcome
/// never reaches the caller of the original save. Router shutdown stops
/// pending retries.
pub(crate) struct BackgroundRetryScheduler {
    router: PersistenceRouter,
    config: BackgroundRetryConfig,
}

impl BackgroundRetryScheduler {
    pub(crate) fn new(router: PersistenceRouter, config: BackgroundRetryConfig) -> Self {
        Self { router, config }
    }

    pub(crate) fn schedule(self, record: Record, mut options: SaveOptions) -> JoinHandle<()> {
        let shutdown = self.router.shutdown_token();
        // Detached work follows router shutdown, not the caller's token.
        options.cancel = Some(shutdown.child_token());

        tokio::spawn(async move {
            let record_id = record.id();
            let max_attempts = self.config.max_attempts;

            for attempt in 1..=max_attempts {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!(record_id = %record_id, "Background retry stopped by shutdown");
                        return;
                    }
                    _ = tokio::time::sleep(self.config.interval) => {}
                }

                info!(
                    record_id = %record_id,
                    attempt,
                    max_attempts,
                    "Retrying save in background"
                );

                match self.router.save_once(&record, &options, Vec::new()).await {
                    Ok(result) if !result.is_error() => {
                        info!(
                            record_id = %record_id,
                            attempt,
                            provider = ?result.provider(),
                            "Background retry succeeded"
                        );
                        self.router.events().emit(RouterEvent::RetrySucceeded {
                            record_id,
                            attempt,
                            provider: result.provider(),
                        });
                        return;
                    }
                    Ok(result) => {
                        warn!(
                            record_id = %record_id,
                            attempt,
                            error = %result.message(),
                            "Background retry attempt failed"
                        );
                        self.router.events().emit(RouterEvent::RetryAttemptFailed {
                            record_id,
                            attempt,
                            message: result.message().to_string(),
                        });
                    }
                    Err(RouterError::Cancelled) => {
                        debug!(record_id = %record_id, "Background retry stopped by shutdown");
                        return;
                    }
                    Err(e) => {
                        warn!(
                            record_id = %record_id,
                            attempt,
                            error = %e,
                            "Background retry attempt failed"
                        );
                        self.router.events().emit(RouterEvent::RetryAttemptFailed {
                            record_id,
                            attempt,
                            message: e.to_string(),
                        });
                    }
                }
            }

            error!(
                record_id = %record_id,
                attempts = max_attempts,
                "All background retry attempts failed"
            );
            self.router.events().emit(RouterEvent::RetryExhausted {
                record_id,
                attempts: max_attempts,
            });
        })
    }
}
