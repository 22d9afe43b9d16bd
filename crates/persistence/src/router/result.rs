//! Aggregation of attempt outcomes into one routed result.

use uuid::Uuid;

use crate::registry::format_provider_list;
use crate::types::{ProviderType, Record};

use super::invoker::AttemptOutcome;
use super::replication::ReplicationReport;

/// The operation a result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A routed save.
    Save,
    /// A routed load.
    Load,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Load => "load",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Operation::Save => "saved",
            Operation::Load => "loaded",
        }
    }
}

/// The aggregate result of a routed call.
///
/// `is_error()` holds exactly when no attempt produced a record. A result can
/// carry warnings and still be a success: some providers failed, but at
/// least one holds the record.
#[derive(Debug, Clone)]
pub struct RoutedResult {
    operation: Operation,
    record_id: Uuid,
    payload: Option<Record>,
    provider: Option<ProviderType>,
    warning_count: usize,
    inner_messages: Vec<String>,
    message: String,
    detailed_message: Option<String>,
    attempts: Vec<AttemptOutcome>,
}

impl RoutedResult {
    /// Returns the operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the record identifier the call was routed for.
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Returns the record, if any attempt succeeded.
    pub fn payload(&self) -> Option<&Record> {
        self.payload.as_ref()
    }

    /// Consumes the result, returning the record.
    pub fn into_payload(self) -> Option<Record> {
        self.payload
    }

    /// Returns true if every attempt failed.
    pub fn is_error(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns true if a save reached at least one provider.
    pub fn is_saved(&self) -> bool {
        self.operation == Operation::Save && self.payload.is_some()
    }

    /// Returns the provider that produced the record.
    pub fn provider(&self) -> Option<ProviderType> {
        self.provider
    }

    /// Returns the number of failed attempts.
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Returns one message per failed attempt, in attempt order, followed by
    /// informational notes.
    pub fn inner_messages(&self) -> &[String] {
        &self.inner_messages
    }

    /// Returns the top-level message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the message with every inner error appended, on failure.
    pub fn detailed_message(&self) -> Option<&str> {
        self.detailed_message.as_deref()
    }

    /// Returns every attempt made, in order.
    pub fn attempts(&self) -> &[AttemptOutcome] {
        &self.attempts
    }
}

/// Folds attempt outcomes into a [`RoutedResult`].
///
/// Every failure is kept: it increments the warning count and appends its
/// message. Whether the call as a whole failed is decided only in
/// [`finish`](Self::finish), once no further attempt will be made.
#[derive(Debug)]
pub struct ResultAggregator {
    operation: Operation,
    record_id: Uuid,
    attempts: Vec<AttemptOutcome>,
    inner_messages: Vec<String>,
    notes: Vec<String>,
    warning_count: usize,
    winner: Option<usize>,
    failed_providers: Vec<ProviderType>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    pub fn new(operation: Operation, record_id: Uuid) -> Self {
        Self {
            operation,
            record_id,
            attempts: Vec::new(),
            inner_messages: Vec::new(),
            notes: Vec::new(),
            warning_count: 0,
            winner: None,
            failed_providers: Vec::new(),
        }
    }

    /// Records one attempt. The first success becomes the result payload.
    pub fn record(&mut self, outcome: AttemptOutcome) {
        if outcome.is_success() {
            if self.winner.is_none() {
                self.winner = Some(self.attempts.len());
            }
        } else {
            self.warning_count += 1;
            self.failed_providers.push(outcome.provider());
            if let Some(message) = outcome.message() {
                self.inner_messages.push(message.to_string());
            }
        }
        self.attempts.push(outcome);
    }

    /// Records every outcome of a replication round.
    pub fn record_replication(&mut self, report: ReplicationReport) {
        for outcome in report.into_outcomes() {
            self.record(outcome);
        }
    }

    /// Appends an informational message that is not a warning.
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// Returns true once an attempt has succeeded.
    pub fn has_success(&self) -> bool {
        self.winner.is_some()
    }

    /// Returns the winning provider and its record.
    pub fn winner(&self) -> Option<(ProviderType, &Record)> {
        let outcome = &self.attempts[self.winner?];
        outcome.payload().map(|record| (outcome.provider(), record))
    }

    /// Returns the providers attempted so far, in order, without repeats.
    pub fn attempted_providers(&self) -> Vec<ProviderType> {
        let mut providers: Vec<ProviderType> = Vec::with_capacity(self.attempts.len());
        for attempt in &self.attempts {
            if !providers.contains(&attempt.provider()) {
                providers.push(attempt.provider());
            }
        }
        providers
    }

    /// Finalizes the result.
    pub fn finish(self) -> RoutedResult {
        let winner = self.winner().map(|(p, record)| (p, record.clone()));
        let attempted = self.attempted_providers();
        let operation = self.operation;
        let record_id = self.record_id;

        let (payload, provider, message, detailed_message) = match winner {
            None => {
                let message = format!(
                    "All registered providers in the failover list failed to {} record {}. Providers tried: {}",
                    operation.verb(),
                    record_id,
                    format_provider_list(&attempted),
                );
                let detailed = format!(
                    "{}\n\nError Message: {}",
                    message,
                    self.inner_messages.join("\n\n")
                );
                (None, None, message, Some(detailed))
            }
            Some((provider, record)) if self.warning_count > 0 => {
                let message = format!(
                    "Record {} successfully {} for the provider {} but failed to {} for some of the other providers in the failover list: {}",
                    record_id,
                    operation.past_tense(),
                    provider,
                    operation.verb(),
                    format_provider_list(&self.failed_providers),
                );
                (Some(record), Some(provider), message, None)
            }
            Some((provider, record)) => {
                let message = format!("Record successfully {}.", operation.past_tense());
                (Some(record), Some(provider), message, None)
            }
        };

        let mut inner_messages = self.inner_messages;
        inner_messages.extend(self.notes);

        RoutedResult {
            operation,
            record_id,
            payload,
            provider,
            warning_count: self.warning_count,
            inner_messages,
            message,
            detailed_message,
            attempts: self.attempts,
        }
    }
}
