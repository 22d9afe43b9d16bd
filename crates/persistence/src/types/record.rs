//! The persisted record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Which half of a logical record a [`Record`] holds.
///
/// Identity and detail documents share the same identifier so the two stay
/// correlated across every provider they are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// The identity/profile document.
    #[default]
    Identity,
    /// The detail document keyed by the identity's identifier.
    Detail,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Identity => write!(f, "identity"),
            RecordKind::Detail => write!(f, "detail"),
        }
    }
}

/// A record routed to one or more storage providers.
///
/// The router never inspects the payload. It only relies on the identifier,
/// which stays the same on every provider the record is written to, and on
/// the modification metadata it stamps before the first attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: Uuid,
    kind: RecordKind,
    modified_at: Option<DateTime<Utc>>,
    modified_by: Option<Uuid>,
    payload: Value,
}

impl Record {
    /// Creates a new record with no modification metadata.
    pub fn new(id: Uuid, kind: RecordKind, payload: Value) -> Self {
        Self {
            id,
            kind,
            modified_at: None,
            modified_by: None,
            payload,
        }
    }

    /// Creates an identity record.
    pub fn identity(id: Uuid, payload: Value) -> Self {
        Self::new(id, RecordKind::Identity, payload)
    }

    /// Creates a detail record.
    pub fn detail(id: Uuid, payload: Value) -> Self {
        Self::new(id, RecordKind::Detail, payload)
    }

    /// Returns the record identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the record kind.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns when the record was last stamped, if ever.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    /// Returns the actor that last modified the record, if known.
    pub fn modified_by(&self) -> Option<Uuid> {
        self.modified_by
    }

    /// Returns the opaque payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the record, returning the payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Sets the modifying actor.
    pub fn with_modified_by(mut self, actor: Uuid) -> Self {
        self.modified_by = Some(actor);
        self
    }

    /// Stamps the modification time and actor.
    ///
    /// When no actor is given the record's own identifier is used, so a
    /// self-service write is attributed to the record owner.
    pub fn stamp(&mut self, actor: Option<Uuid>) {
        self.modified_at = Some(Utc::now());
        self.modified_by = Some(actor.unwrap_or(self.id));
    }
}
