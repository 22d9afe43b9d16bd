//! Test fixtures for router testing.

use serde_json::{Value, json};
use uuid::Uuid;

use hyperdrive_persistence::types::{ProviderType, Record};

/// Provider used as "A" in scenarios.
pub const A: ProviderType = ProviderType::MongoDb;
/// Provider used as "B" in scenarios.
pub const B: ProviderType = ProviderType::Sqlite;
/// Provider used as "C" in scenarios.
pub const C: ProviderType = ProviderType::Ipfs;
/// Provider used as "D" in scenarios.
pub const D: ProviderType = ProviderType::Neo4j;

/// An identity payload.
pub fn identity_payload(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "karma": 0
    })
}

/// A fresh identity record.
pub fn identity_record(username: &str) -> Record {
    Record::identity(Uuid::new_v4(), identity_payload(username))
}

/// A detail record sharing an identity's identifier.
pub fn detail_record(identity: &Record) -> Record {
    Record::detail(
        identity.id(),
        json!({
            "address": "1 Main Street",
            "level": 1
        }),
    )
}
