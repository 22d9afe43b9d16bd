//! HyperDrive Persistence Router
//!
//! This crate stores records across a pluggable set of storage providers,
//! none of which is assumed to be reliable or always on. For every save and
//! load it decides which provider to try, in what order, with what timeout,
//! how to react to partial failure, and whether to copy a successful write
//! to more providers.
//!
//! # Features
//!
//! - **Ordered Failover**: the preferred provider, then each failover-list entry, until one succeeds
//! - **At-Least-One Writes**: partial failure is a warning; only total failure is an error
//! - **Replication**: concurrent fan-out of a successful write, awaited or detached
//! - **Load Balancing**: one extra detached write to a provider picked by strategy
//! - **Background Retry**: detached retries of saves that failed everywhere
//! - **Bounded Calls**: every provider call runs under its own deadline
//!
//! # Architecture
//!
//! - [`types`] - Records, provider identity, modes
//! - [`error`] - Error types for all operations
//! - [`config`] - Router configuration
//! - [`core`] - Provider and registry traits
//! - [`registry`] - In-process provider registry
//! - [`health`] - Per-provider call statistics
//! - [`router`] - The persistence router and its coordinators
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hyperdrive_persistence::config::RouterConfig;
//! use hyperdrive_persistence::router::{PersistenceRouter, SaveOptions};
//! use hyperdrive_persistence::types::{AutoMode, ProviderType, Record};
//! use serde_json::json;
//! use uuid::Uuid;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouterConfig::builder()
//!     .failover_list([ProviderType::MongoDb, ProviderType::Sqlite, ProviderType::Ipfs])
//!     .build()?;
//!
//! let (router, manager) = PersistenceRouter::from_config(config)?;
//! // manager.register(Arc::new(my_mongo_provider));
//! # let _ = Arc::clone(&manager);
//!
//! let record = Record::identity(Uuid::new_v4(), json!({"username": "alice"}));
//! let result = router
//!     .save(record, SaveOptions::new().with_replication(AutoMode::Enabled))
//!     .await?;
//!
//! if result.is_error() {
//!     eprintln!("{}", result.message());
//! } else if result.warning_count() > 0 {
//!     for message in result.inner_messages() {
//!         eprintln!("warning: {message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod registry;
pub mod router;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{ConfigError, RouterConfig};
pub use error::{ProviderError, RouterError, RouterResult};
pub use types::{AutoMode, ProviderType, Record, RecordKind, SaveMode};

// Re-export core traits
pub use core::{ProviderRegistry, StorageProvider};

pub use registry::ProviderManager;
pub use router::{LoadOptions, PersistenceRouter, RoutedResult, SaveOptions};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
