//! Multi-provider persistence routing.
//!
//! [`PersistenceRouter`] decides, for every save and load, which providers
//! to call, in what order, under which deadline, and what to do after a
//! partial failure.
//!
//! # Save Phases
//!
//! | Phase | Attempt tag | Runs | On failure |
//! |-------|-------------|------|------------|
//! | Preferred provider | [`SaveMode::FirstAttempt`](crate::types::SaveMode) | always | warning, continue |
//! | Failover list, in order | `AutoFailover` | failover enabled, no success yet | warning, continue |
//! | Replication to remaining list entries | `AutoReplication` | replication enabled, after success | warning only |
//! | One extra write to a load-balance pick | `AutoLoadBalance` | load balancing enabled, after success | log and event only |
//! | Background retry of the whole save | - | every provider failed | log and event only |
//!
//! The primary write always completes before any replica write begins.
//! Replication fans out concurrently and is either awaited or detached;
//! load balancing and background retries are always detached and report
//! through [`PersistenceRouter::subscribe`].
//!
//! # Components
//!
//! - [`TimedInvoker`] - one provider call under a deadline
//! - [`ResultAggregator`] / [`RoutedResult`] - folding attempts into one result
//! - [`RoutingStrategySelector`] / [`AutoStrategyRouter`] - the optional front door
//! - [`RouterEvent`] - outcomes of detached work

mod events;
mod invoker;
mod load_balance;
mod options;
mod persistence;
mod replication;
mod result;
mod retry;
mod strategy;

pub use events::RouterEvent;
pub use invoker::{AttemptOutcome, AttemptStatus, TimedInvoker};
pub use options::{LoadOptions, SaveOptions};
pub use persistence::PersistenceRouter;
pub use replication::ReplicationReport;
pub use result::{Operation, ResultAggregator, RoutedResult};
pub use strategy::{AutoStrategyRouter, RoutingRequest, RoutingStrategySelector};
