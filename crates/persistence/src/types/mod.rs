//! Core types shared by the router and its collaborators.
//!
//! - [`Record`] - the unit of persistence routed between providers
//! - [`ProviderType`] / [`ProviderDescriptor`] - provider identity and call settings
//! - [`AutoMode`] / [`SaveMode`] - per-call policy switches and attempt tags
//! - [`FailoverCategory`] / [`LoadBalancingStrategy`] - list selection and balancing policy

mod mode;
mod provider;
mod record;

pub use mode::{AutoMode, SaveMode};
pub use provider::{
    FailoverCategory, LoadBalancingStrategy, ParseProviderTypeError, ProviderDescriptor,
    ProviderType,
};
pub use record::{Record, RecordKind};
