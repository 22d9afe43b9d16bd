//! Test infrastructure for the persistence router.
//!
//! This module provides scripted mock providers, router harnesses and
//! assertion helpers shared by the integration tests.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod fixtures;
pub mod harness;
pub mod providers;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
pub use providers::*;
