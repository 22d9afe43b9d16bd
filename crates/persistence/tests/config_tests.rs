//! Configuration loading tests.
//!
//! Run with: `cargo test -p hyperdrive-persistence --test config_tests`

mod common;

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use hyperdrive_persistence::config::{ConfigError, RouterConfig, RoutingMode};
use hyperdrive_persistence::core::ProviderRegistry;
use hyperdrive_persistence::registry::parse_provider_list;
use hyperdrive_persistence::router::PersistenceRouter;
use hyperdrive_persistence::types::{FailoverCategory, LoadBalancingStrategy, ProviderType};

use common::*;

const CONFIG: &str = r#"{
    "storage_providers": {
        "current_provider": "sqlite",
        "call_timeout": "3s",
        "provider_timeouts": { "ipfs": "30s" },
        "auto_load_balance_enabled": false,
        "failover_list": ["mongodb", "sqlite", "ipfs"],
        "login_failover_list": ["sqlite"]
    },
    "background_retry": { "max_attempts": 5, "interval": "1m" },
    "routing": { "mode": "strategy_first", "strategy": "least_connections" }
}"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn test_from_file() {
    let file = write_config(CONFIG);

    let config = RouterConfig::from_file(file.path()).unwrap();

    let providers = &config.storage_providers;
    assert_eq!(providers.current_provider, Some(B));
    assert_eq!(providers.timeout_for(A), Duration::from_secs(3));
    assert_eq!(providers.timeout_for(C), Duration::from_secs(30));
    assert!(providers.auto_failover_enabled);
    assert!(!providers.auto_load_balance_enabled);
    assert_eq!(providers.failover_list(FailoverCategory::Login), [B]);
    assert_eq!(config.background_retry.max_attempts, 5);
    assert_eq!(config.background_retry.interval, Duration::from_secs(60));
    assert_eq!(config.routing.mode, RoutingMode::StrategyFirst);
    assert_eq!(config.routing.strategy, LoadBalancingStrategy::LeastConnections);
}

#[test]
fn test_from_missing_file() {
    let err = RouterConfig::from_file("/nonexistent/router.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_from_file_with_duplicates() {
    let file = write_config(
        r#"{ "storage_providers": { "failover_list": ["mongodb", "mongodb"] } }"#,
    );

    let err = RouterConfig::from_file(file.path()).unwrap_err();

    assert_eq!(
        err,
        ConfigError::DuplicateProvider {
            list: "failover_list".to_string(),
            provider: ProviderType::MongoDb,
        }
    );
}

#[test]
fn test_from_file_with_unknown_provider() {
    let file = write_config(r#"{ "storage_providers": { "failover_list": ["floppy"] } }"#);

    let err = RouterConfig::from_file(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// Router Construction
// ============================================================================

#[tokio::test]
async fn test_router_from_config_file() {
    let file = write_config(CONFIG);
    let config = RouterConfig::from_file(file.path()).unwrap();

    let (router, manager) = PersistenceRouter::from_config(config).unwrap();

    assert_eq!(router.current_provider_type(), B);
    assert_eq!(manager.failover_list(FailoverCategory::Default), vec![A, B, C]);
    assert_eq!(manager.failover_list(FailoverCategory::Login), vec![B]);
    assert_eq!(manager.failover_list(FailoverCategory::EmailLookup), vec![A, B, C]);
    assert!(!manager.is_auto_load_balance_enabled());

    let descriptor = manager.register(MockProvider::new(C, Behavior::Succeed));
    assert_eq!(descriptor.timeout, Duration::from_secs(30));
}

#[test]
fn test_router_from_config_without_current_provider() {
    let config = RouterConfig::builder().build().unwrap();

    let err = PersistenceRouter::from_config(config).unwrap_err();

    assert_eq!(err, ConfigError::NoCurrentProvider);
}

#[test]
fn test_current_provider_defaults_to_list_head() {
    let config = RouterConfig::builder().failover_list([C, A]).build().unwrap();

    let (router, _) = PersistenceRouter::from_config(config).unwrap();

    assert_eq!(router.current_provider_type(), C);
}

// ============================================================================
// Provider Lists
// ============================================================================

#[test]
fn test_failover_list_from_string() {
    let (_, manager) =
        PersistenceRouter::from_config(RouterConfig::builder().failover_list([A]).build().unwrap())
            .unwrap();

    manager
        .set_failover_list_from_str(FailoverCategory::Default, "Sqlite, IPFS, sqlite")
        .unwrap();

    assert_eq!(manager.failover_list(FailoverCategory::Default), vec![B, C]);
}

#[test]
fn test_invalid_list_names_every_bad_entry() {
    let err = parse_provider_list("MongoDB, Floppy, Tape").unwrap_err();

    assert_eq!(
        err,
        ConfigError::InvalidProviderList {
            invalid: vec!["Floppy".to_string(), "Tape".to_string()],
        }
    );
}
