//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - A recording mock replication engine with failure injection
//! - Config builders for multi-replica setups

pub mod mock_engine;

pub use mock_engine::*;

use backup_engine::{BackupConfig, ReplicaSpec};

/// Build a config with one file replica per name, each rooted in its own
/// subdirectory of `dir`.
pub fn config_with_replicas(dir: &tempfile::TempDir, names: &[&str]) -> BackupConfig {
    BackupConfig {
        replicas: names
            .iter()
            .map(|name| ReplicaSpec::file(name, dir.path().join(name).to_str().unwrap()))
            .collect(),
        ..Default::default()
    }
}
