//! # Backup Engine
//!
//! Replica lifecycle coordination for continuous backup replication of a
//! single-writer embedded database.
//!
//! ## Architecture
//!
//! The coordinator sits between a declarative replica configuration and the
//! external replication engine that does the actual log shipping:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           backup-engine                             │
//! │                                                                     │
//! │  ┌──────────┐    ┌─────────┐    ┌───────────────────────────────┐   │
//! │  │ Resolver │───►│ Factory │───►│ BackupEngine (coordinator)    │   │
//! │  │ (verify) │    │ (×N)    │    │ start in order / stop reverse │   │
//! │  └──────────┘    └─────────┘    └───────────────────────────────┘   │
//! │                       │                        │                    │
//! │                       ▼                        ▼                    │
//! │              ┌───────────────┐       ┌──────────────────┐           │
//! │              │ ReplicaClient │       │ BackupDaemon     │           │
//! │              │ (file / s3)   │       │ (name/start/stop)│           │
//! │              └───────────────┘       └──────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle Contract
//!
//! 1. **Construct**: resolve specs, build clients, bind tasks. Fail-fast;
//!    nothing started, so construction failures need no teardown.
//! 2. **Start**: open the source, start replica tasks in declared order. Any
//!    failure stops what started (reverse order) and returns the first error.
//! 3. **Stop**: signal cancellation, wait for teardown within the caller's
//!    deadline. A timeout is reported, not fatal; teardown finishes in the
//!    background and later stops stay idempotent.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backup_engine::{BackupConfig, BackupEngine, ReplicaSpec};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BackupConfig {
//!         replicas: vec![ReplicaSpec::file("local", "/var/backups/app-db")],
//!         ..Default::default()
//!     };
//!
//!     let engine = BackupEngine::standalone(&config).expect("invalid config");
//!     engine.start().await.expect("Failed to start");
//!
//!     // Engine runs until shutdown signal
//!     engine.stop(Duration::from_secs(10)).await.expect("Failed to stop");
//! }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod daemon;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod replication;
pub mod resolver;

// Re-exports for convenience
pub use client::{FileReplicaClient, ObjectStoreReplicaClient, ReplicaClient, ReplicaEntry};
pub use config::{BackupConfig, ReplicaSpec};
pub use coordinator::{BackupEngine, EngineState};
pub use daemon::{BackupDaemon, Daemon, DAEMON_NAME};
pub use error::{EngineError, Result};
pub use factory::ReplicaHandle;
pub use replication::{NoOpReplicationEngine, ReplicaTask, ReplicationEngineRef};
pub use resolver::{resolve, ReplicaDescriptor, ReplicaKind};
