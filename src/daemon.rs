// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Daemon adapter.
//!
//! Translates the coordinator's lifecycle into the three-operation contract a
//! host process supervisor expects: a static name for registration, a start
//! that blocks until the unit is confirmed running or failed, and a
//! deadline-bounded stop. No state of its own.

use crate::coordinator::BackupEngine;
use crate::error::Result;
use crate::replication::ReplicationEngineRef;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Registration name of the backup unit.
pub const DAEMON_NAME: &str = "backup-replication";

/// The background-unit contract a host process supervisor drives.
///
/// Boxed-future methods so hosts can register heterogeneous units behind
/// `Box<dyn Daemon>`.
pub trait Daemon: Send + Sync {
    /// Static identifier for logging and registration.
    fn name(&self) -> &str;

    /// Start the unit. Resolves once the unit is confirmed running or
    /// confirmed failed; never blocks for the unit's lifetime.
    fn start(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop the unit, waiting at most `deadline` for completion.
    fn stop(&self, deadline: Duration) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Daemon adapter over a [`BackupEngine`].
pub struct BackupDaemon<E: ReplicationEngineRef> {
    engine: BackupEngine<E>,
}

impl<E: ReplicationEngineRef> BackupDaemon<E> {
    /// Wrap a constructed coordinator.
    pub fn new(engine: BackupEngine<E>) -> Self {
        Self { engine }
    }

    /// The wrapped coordinator, for state inspection.
    pub fn engine(&self) -> &BackupEngine<E> {
        &self.engine
    }
}

impl<E: ReplicationEngineRef> Daemon for BackupDaemon<E> {
    fn name(&self) -> &str {
        DAEMON_NAME
    }

    fn start(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.engine.start())
    }

    fn stop(&self, deadline: Duration) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.engine.stop(deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupConfig;
    use crate::coordinator::EngineState;

    fn daemon(dir: &tempfile::TempDir) -> BackupDaemon<crate::replication::NoOpReplicationEngine> {
        let config = BackupConfig::for_testing(dir.path().join("replica").to_str().unwrap());
        BackupDaemon::new(BackupEngine::standalone(&config).unwrap())
    }

    #[test]
    fn test_daemon_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(daemon(&dir).name(), "backup-replication");
    }

    #[tokio::test]
    async fn test_daemon_start_stop() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = daemon(&dir);

        daemon.start().await.unwrap();
        assert!(daemon.engine().is_running());

        daemon.stop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(daemon.engine().state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_daemon_usable_through_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let daemon: Box<dyn Daemon> = Box::new(daemon(&dir));

        assert_eq!(daemon.name(), "backup-replication");
        daemon.start().await.unwrap();
        daemon.stop(Duration::from_secs(5)).await.unwrap();
    }
}
