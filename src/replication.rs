// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication engine integration traits.
//!
//! The engine that tails the source database and ships segments is an
//! external collaborator. This module defines what the coordinator needs
//! from it: open and close the source handle, and bind each constructed
//! replica into a startable/stoppable task.
//!
//! # Example
//!
//! ```rust,no_run
//! use backup_engine::replication::{ReplicationEngineRef, ReplicaTask, TaskResult, TaskFuture};
//! use backup_engine::factory::ReplicaHandle;
//! use std::future::Future;
//! use std::pin::Pin;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! struct MyEngine { /* ... */ }
//!
//! struct MyTask {
//!     name: String,
//! }
//!
//! impl ReplicationEngineRef for MyEngine {
//!     fn describe(&self) -> String {
//!         "my-source.db".to_string()
//!     }
//!
//!     fn open(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn close(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn bind(&self, handle: ReplicaHandle) -> TaskResult<Arc<dyn ReplicaTask>> {
//!         Ok(Arc::new(MyTask { name: handle.name }))
//!     }
//! }
//!
//! impl ReplicaTask for MyTask {
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//!
//!     fn start(&self, _shutdown: watch::Receiver<bool>) -> TaskFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn stop(&self, _graceful: bool) -> TaskFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//! }
//! ```

use crate::factory::ReplicaHandle;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

/// Result type for replication engine operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type TaskFuture<'a, T> = Pin<Box<dyn Future<Output = TaskResult<T>> + Send + 'a>>;

/// Simplified error for replication engine operations.
#[derive(Debug, Clone)]
pub struct TaskError(pub String);

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TaskError {}

/// Trait defining what we need from the replication engine.
///
/// The daemon provides an implementation of this trait, allowing us to:
/// 1. Open and close the source database handle (`open`/`close`)
/// 2. Bind constructed replica clients into runnable tasks (`bind`)
///
/// This trait allows testing with mocks and decouples us from the engine's
/// internals. The engine exclusively owns the source handle; the coordinator
/// only sequences open, task starts, task stops, and close.
pub trait ReplicationEngineRef: Send + Sync + 'static {
    /// Human-readable source identity for logs, e.g. a database path.
    fn describe(&self) -> String;

    /// Open the source database handle.
    ///
    /// Called once per coordinator lifetime, before any task starts.
    fn open(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>>;

    /// Close the source database handle.
    ///
    /// Called once per coordinator lifetime, after every started task has
    /// been given a stop attempt.
    fn close(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>>;

    /// Bind a constructed replica to the (possibly not-yet-open) source.
    ///
    /// Synchronous and I/O-free. The returned task owns its own sync loop;
    /// the coordinator only drives its start/stop lifecycle.
    fn bind(&self, handle: ReplicaHandle) -> TaskResult<Arc<dyn ReplicaTask>>;
}

/// One replica's lifecycle handle, as exposed by the replication engine.
///
/// Implementations run their own background sync loop. `start` returns once
/// the loop is confirmed running; the loop observes the shutdown signal
/// cooperatively and may finish an in-flight operation before exiting.
pub trait ReplicaTask: Send + Sync + 'static {
    /// The replica's configured name.
    fn name(&self) -> &str;

    /// Begin replicating. The task subscribes to `shutdown` and winds down
    /// its internal loop when the signal flips to `true`.
    fn start(&self, shutdown: watch::Receiver<bool>) -> TaskFuture<'_, ()>;

    /// Stop replicating and wait for the internal loop to drain.
    ///
    /// Must be idempotent. When `graceful` is false the task may abandon
    /// in-flight work instead of finishing it.
    fn stop(&self, graceful: bool) -> TaskFuture<'_, ()>;
}

/// A no-op implementation for testing/standalone mode.
///
/// Logs operations but doesn't replicate anything.
#[derive(Clone)]
pub struct NoOpReplicationEngine;

impl ReplicationEngineRef for NoOpReplicationEngine {
    fn describe(&self) -> String {
        "no-op source".to_string()
    }

    fn open(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!("NoOp: would open source database");
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!("NoOp: would close source database");
            Ok(())
        })
    }

    fn bind(&self, handle: ReplicaHandle) -> TaskResult<Arc<dyn ReplicaTask>> {
        Ok(Arc::new(NoOpReplicaTask {
            name: handle.name,
            target: handle.client.target(),
        }))
    }
}

struct NoOpReplicaTask {
    name: String,
    target: String,
}

impl ReplicaTask for NoOpReplicaTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, _shutdown: watch::Receiver<bool>) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            tracing::debug!(
                replica = %self.name,
                target = %self.target,
                "NoOp: would start replicating"
            );
            Ok(())
        })
    }

    fn stop(&self, graceful: bool) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            tracing::debug!(replica = %self.name, graceful, "NoOp: would stop replicating");
            Ok(())
        })
    }
}
