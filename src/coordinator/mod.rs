// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backup engine coordinator.
//!
//! The main orchestrator that ties together:
//! - Replica validation via [`crate::resolver`]
//! - Client construction via [`crate::factory`]
//! - Replica tasks via [`crate::replication::ReplicationEngineRef`]
//!
//! # Architecture
//!
//! The coordinator manages the full backup lifecycle for one source database:
//! 1. Resolves and builds every configured replica at construction time
//! 2. Opens the source and starts replica tasks in declared order
//! 3. On any startup failure, stops what started and reports the error
//! 4. Handles graceful shutdown: tasks stopped in reverse start order,
//!    then the source closed, bounded by the caller's deadline

mod types;

pub use types::EngineState;

use crate::config::BackupConfig;
use crate::error::{EngineError, Result};
use crate::metrics;
use crate::replication::{NoOpReplicationEngine, ReplicaTask, ReplicationEngineRef};
use crate::{factory, resolver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{error, info, warn, Instrument};

/// The backup lifecycle coordinator.
///
/// One `BackupEngine` supervises one source database and its ordered set of
/// replicas. Construction resolves the config and builds every replica client
/// eagerly, so a misconfigured replica fails before anything runs.
///
/// # Startup and Shutdown Contract
///
/// - [`start()`](Self::start) returns once every replica task is confirmed
///   running, or with the first error after fail-fast teardown has been
///   triggered. It never blocks for the service lifetime.
/// - [`stop()`](Self::stop) signals shutdown and waits up to the caller's
///   deadline. Stop order is the reverse of start order, and the source is
///   closed only after every started task has been given a stop attempt.
/// - Both calls take `&self`; stop is safe to call at any point, any number
///   of times, including before or racing `start()`.
pub struct BackupEngine<E: ReplicationEngineRef = NoOpReplicationEngine> {
    /// Source database handle, exclusively owned while open.
    engine: Arc<E>,

    /// Replica tasks in declaration order. Bound, not started.
    tasks: Vec<Arc<dyn ReplicaTask>>,

    /// Engine state (broadcast to watchers)
    state_tx: watch::Sender<EngineState>,

    /// Engine state receiver (for internal use)
    state_rx: watch::Receiver<EngineState>,

    /// Lifecycle cancellation signal. Shared by the fatal-error path and
    /// external stop; re-sending is a no-op.
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    /// "Shutdown complete" broadcast, fired exactly once as the supervisor's
    /// final action.
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,

    /// Single-use startup permit. Taken by the first `start()`; also taken
    /// by a `stop()` that arrives before any start, so the two can never
    /// both win.
    startup_permit: Mutex<Option<()>>,

    /// Injected logging sink. All supervisor and stop work is instrumented
    /// with this span; the crate never touches global logging state.
    span: tracing::Span,
}

impl<E: ReplicationEngineRef> std::fmt::Debug for BackupEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupEngine")
            .field("source", &self.engine.describe())
            .field("state", &self.state())
            .field("replicas", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl BackupEngine<NoOpReplicationEngine> {
    /// Create a coordinator with the no-op replication engine (for
    /// testing/standalone use), logging into the current span.
    pub fn standalone(config: &BackupConfig) -> Result<Self> {
        Self::new(config, Arc::new(NoOpReplicationEngine), tracing::Span::current())
    }
}

impl<E: ReplicationEngineRef> BackupEngine<E> {
    /// Create a coordinator from a validated config.
    ///
    /// This is the primary constructor used by the daemon. Resolution,
    /// client construction, and task binding all happen here, in declared
    /// order, stopping at the first failure; nothing has started yet, so a
    /// construction failure needs no teardown.
    ///
    /// # Arguments
    /// * `config` - Declarative replica configuration (immutable from here on)
    /// * `engine` - The external replication engine owning the source handle
    /// * `span` - Logging sink; all diagnostics are emitted inside this span
    pub fn new(config: &BackupConfig, engine: Arc<E>, span: tracing::Span) -> Result<Self> {
        let _guard = span.enter();

        let descriptors = resolver::resolve(config)?;

        let mut tasks: Vec<Arc<dyn ReplicaTask>> = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let handle = factory::build(descriptor)?;
            info!(
                replica = %handle.name,
                kind = %handle.client.kind(),
                target = %handle.client.target(),
                "Configured replica"
            );
            let task = engine.bind(handle).map_err(|e| {
                EngineError::replica_start(&descriptor.name, format!("bind failed: {e}"))
            })?;
            tasks.push(task);
        }

        metrics::set_configured_replicas(tasks.len());

        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        info!(
            source = %engine.describe(),
            replicas = tasks.len(),
            "Backup engine created"
        );

        drop(_guard);
        Ok(Self {
            engine,
            tasks,
            state_tx,
            state_rx,
            shutdown_tx,
            shutdown_rx,
            done_tx,
            done_rx,
            startup_permit: Mutex::new(Some(())),
            span,
        })
    }

    /// Get current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if engine is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// Number of configured replicas.
    pub fn replica_count(&self) -> usize {
        self.tasks.len()
    }

    /// Get a reference to the replication engine.
    pub fn replication_engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Start the backup engine.
    ///
    /// Opens the source database, then starts each replica task in declared
    /// order, one at a time. Returns `Ok` once every task is confirmed
    /// running. On the first failure, tasks not yet reached are never
    /// started, the shutdown signal fires so the supervisor tears down
    /// whatever did start (reverse order), and the first error is returned.
    ///
    /// Only legal once, from `Created`; later calls fail with
    /// [`EngineError::InvalidState`].
    pub async fn start(&self) -> Result<()> {
        {
            let mut permit = self.startup_permit.lock().await;
            if permit.take().is_none() {
                return Err(EngineError::InvalidState {
                    expected: "Created".to_string(),
                    actual: self.state().to_string(),
                });
            }
        }

        let started_at = Instant::now();
        self.span.in_scope(|| {
            info!(
                source = %self.engine.describe(),
                replicas = self.tasks.len(),
                "Starting backup engine"
            );
        });

        let _ = self.state_tx.send(EngineState::Starting);
        metrics::set_engine_state("Starting");

        let (ready_tx, ready_rx) = oneshot::channel();

        let supervisor = Supervisor {
            engine: Arc::clone(&self.engine),
            tasks: self.tasks.clone(),
            state_tx: self.state_tx.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            shutdown_rx: self.shutdown_rx.clone(),
            done_tx: self.done_tx.clone(),
        };
        tokio::spawn(supervisor.run(ready_tx).instrument(self.span.clone()));

        let result = ready_rx.await.unwrap_or_else(|_| {
            Err(EngineError::source(
                "open",
                "supervisor exited before confirming startup",
            ))
        });

        self.span.in_scope(|| match &result {
            Ok(()) => {
                metrics::record_startup_duration(started_at.elapsed());
                info!(
                    replicas = self.tasks.len(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Backup engine running"
                );
            }
            Err(e) => {
                error!(error = %e, "Backup engine failed to start");
            }
        });
        result
    }

    /// Stop the backup engine.
    ///
    /// Idempotently signals shutdown, then waits for the supervisor's
    /// "shutdown complete" broadcast, bounded by `deadline`. A deadline
    /// elapsing first yields [`EngineError::StopTimeout`]; the background
    /// teardown keeps running and a later `stop()` with a larger deadline
    /// observes the same completion signal.
    pub async fn stop(&self, deadline: Duration) -> Result<()> {
        self.span.in_scope(|| {
            info!(state = %self.state(), deadline = ?deadline, "Stopping backup engine");
        });

        let _ = self.shutdown_tx.send(true);

        // A stop that wins the startup permit means no supervisor ever
        // launched; shutdown completes inline.
        {
            let mut permit = self.startup_permit.lock().await;
            if permit.take().is_some() {
                let _ = self.state_tx.send(EngineState::Stopped);
                metrics::set_engine_state("Stopped");
                let _ = self.done_tx.send(true);
                self.span.in_scope(|| info!("Backup engine stopped (never started)"));
                return Ok(());
            }
        }

        let mut done_rx = self.done_rx.clone();
        let wait = async move {
            while !*done_rx.borrow() {
                if done_rx.changed().await.is_err() {
                    break;
                }
            }
        };

        match tokio::time::timeout(deadline, wait).await {
            Ok(()) => {
                self.span.in_scope(|| info!("Backup engine stopped"));
                Ok(())
            }
            Err(_) => {
                metrics::record_stop_timeout();
                self.span.in_scope(|| {
                    warn!(
                        waited = ?deadline,
                        "Stop deadline elapsed; teardown continues in the background"
                    );
                });
                Err(EngineError::StopTimeout { waited: deadline })
            }
        }
    }
}

/// The clones of coordinator state the supervisor task runs with.
struct Supervisor<E: ReplicationEngineRef> {
    engine: Arc<E>,
    tasks: Vec<Arc<dyn ReplicaTask>>,
    state_tx: watch::Sender<EngineState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl<E: ReplicationEngineRef> Supervisor<E> {
    /// The single supervisor task, one per coordinator lifetime.
    ///
    /// Startup sequence:
    /// 1. Open the source handle (failure fatal; nothing else runs)
    /// 2. Start each replica task in declared order, stopping at the first
    ///    failure
    /// 3. Report the outcome through `ready_tx`, exactly once
    /// 4. On success, block on the shutdown signal
    ///
    /// The teardown sequence then runs on every exit path (success, fatal
    /// startup error, external cancellation), and the done signal fires
    /// unconditionally as the final action.
    async fn run(mut self, ready_tx: oneshot::Sender<Result<()>>) {
        let mut source_open = false;
        let mut started: Vec<Arc<dyn ReplicaTask>> = Vec::with_capacity(self.tasks.len());
        let mut fatal: Option<EngineError> = None;

        match self.engine.open().await {
            Ok(()) => {
                source_open = true;
                info!(source = %self.engine.describe(), "Source database opened");
            }
            Err(e) => {
                fatal = Some(EngineError::source("open", e.to_string()));
            }
        }

        if fatal.is_none() {
            for task in &self.tasks {
                match task.start(self.shutdown_rx.clone()).await {
                    Ok(()) => {
                        info!(replica = %task.name(), "Replica started");
                        metrics::record_replica_start(task.name(), true);
                        started.push(Arc::clone(task));
                    }
                    Err(e) => {
                        metrics::record_replica_start(task.name(), false);
                        fatal = Some(EngineError::replica_start(task.name(), e.to_string()));
                        break;
                    }
                }
            }
        }

        let failed = fatal.is_some();
        match fatal {
            None => {
                let _ = self.state_tx.send(EngineState::Running);
                metrics::set_engine_state("Running");
                let _ = ready_tx.send(Ok(()));

                // Block until cancellation, from stop() or process exit.
                while !*self.shutdown_rx.borrow() {
                    if self.shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }

                let _ = self.state_tx.send(EngineState::ShuttingDown);
                metrics::set_engine_state("ShuttingDown");
            }
            Some(err) => {
                error!(
                    error = %err,
                    started = started.len(),
                    total = self.tasks.len(),
                    "Startup failed; stopping replicas that already started"
                );
                // Same cancellation primitive as external stop, so any
                // engine-side loops already running begin winding down.
                let _ = self.shutdown_tx.send(true);
                let _ = self.state_tx.send(EngineState::Failed);
                metrics::set_engine_state("Failed");
                let _ = ready_tx.send(Err(err));
            }
        }

        let teardown_started = Instant::now();

        // Stop in reverse start order. Individual failures are logged and
        // counted, never escalated; every started task gets its attempt.
        for task in started.iter().rev() {
            match task.stop(true).await {
                Ok(()) => {
                    info!(replica = %task.name(), "Replica stopped");
                    metrics::record_replica_stop(task.name(), true);
                }
                Err(e) => {
                    warn!(replica = %task.name(), error = %e, "Replica stop failed");
                    metrics::record_replica_stop(task.name(), false);
                }
            }
        }

        // The source is closed only after every stop attempt above.
        if source_open {
            if let Err(e) = self.engine.close().await {
                warn!(error = %e, "Source database close failed");
            } else {
                info!(source = %self.engine.describe(), "Source database closed");
            }
        }

        if !failed {
            let _ = self.state_tx.send(EngineState::Stopped);
            metrics::set_engine_state("Stopped");
        }
        metrics::record_shutdown_duration(teardown_started.elapsed());

        // Fired exactly once, unconditionally, as the final action.
        let _ = self.done_tx.send(true);
    }
}
