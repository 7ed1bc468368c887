//! Engine state types.
//!
//! Defines the state machine for the backup engine lifecycle.
//!
//! # State Transitions
//!
//! ```text
//!                   start()
//! Created ────────────────────→ Starting
//!    │                              │
//!    │ stop() before start()        │ (source open + all replicas started)
//!    ↓                              ↓
//! Stopped ←── ShuttingDown ←──── Running
//!                   ↑               │
//!                   └───────────────┘
//!                        stop()
//!
//! Starting ──(source open or replica start fails)──→ Failed
//! ```
//!
//! # State Descriptions
//!
//! - **Created**: Replicas resolved, clients built, tasks bound. Nothing started.
//! - **Starting**: `start()` called. Source opening, replica tasks starting in
//!   declared order.
//! - **Running**: Every replica task confirmed started. The supervisor blocks
//!   on the shutdown signal.
//! - **ShuttingDown**: Shutdown signalled. Started tasks being stopped in
//!   reverse order, then the source closed.
//! - **Stopped**: Teardown complete. Safe to drop.
//! - **Failed**: Startup failed. Terminal; the teardown for whatever did start
//!   still runs, but the engine cannot be restarted.

/// State of the backup engine.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine constructed but not started.
    ///
    /// Call [`start()`](super::BackupEngine::start) to begin replication.
    Created,

    /// Opening the source database and starting replica tasks.
    Starting,

    /// Running: all replica tasks started and syncing.
    Running,

    /// Shutting down: tasks stopping in reverse start order.
    ShuttingDown,

    /// Stopped cleanly. Safe to drop.
    Stopped,

    /// Startup failed. Terminal.
    ///
    /// Check the error returned from `start()` for details.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Starting => write!(f, "Starting"),
            EngineState::Running => write!(f, "Running"),
            EngineState::ShuttingDown => write!(f, "ShuttingDown"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}
