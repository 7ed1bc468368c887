// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the backup engine.
//!
//! This module defines the error types used throughout the backup engine.
//! Errors are categorized by the lifecycle phase that produced them
//! (resolution, client construction, startup, shutdown) and include the
//! offending replica's name where one exists.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Validation` | No | Declarative config malformed or inconsistent |
//! | `UnsupportedKind` | No | Replica declares a kind the factory does not implement |
//! | `Io` | No | Local resource preparation failed (directory create/resolve) |
//! | `ReplicaStart` | Yes | A replica task failed to begin syncing |
//! | `Source` | Yes | Source database open or close failed |
//! | `StopTimeout` | Yes | Shutdown did not finish within the caller's deadline |
//! | `InvalidState` | No | Lifecycle state machine violation |
//!
//! # Retry Behavior
//!
//! Use [`EngineError::is_retryable()`] to decide whether the host process
//! should retry. There is no automatic retry inside this layer: a failed
//! start tears down whatever it started and returns, and retry (for example
//! restarting the daemon) is the host's policy decision. Retryable here
//! means the condition is plausibly transient (storage target unreachable,
//! teardown still draining). Non-retryable errors indicate configuration
//! problems or caller bugs.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for backup engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while coordinating the backup lifecycle.
///
/// Each variant includes context about where the error occurred.
/// Use [`is_retryable()`](Self::is_retryable) to check whether the host
/// should consider retrying.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or inconsistent declarative configuration.
    ///
    /// Raised by the resolver before any I/O: empty replica list, empty or
    /// duplicate names, missing kind-required fields, unparseable durations.
    /// Not retryable - fix the configuration and rebuild the coordinator.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A replica declares a kind the client factory does not implement.
    ///
    /// Not retryable - the configuration names a backend this build does
    /// not ship.
    #[error("Unsupported replica kind for '{replica}': {kind}")]
    UnsupportedKind { replica: String, kind: String },

    /// Local resource preparation failure.
    ///
    /// Occurs when the factory cannot create or resolve a replica's target
    /// directory. Fatal to construction; aborts the whole startup.
    /// Not retryable - needs operator attention on the local filesystem.
    #[error("I/O error ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A specific replica task failed to begin syncing.
    ///
    /// Fatal to `start()`; triggers stop-what-started teardown of the tasks
    /// already running. Retryable in the sense that the host may restart the
    /// daemon once the storage target recovers.
    #[error("Replica '{replica}' failed to start: {message}")]
    ReplicaStart { replica: String, message: String },

    /// Source database open or close failure surfaced by the engine seam.
    ///
    /// An open failure is fatal and is returned before any replica starts.
    /// Retryable - often lock contention or a transient filesystem issue.
    #[error("Source database {operation} failed: {message}")]
    Source { operation: String, message: String },

    /// `stop()` did not observe shutdown completion within the deadline.
    ///
    /// The background teardown keeps running and may complete later; a
    /// subsequent `stop()` with a larger deadline remains legal and
    /// idempotent. Retryable.
    #[error("Stop timed out after {waited:?}; teardown continues in the background")]
    StopTimeout { waited: Duration },

    /// Lifecycle state machine violation.
    ///
    /// Occurs when an operation is attempted in the wrong state
    /// (e.g., calling `start()` twice). Not retryable - caller bug.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl EngineError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported-kind error for a named replica.
    pub fn unsupported_kind(replica: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedKind {
            replica: replica.into(),
            kind: kind.into(),
        }
    }

    /// Create an I/O error. `path` is display context for the failing
    /// resource, typically the replica name plus its target path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a replica start error naming the replica that failed.
    pub fn replica_start(replica: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReplicaStart {
            replica: replica.into(),
            message: message.into(),
        }
    }

    /// Create a source database error for an operation ("open" or "close").
    pub fn source(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check if the host should consider retrying after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::UnsupportedKind { .. } => false,
            Self::Io { .. } => false, // Local filesystem issues need attention
            Self::ReplicaStart { .. } => true, // Storage target may recover
            Self::Source { .. } => true,
            Self::StopTimeout { .. } => true, // Teardown may finish later
            Self::InvalidState { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_retryable_validation() {
        let err = EngineError::validation("duplicate replica name: local");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("duplicate replica name"));
    }

    #[test]
    fn test_not_retryable_unsupported_kind() {
        let err = EngineError::unsupported_kind("offsite", "tape");
        assert!(!err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("offsite"));
        assert!(msg.contains("tape"));
    }

    #[test]
    fn test_not_retryable_io() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = EngineError::io("/var/backups/replica-1", source);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("/var/backups/replica-1"));
    }

    #[test]
    fn test_is_retryable_replica_start() {
        let err = EngineError::replica_start("s3-primary", "bucket unreachable");
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("s3-primary"));
        assert!(msg.contains("bucket unreachable"));
    }

    #[test]
    fn test_is_retryable_source() {
        let err = EngineError::source("open", "database is locked");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("open"));
    }

    #[test]
    fn test_is_retryable_stop_timeout() {
        let err = EngineError::StopTimeout {
            waited: Duration::from_secs(5),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_not_retryable_invalid_state() {
        let err = EngineError::InvalidState {
            expected: "Created".to_string(),
            actual: "Running".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Created"));
        assert!(err.to_string().contains("Running"));
    }

    #[test]
    fn test_io_error_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = EngineError::io("/missing/dir", source);
        // The source chain is preserved for debugging
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("no such file"));
    }

    #[test]
    fn test_validation_error_formatting() {
        let err = EngineError::validation("no replicas configured");
        let msg = err.to_string();
        assert!(msg.contains("Validation error"));
        assert!(msg.contains("no replicas configured"));
    }
}
