//! Mock ReplicationEngineRef for testing.
//!
//! Records source open/close and per-task start/stop into one shared,
//! ordered event log so tests can assert lifecycle ordering (start order,
//! reverse stop order, stop-before-close). Configurable failure injection
//! for open, the n-th task start, and named task stops, plus an optional
//! stop delay for deadline tests.

use backup_engine::factory::ReplicaHandle;
use backup_engine::replication::{
    ReplicaTask, ReplicationEngineRef, TaskError, TaskFuture, TaskResult,
};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// One entry in the shared lifecycle event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SourceOpened,
    /// A task confirmed started.
    TaskStarted(String),
    /// A task was issued a stop attempt (recorded even if the stop then
    /// fails, so "exactly one attempt" stays countable).
    TaskStopped(String),
    SourceClosed,
}

struct MockState {
    /// Ordered log shared by the engine and every bound task.
    events: Mutex<Vec<EngineEvent>>,
    /// Make open() fail.
    fail_open: AtomicBool,
    /// Start-attempt index at which start() fails (usize::MAX = never).
    fail_start_at: AtomicUsize,
    /// Counter of start attempts, successful or not.
    start_attempts: AtomicUsize,
    /// Delay applied inside each stop(), for deadline tests.
    stop_delay: Mutex<Option<Duration>>,
    /// Names whose stop() returns an error (after recording the attempt).
    failing_stops: Mutex<HashSet<String>>,
}

/// Mock implementation of ReplicationEngineRef that records all calls.
///
/// # Example
/// ```rust,ignore
/// let mock = Arc::new(MockReplicationEngine::new());
/// mock.fail_start_at(2); // third task's start fails
///
/// // ... run the coordinator against it ...
///
/// assert_eq!(mock.started(), vec!["a", "b"]);
/// assert!(mock.stop_before_close());
/// ```
pub struct MockReplicationEngine {
    state: Arc<MockState>,
}

impl MockReplicationEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                events: Mutex::new(Vec::new()),
                fail_open: AtomicBool::new(false),
                fail_start_at: AtomicUsize::new(usize::MAX),
                start_attempts: AtomicUsize::new(0),
                stop_delay: Mutex::new(None),
                failing_stops: Mutex::new(HashSet::new()),
            }),
        }
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    /// Make the source open fail.
    pub fn fail_open(&self) {
        self.state.fail_open.store(true, Ordering::SeqCst);
    }

    /// Make the start attempt with index `n` (0-based, in start order) fail.
    pub fn fail_start_at(&self, n: usize) {
        self.state.fail_start_at.store(n, Ordering::SeqCst);
    }

    /// Delay every task stop by `delay`, to exercise stop deadlines.
    pub fn set_stop_delay(&self, delay: Duration) {
        *self.state.stop_delay.lock().unwrap() = Some(delay);
    }

    /// Make the named task's stop return an error (the attempt is still
    /// recorded).
    pub fn fail_stop_of(&self, name: &str) {
        self.state
            .failing_stops
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// The full ordered event log.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.state.events.lock().unwrap().clone()
    }

    /// Names of tasks that confirmed started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::TaskStarted(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names of tasks issued a stop attempt, in stop order.
    pub fn stopped(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::TaskStopped(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Total start attempts, including the failed one.
    pub fn start_attempts(&self) -> usize {
        self.state.start_attempts.load(Ordering::SeqCst)
    }

    /// Number of stop attempts issued to the named task.
    pub fn stop_attempts(&self, name: &str) -> usize {
        self.stopped().iter().filter(|n| n.as_str() == name).count()
    }

    /// Whether the source was closed.
    pub fn source_closed(&self) -> bool {
        self.events().contains(&EngineEvent::SourceClosed)
    }

    /// True when every task stop attempt appears strictly before the source
    /// close in the event log (vacuously true if the source never closed).
    pub fn stop_before_close(&self) -> bool {
        let events = self.events();
        match events.iter().position(|e| *e == EngineEvent::SourceClosed) {
            Some(close_idx) => events
                .iter()
                .enumerate()
                .filter(|(_, e)| matches!(e, EngineEvent::TaskStopped(_)))
                .all(|(i, _)| i < close_idx),
            None => true,
        }
    }
}

impl Default for MockReplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicationEngineRef for MockReplicationEngine {
    fn describe(&self) -> String {
        "mock-source.db".to_string()
    }

    fn open(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.state.fail_open.load(Ordering::SeqCst) {
                return Err(TaskError("simulated open failure".to_string()));
            }
            self.state
                .events
                .lock()
                .unwrap()
                .push(EngineEvent::SourceOpened);
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = TaskResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.state
                .events
                .lock()
                .unwrap()
                .push(EngineEvent::SourceClosed);
            Ok(())
        })
    }

    fn bind(&self, handle: ReplicaHandle) -> TaskResult<Arc<dyn ReplicaTask>> {
        Ok(Arc::new(MockReplicaTask {
            name: handle.name,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockReplicaTask {
    name: String,
    state: Arc<MockState>,
}

impl ReplicaTask for MockReplicaTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, _shutdown: watch::Receiver<bool>) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            let idx = self.state.start_attempts.fetch_add(1, Ordering::SeqCst);
            if idx >= self.state.fail_start_at.load(Ordering::SeqCst) {
                return Err(TaskError(format!(
                    "simulated start failure for {}",
                    self.name
                )));
            }
            self.state
                .events
                .lock()
                .unwrap()
                .push(EngineEvent::TaskStarted(self.name.clone()));
            Ok(())
        })
    }

    fn stop(&self, _graceful: bool) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            self.state
                .events
                .lock()
                .unwrap()
                .push(EngineEvent::TaskStopped(self.name.clone()));

            let delay = *self.state.stop_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.state.failing_stops.lock().unwrap().contains(&self.name) {
                return Err(TaskError(format!(
                    "simulated stop failure for {}",
                    self.name
                )));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_open_close() {
        let mock = MockReplicationEngine::new();
        mock.open().await.unwrap();
        mock.close().await.unwrap();

        assert_eq!(
            mock.events(),
            vec![EngineEvent::SourceOpened, EngineEvent::SourceClosed]
        );
        assert!(mock.source_closed());
    }

    #[tokio::test]
    async fn test_mock_fail_open() {
        let mock = MockReplicationEngine::new();
        mock.fail_open();
        assert!(mock.open().await.is_err());
        assert!(mock.events().is_empty());
    }

    #[tokio::test]
    async fn test_mock_fail_start_at() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockReplicationEngine::new();
        mock.fail_start_at(1);

        let config = crate::common::config_with_replicas(&dir, &["a", "b"]);
        let descriptors = backup_engine::resolve(&config).unwrap();
        let (_tx, rx) = watch::channel(false);

        let first = mock
            .bind(backup_engine::factory::build(&descriptors[0]).unwrap())
            .unwrap();
        let second = mock
            .bind(backup_engine::factory::build(&descriptors[1]).unwrap())
            .unwrap();

        assert!(first.start(rx.clone()).await.is_ok());
        assert!(second.start(rx).await.is_err());
        assert_eq!(mock.started(), vec!["a"]);
        assert_eq!(mock.start_attempts(), 2);
    }
}
