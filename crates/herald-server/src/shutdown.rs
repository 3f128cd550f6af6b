//! Shutdown sequencing.
//!
//! Event streams never end on their own, so axum's graceful shutdown would
//! wait on them forever. The coordinator drains the broadcaster first,
//! which closes every stream, and only then cancels the token the server
//! and background tasks watch.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcaster::EventBroadcaster;

/// Owns the stop sequence of one server.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    broadcaster: Arc<EventBroadcaster>,
}

impl ShutdownCoordinator {
    /// Coordinator draining `broadcaster` when triggered.
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            token: CancellationToken::new(),
            broadcaster,
        }
    }

    /// Token for tasks that must stop on shutdown.
    ///
    /// It is a child token: cancelling it stops only its holder and does
    /// not start a shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Refuse new subscribers, drain the registry, then cancel tasks.
    ///
    /// Returns the number of subscribers drained; repeated calls return 0.
    pub fn trigger(&self) -> usize {
        let drained = self.broadcaster.shutdown();
        if !self.token.is_cancelled() {
            self.token.cancel();
            info!(drained, "shutdown triggered");
        }
        drained
    }

    /// Whether [`trigger`](Self::trigger) was called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown and wait up to `timeout` for `handles`.
    ///
    /// Returns `false` if some task was still running at the deadline.
    pub async fn shutdown_and_wait(&self, handles: Vec<JoinHandle<()>>, timeout: Duration) -> bool {
        let _ = self.trigger();
        let tasks = handles.len();
        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(results) => {
                for e in results.into_iter().filter_map(Result::err) {
                    warn!(error = %e, "server task ended abnormally");
                }
                true
            }
            Err(_) => {
                warn!(tasks, ?timeout, "tasks still running after shutdown timeout");
                false
            }
        }
    }
}
