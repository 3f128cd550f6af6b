//! Periodic keep-alive comments.
//!
//! Idle event streams are closed by proxies, and a dead peer is only
//! noticed on the next write. Writing a comment frame on a fixed interval
//! handles both: clients ignore comments, and failed writes prune the
//! subscriber through the normal publish path.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broadcaster::EventBroadcaster;
use crate::event::Frame;

/// Send a keep-alive frame to every subscriber each `interval` until cancelled.
pub async fn run_keep_alive(
    broadcaster: Arc<EventBroadcaster>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = broadcaster.publish_frame(Frame::keep_alive()).await;
                if report.dropped > 0 {
                    debug!(dropped = report.dropped, "keep-alive pruned dead subscribers");
                }
            }
            () = cancel.cancelled() => {
                debug!("keep-alive loop cancelled");
                return;
            }
        }
    }
}
