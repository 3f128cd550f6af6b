//! Event fan-out to every subscribed client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ::metrics::{counter, gauge, histogram};
use futures::future::join_all;
use herald_core::SubscriberId;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{BroadcastError, DeliveryError, SubscriptionError};
use crate::event::Frame;
use crate::metrics::{
    DELIVERIES_FAILED_TOTAL, EVENTS_PUBLISHED_TOTAL, PUBLISH_DURATION_SECONDS, SUBSCRIBERS_ACTIVE,
    SUBSCRIPTIONS_TOTAL, UNSUBSCRIPTIONS_TOTAL,
};
use crate::registry::ConnectionRegistry;
use crate::subscriber::{EventSink, Subscriber};

/// Default upper bound for a single write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one publish. Informational only: delivery is best-effort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Subscribers in the snapshot.
    pub recipients: usize,
    /// Writes that completed.
    pub delivered: usize,
    /// Subscribers removed because their write failed or timed out.
    pub dropped: usize,
}

/// Manages the subscribe lifecycle and broadcasts events.
pub struct EventBroadcaster {
    registry: ConnectionRegistry,
    write_timeout: Duration,
    max_subscribers: usize,
    closed: AtomicBool,
}

impl EventBroadcaster {
    /// Create a broadcaster with the given per-write timeout and subscriber cap.
    pub fn new(write_timeout: Duration, max_subscribers: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            write_timeout,
            max_subscribers,
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new subscriber writing through `sink`.
    ///
    /// The returned session unsubscribes when closed or dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        sink: impl EventSink + 'static,
        peer: Option<String>,
    ) -> Result<SubscriptionSession, SubscriptionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SubscriptionError::ShuttingDown);
        }
        let subscriber = Subscriber::new(sink, peer);
        let peer = subscriber.peer.clone();
        let Some(id) = self.registry.try_add(subscriber, self.max_subscribers) else {
            warn!(limit = self.max_subscribers, "subscriber limit reached, rejecting");
            return Err(SubscriptionError::CapacityExceeded {
                limit: self.max_subscribers,
            });
        };
        // shutdown may have drained the registry between the check and the insert
        if self.closed.load(Ordering::Acquire) {
            let _ = self.registry.remove(id);
            return Err(SubscriptionError::ShuttingDown);
        }

        counter!(SUBSCRIPTIONS_TOTAL).increment(1);
        gauge!(SUBSCRIBERS_ACTIVE).set(self.registry.len() as f64);
        info!(subscriber_id = %id, peer = peer.as_deref().unwrap_or("-"), "subscriber connected");

        Ok(SubscriptionSession {
            id,
            broadcaster: Arc::clone(self),
            closed: AtomicBool::new(false),
        })
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            counter!(UNSUBSCRIPTIONS_TOTAL).increment(1);
            gauge!(SUBSCRIBERS_ACTIVE).set(self.registry.len() as f64);
            info!(subscriber_id = %id, "subscriber disconnected");
        }
        removed
    }

    /// Serialize `event` once and write it to every subscriber.
    ///
    /// Only a serialization failure is returned; per-subscriber failures
    /// unsubscribe that subscriber and are reflected in the report.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        event: &T,
    ) -> Result<PublishReport, BroadcastError> {
        let frame = match Frame::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to serialize event");
                return Err(e.into());
            }
        };
        counter!(EVENTS_PUBLISHED_TOTAL).increment(1);
        Ok(self.publish_frame(frame).await)
    }

    /// Write an already encoded frame to every subscriber in a snapshot.
    ///
    /// Writes run concurrently, each bounded by the write timeout, so a
    /// slow peer delays the call by at most one timeout.
    pub async fn publish_frame(&self, frame: Frame) -> PublishReport {
        let started = Instant::now();
        let snapshot = self.registry.snapshot();
        let mut report = PublishReport {
            recipients: snapshot.len(),
            ..PublishReport::default()
        };
        if snapshot.is_empty() {
            return report;
        }

        let timeout = self.write_timeout;
        let writes = snapshot.iter().map(|sub| {
            let frame = frame.clone();
            async move { (sub.id, sub.deliver(frame, timeout).await) }
        });

        for (id, result) in join_all(writes).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    match e {
                        DeliveryError::Closed => {
                            debug!(subscriber_id = %id, "subscriber gone, removing");
                        }
                        DeliveryError::TimedOut(_) => {
                            warn!(subscriber_id = %id, error = %e, "slow subscriber, removing");
                        }
                    }
                    counter!(DELIVERIES_FAILED_TOTAL).increment(1);
                    if self.unsubscribe(id) {
                        report.dropped += 1;
                    }
                }
            }
        }

        histogram!(PUBLISH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        debug!(
            comment = frame.is_comment(),
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast frame"
        );
        report
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether `id` is still registered.
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry.contains(id)
    }

    /// Refuse new subscriptions and drop every subscriber.
    ///
    /// Dropping a subscriber releases its sink, which ends the matching
    /// event stream. Returns how many subscribers were drained.
    pub fn shutdown(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let drained = self.registry.clear();
        gauge!(SUBSCRIBERS_ACTIVE).set(0.0);
        info!(drained, "broadcaster shut down");
        drained
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT, usize::MAX)
    }
}

/// Caller-side handle of one subscription.
///
/// Closing it (explicitly or by dropping) unsubscribes exactly once;
/// further close signals are no-ops.
pub struct SubscriptionSession {
    id: SubscriberId,
    broadcaster: Arc<EventBroadcaster>,
    closed: AtomicBool,
}

impl SubscriptionSession {
    /// Id of the registered subscriber.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unsubscribe. Returns `true` only for the call that removed the entry.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.broadcaster.unsubscribe(self.id)
    }
}

impl Drop for SubscriptionSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for SubscriptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSession")
            .field("id", &self.id)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
