//! Subscribers and the transport sink they write through.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_core::SubscriberId;
use tokio::sync::mpsc;

use crate::errors::DeliveryError;
use crate::event::Frame;

/// Write side of one push channel.
///
/// The HTTP layer owns the actual connection; a sink only forwards frames
/// to it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Write one frame. May wait while the peer is slow.
    async fn write(&self, frame: Frame) -> Result<(), DeliveryError>;

    /// Whether the peer is already known to be gone.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Sink backed by a bounded channel drained by the response body stream.
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    /// Wrap the sending half of a frame channel.
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.tx.send(frame).await.map_err(|_| DeliveryError::Closed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One registered push channel.
pub struct Subscriber {
    /// Unique identity.
    pub id: SubscriberId,
    /// When the subscription was opened.
    pub connected_at: DateTime<Utc>,
    /// Remote address or other peer label, for logs.
    pub peer: Option<String>,
    sink: Box<dyn EventSink>,
}

impl Subscriber {
    /// Create a subscriber with a fresh id.
    pub fn new(sink: impl EventSink + 'static, peer: Option<String>) -> Self {
        Self {
            id: SubscriberId::new(),
            connected_at: Utc::now(),
            peer,
            sink: Box::new(sink),
        }
    }

    /// Write `frame`, giving up after `timeout`.
    pub async fn deliver(&self, frame: Frame, timeout: Duration) -> Result<(), DeliveryError> {
        if self.sink.is_closed() {
            return Err(DeliveryError::Closed);
        }
        tokio::time::timeout(timeout, self.sink.write(frame))
            .await
            .map_err(|_| DeliveryError::TimedOut(timeout))?
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn channel_subscriber(capacity: usize) -> (Subscriber, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Subscriber::new(ChannelSink::new(tx), None), rx)
    }

    #[tokio::test]
    async fn deliver_success() {
        let (sub, mut rx) = channel_subscriber(4);
        sub.deliver(Frame::keep_alive(), TIMEOUT).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Frame::keep_alive());
    }

    #[tokio::test]
    async fn deliver_to_dropped_receiver_is_closed() {
        let (sub, rx) = channel_subscriber(4);
        drop(rx);
        let err = sub.deliver(Frame::keep_alive(), TIMEOUT).await.unwrap_err();
        assert_eq!(err, DeliveryError::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn deliver_to_full_channel_times_out() {
        let (sub, _rx) = channel_subscriber(1);
        sub.deliver(Frame::keep_alive(), TIMEOUT).await.unwrap();
        let err = sub.deliver(Frame::keep_alive(), TIMEOUT).await.unwrap_err();
        assert_eq!(err, DeliveryError::TimedOut(TIMEOUT));
    }

    #[tokio::test]
    async fn closed_sink_skips_write() {
        let mut sink = MockEventSink::new();
        let _ = sink.expect_is_closed().return_const(true);
        let _ = sink.expect_write().never();
        let sub = Subscriber::new(sink, None);
        let err = sub.deliver(Frame::keep_alive(), TIMEOUT).await.unwrap_err();
        assert_eq!(err, DeliveryError::Closed);
    }

    #[tokio::test]
    async fn sink_error_is_returned() {
        let mut sink = MockEventSink::new();
        let _ = sink.expect_is_closed().return_const(false);
        let _ = sink
            .expect_write()
            .times(1)
            .returning(|_| Err(DeliveryError::Closed));
        let sub = Subscriber::new(sink, Some("10.0.0.1:5000".into()));
        assert!(sub.deliver(Frame::keep_alive(), TIMEOUT).await.is_err());
    }

    #[test]
    fn new_subscribers_get_distinct_ids() {
        let (a, _rx_a) = channel_subscriber(1);
        let (b, _rx_b) = channel_subscriber(1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn debug_omits_sink() {
        let (sub, _rx) = channel_subscriber(1);
        let s = format!("{sub:?}");
        assert!(s.contains("Subscriber"));
        assert!(s.contains("peer"));
    }
}
