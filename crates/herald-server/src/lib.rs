//! # herald-server
//!
//! Axum HTTP server and server-sent event broadcasting.
//!
//! - [`registry::ConnectionRegistry`]: the live set of subscribers
//! - [`broadcaster::EventBroadcaster`]: subscribe lifecycle and fan-out
//! - `GET /sse/notifications`: text event stream, one `data:` frame per event
//! - `POST /notifications`: publish a JSON payload to every subscriber
//! - Keep-alive comment frames that also prune dead peers
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod broadcaster;
pub mod config;
pub mod errors;
pub mod event;
pub mod health;
pub mod keepalive;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod sse;
pub mod subscriber;

pub use broadcaster::{EventBroadcaster, PublishReport, SubscriptionSession};
pub use errors::{BroadcastError, DeliveryError, SubscriptionError};
pub use event::{Frame, Notification};
pub use registry::ConnectionRegistry;
pub use server::HeraldServer;
pub use subscriber::{ChannelSink, EventSink, Subscriber};
