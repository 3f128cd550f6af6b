//! `GET /sse/notifications`: the text event stream.
//!
//! Each request registers one subscriber backed by a bounded channel. The
//! response body drains that channel; when the client goes away the body
//! is dropped, which drops the [`SubscriptionSession`] it owns and
//! unsubscribes.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::broadcaster::SubscriptionSession;
use crate::event::Frame;
use crate::server::AppState;
use crate::subscriber::ChannelSink;

/// Content type of the push stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Open a push subscription.
#[instrument(skip_all, fields(peer))]
pub async fn subscribe_handler(State(state): State<AppState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string());
    if let Some(ref p) = peer {
        let _ = tracing::Span::current().record("peer", p.as_str());
    }

    let (tx, rx) = mpsc::channel(state.channel_capacity);
    let session = match state.broadcaster.subscribe(ChannelSink::new(tx), peer) {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let headers = [
        (header::CONTENT_TYPE, EVENT_STREAM),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];
    (headers, Body::from_stream(frame_stream(rx, session))).into_response()
}

/// Body stream yielding frames until the channel closes.
///
/// The session lives inside the stream state, so it is released exactly
/// when the stream ends or is dropped.
pub fn frame_stream(
    rx: mpsc::Receiver<Frame>,
    session: SubscriptionSession,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    futures::stream::unfold((rx, session), |(mut rx, session)| async move {
        let frame = rx.recv().await?;
        Some((Ok(frame.into_bytes()), (rx, session)))
    })
}
