//! `HeraldServer`: Axum HTTP server hosting the event stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Router;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::broadcaster::{EventBroadcaster, PublishReport};
use crate::config::ServerConfig;
use crate::errors::BroadcastError;
use crate::health::{self, HealthResponse};
use crate::keepalive::run_keep_alive;
use crate::shutdown::ShutdownCoordinator;
use crate::sse;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcaster for subscribe and publish.
    pub broadcaster: Arc<EventBroadcaster>,
    /// Frames buffered per subscriber.
    pub channel_capacity: usize,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The herald server.
pub struct HeraldServer {
    config: ServerConfig,
    broadcaster: Arc<EventBroadcaster>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl HeraldServer {
    /// Create a new server. Pass the recorder handle to expose `/metrics`.
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new(
            config.write_timeout,
            config.max_subscribers,
        ));
        Self {
            config,
            shutdown: Arc::new(ShutdownCoordinator::new(broadcaster.clone())),
            broadcaster,
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            broadcaster: self.broadcaster.clone(),
            channel_capacity: self.config.channel_capacity,
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/sse/notifications", get(sse::subscribe_handler))
            .route("/notifications", post(publish_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and serve until [`ShutdownCoordinator::trigger`].
    ///
    /// The returned handle resolves once the server and the keep-alive
    /// task have stopped.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let keep_alive = self.config.keep_alive_interval.map(|interval| {
            tokio::spawn(run_keep_alive(
                self.broadcaster.clone(),
                interval,
                token.clone(),
            ))
        });

        let signal = async move { token.cancelled().await };

        let handle = tokio::spawn(async move {
            let serve = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(signal);
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
            if let Some(task) = keep_alive {
                let _ = task.await;
            }
            info!("server stopped");
        });

        info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// Get the broadcaster. Producers publish through this.
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let subscribers = state.broadcaster.subscriber_count();
    Json(health::health_check(state.start_time, subscribers))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(ref handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST /notifications: publish the JSON body to every subscriber.
#[instrument(skip_all)]
async fn publish_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<PublishReport>), BroadcastError> {
    let report = state.broadcaster.publish(&payload).await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use futures::StreamExt;
    use tower::ServiceExt;

    fn make_server() -> HeraldServer {
        HeraldServer::new(ServerConfig::default(), None)
    }

    async fn body_json(resp: Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["subscribers"], 0);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let server = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_with_recorder_renders_text() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let server = HeraldServer::new(ServerConfig::default(), Some(handle));
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sse_endpoint_sets_stream_headers() {
        let server = make_server();
        let req = Request::builder()
            .uri("/sse/notifications")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(h[header::CACHE_CONTROL], "no-cache");
        assert_eq!(h[header::CONNECTION], "keep-alive");
        assert_eq!(server.broadcaster().subscriber_count(), 1);

        drop(resp);
        assert_eq!(server.broadcaster().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn sse_body_carries_published_frame() {
        let server = make_server();
        let req = Request::builder()
            .uri("/sse/notifications")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();

        let _ = server
            .broadcaster()
            .publish(&crate::event::Notification::post_created("X", "Alice"))
            .await
            .unwrap();

        let mut body = resp.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        assert_eq!(
            &chunk[..],
            b"data: {\"message\":\"New post \\\"X\\\" by Alice\"}\n\n"
        );
    }

    #[tokio::test]
    async fn sse_rejected_at_capacity() {
        let config = ServerConfig {
            max_subscribers: 1,
            ..ServerConfig::default()
        };
        let server = HeraldServer::new(config, None);
        let first = server
            .router()
            .oneshot(Request::builder().uri("/sse/notifications").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = server
            .router()
            .oneshot(Request::builder().uri("/sse/notifications").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        let parsed = body_json(second).await;
        assert!(parsed["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn publish_endpoint_reports_recipients() {
        let server = make_server();
        let stream = server
            .router()
            .oneshot(Request::builder().uri("/sse/notifications").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/notifications")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["recipients"], 1);
        assert_eq!(parsed["delivered"], 1);
        assert_eq!(parsed["dropped"], 0);
        drop(stream);
    }

    #[tokio::test]
    async fn publish_endpoint_rejects_invalid_json() {
        let server = make_server();
        let req = Request::builder()
            .method("POST")
            .uri("/notifications")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        let _ = server.shutdown().trigger();
        handle.await.unwrap();
        assert!(server.broadcaster().is_shut_down());
    }
}
