//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Call once at
/// startup, before anything is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants shared by the broadcaster and the HTTP layer.

/// Subscriptions opened (counter).
pub const SUBSCRIPTIONS_TOTAL: &str = "herald_subscriptions_total";
/// Subscriptions closed for any reason (counter).
pub const UNSUBSCRIPTIONS_TOTAL: &str = "herald_unsubscriptions_total";
/// Currently registered subscribers (gauge).
pub const SUBSCRIBERS_ACTIVE: &str = "herald_subscribers_active";
/// Events accepted for broadcast (counter).
pub const EVENTS_PUBLISHED_TOTAL: &str = "herald_events_published_total";
/// Writes that failed or timed out (counter).
pub const DELIVERIES_FAILED_TOTAL: &str = "herald_deliveries_failed_total";
/// Time spent fanning out one frame (histogram).
pub const PUBLISH_DURATION_SECONDS: &str = "herald_publish_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            SUBSCRIPTIONS_TOTAL,
            UNSUBSCRIPTIONS_TOTAL,
            SUBSCRIBERS_ACTIVE,
            EVENTS_PUBLISHED_TOTAL,
            DELIVERIES_FAILED_TOTAL,
            PUBLISH_DURATION_SECONDS,
        ];
        for name in names {
            assert!(name.starts_with("herald_"));
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
