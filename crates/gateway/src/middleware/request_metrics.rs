//! Request metrics middleware

use axum::{extract::Request, middleware::Next, response::Response};
use procontrol_common::metrics::RequestMetrics;

/// Record count and latency for every request passing through the gateway
pub async fn track_requests(request: Request, next: Next) -> Response {
    let tracker = RequestMetrics::start(request.method().as_str(), request.uri().path());
    let response = next.run(request).await;
    tracker.finish(response.status().as_u16());
    response
}
