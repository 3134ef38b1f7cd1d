//! Request logging middleware.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Log path, method, status and duration of every request.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        duration = %format!("{:.3}s", started.elapsed().as_secs_f64()),
        "Request handled"
    );

    response
}
