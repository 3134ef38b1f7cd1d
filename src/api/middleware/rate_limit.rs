//! Per-client sliding-window rate limiting.
//!
//! State lives in process memory, so limits are per instance and reset on
//! restart.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::api::AppState;
use crate::config::{RATE_LIMIT_MAX_TRACKED_CLIENTS, RATE_LIMIT_WINDOW_MS};
use crate::errors::AppError;

/// Request timestamps per client inside the current window.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// `limit` requests per second.
    pub fn per_second(limit: u32) -> Self {
        Self::new(limit, Duration::from_millis(RATE_LIMIT_WINDOW_MS))
    }

    /// Record a request. `Err` carries the seconds until a slot frees up.
    pub async fn check(&self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;

        if hits.len() > RATE_LIMIT_MAX_TRACKED_CLIENTS {
            let window = self.window;
            hits.retain(|_, times| {
                times.back().map_or(false, |last| now.duration_since(*last) < window)
            });
        }

        let times = hits.entry(client.to_string()).or_default();
        while let Some(oldest) = times.front() {
            if now.duration_since(*oldest) >= self.window {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() >= self.limit {
            let wait = times
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(wait.as_secs_f64().ceil().max(1.0) as u64);
        }

        times.push_back(now);
        Ok(())
    }
}

/// Client identity: first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the socket address.
pub(crate) fn client_identifier(request: &Request) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        return ip.trim().to_string();
    }

    if let Some(ip) = header("x-real-ip") {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject clients that exceed `RATE_LIMIT_PER_SECOND`.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_identifier(&request);

    if let Err(retry_after) = state.rate_limiter.check(&client).await {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        return Err(AppError::RateLimited { retry_after });
    }

    Ok(next.run(request).await)
}
