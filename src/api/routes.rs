//! Application route configuration.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::Server;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{auth_routes, file_routes, item_routes, user_routes};
use super::middleware::{auth_middleware, rate_limit_middleware, request_logging_middleware};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::Config;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        // Public authentication routes
        .nest("/auth", auth_routes())
        // Protected routes (require a bearer access token)
        .nest(
            "/users",
            user_routes().route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/items",
            item_routes().route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/files",
            file_routes().route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    // Health check endpoints (no rate limiting)
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health));

    let prefix = config.api_v1_str.trim_end_matches('/');
    let mut router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    };

    if config.enable_docs {
        let mut doc = ApiDoc::openapi();
        doc.servers = Some(vec![Server::new(config.api_v1_str.clone())]);
        router = router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", doc));
    }

    router
        // Global middleware
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state)
}

/// CORS policy from `CORS_ORIGINS`. Unparseable origins are skipped.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

/// Root endpoint
async fn root(State(state): State<AppState>) -> String {
    format!("Welcome to {}", state.config.project_name)
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

/// Individual service health status
#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
    cache: ServiceStatus,
}

/// Service status. Failure details are logged, never returned.
#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
}

impl ServiceStatus {
    fn from_result<E: std::fmt::Display>(service: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self { status: "healthy" },
            Err(e) => {
                tracing::error!(service, error = %e, "Health probe failed");
                Self {
                    status: "unhealthy",
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Health check endpoint with database and cache connectivity check
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (db, cache) = tokio::join!(state.database.ping(), state.cache.ping());

    let database = ServiceStatus::from_result("database", db);
    let cache = ServiceStatus::from_result("cache", cache);
    let all_healthy = database.is_healthy() && cache.is_healthy();

    if !all_healthy {
        tracing::warn!(
            database = database.status,
            cache = cache.status,
            "Health check degraded"
        );
    }

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        services: ServiceHealth { database, cache },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
