//! End-to-end API tests.
//!
//! Every test builds the full router over an in-memory SQLite database
//! (migrations applied) and the in-memory cache, then drives it with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use async_trait::async_trait;

use crud_api_template::api::{create_router, AppState};
use crud_api_template::config::Config;
use crud_api_template::errors::{AppError, AppResult};
use crud_api_template::infra::{CacheBackend, Database, MemoryCache};
use crud_api_template::services::{NewAccount, ServiceContainer};

const PASSWORD: &str = "Str0ng!Pass";

// =============================================================================
// Test Harness
// =============================================================================

fn test_config(rate_limit: &str) -> Config {
    let rate_limit = rate_limit.to_string();
    Config::from_lookup(move |key| {
        let value = match key {
            "ENVIRONMENT" => "testing",
            "DATABASE_URL" => "sqlite::memory:",
            "CACHE_BACKEND" => "memory",
            "SECRET_KEY" => "integration-test-secret-key-0123456789",
            "PROJECT_NAME" => "CRUD API Test",
            "RATE_LIMIT_PER_SECOND" => rate_limit.as_str(),
            "ENABLE_DOCS" => "false",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config")
}

struct TestApp {
    router: Router,
    services: Arc<dyn ServiceContainer>,
}

impl TestApp {
    async fn spawn() -> Self {
        Self::with_rate_limit("10000").await
    }

    async fn with_rate_limit(rate_limit: &str) -> Self {
        let config = test_config(rate_limit);
        let cache = Arc::new(MemoryCache::new(config.cache_ttl_seconds));
        Self::build(config, cache).await
    }

    async fn with_cache(cache: Arc<dyn CacheBackend>) -> Self {
        Self::build(test_config("10000"), cache).await
    }

    async fn build(config: Config, cache: Arc<dyn CacheBackend>) -> Self {
        let database = Arc::new(Database::connect(&config).await.expect("database"));

        let state = AppState::from_config(database, cache, config);
        let services = state.services.clone();

        Self {
            router: create_router(state),
            services,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await.0
    }

    async fn register(&self, email: &str, username: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({ "email": email, "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={}&password={}", email, password)))
            .unwrap();
        self.send(request).await
    }

    /// Register and log in, returning the access token.
    async fn user_token(&self, email: &str, username: &str) -> String {
        self.register(email, username).await;
        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create an admin through the service layer and log in.
    async fn admin_token(&self) -> (Uuid, String) {
        let admin = self
            .services
            .users()
            .create_user(NewAccount {
                is_admin: true,
                ..NewAccount::regular("admin@example.com".into(), "admin".into(), PASSWORD.into())
            })
            .await
            .expect("admin");

        let (_, body) = self.login("admin@example.com", PASSWORD).await;
        (admin.id, body["access_token"].as_str().unwrap().to_string())
    }
}

/// Cache whose every call fails, as if the server went away.
struct UnreachableCache;

#[async_trait]
impl CacheBackend for UnreachableCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::Cache("connection refused at 10.0.0.7:6379".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Option<u64>) -> AppResult<()> {
        Err(AppError::Cache("connection refused at 10.0.0.7:6379".into()))
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(AppError::Cache("connection refused at 10.0.0.7:6379".into()))
    }

    async fn clear_pattern(&self, _pattern: &str) -> AppResult<u64> {
        Err(AppError::Cache("connection refused at 10.0.0.7:6379".into()))
    }

    async fn ping(&self) -> AppResult<()> {
        Err(AppError::Cache("connection refused at 10.0.0.7:6379".into()))
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Welcome to CRUD API Test"));

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["cache"]["status"], "healthy");
}

#[tokio::test]
async fn test_health_reports_degraded_cache() {
    let app = TestApp::with_cache(Arc::new(UnreachableCache)).await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["cache"]["status"], "unhealthy");
    assert!(!body.to_string().contains("10.0.0.7"));
}

#[tokio::test]
async fn test_reads_survive_cache_outage() {
    let app = TestApp::with_cache(Arc::new(UnreachableCache)).await;
    let token = app.user_token("outage@example.com", "outage").await;

    let (status, me) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "outage@example.com");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::spawn().await;

    let registered = app.register("alice@example.com", "alice").await;
    assert_eq!(registered["email"], "alice@example.com");
    assert_eq!(registered["is_admin"], false);
    assert!(registered.get("hashed_password").is_none());

    let (status, tokens) = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    assert!(tokens["expires_in"].as_i64().unwrap() > 0);

    let access = tokens["access_token"].as_str().unwrap();
    let (status, me) = app.get("/api/v1/users/me", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let app = TestApp::spawn().await;
    app.register("bob@example.com", "bob").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "email": "bob@example.com", "username": "bobby", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "email": "carol@example.com", "username": "carol", "password": "password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "email": "not-an-email", "username": "carol", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("dave@example.com", "dave").await;

    let (wrong_status, wrong_body) = app.login("dave@example.com", "Wr0ng!Pass").await;
    let (unknown_status, unknown_body) = app.login("nobody@example.com", PASSWORD).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::spawn().await;

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, _) = app.get("/api/v1/items", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::spawn().await;
    app.register("erin@example.com", "erin").await;
    let (_, tokens) = app.login("erin@example.com", PASSWORD).await;
    let original = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, rotated) = app
        .json(Method::POST, "/api/v1/auth/refresh", None, json!({ "refresh_token": original }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let next = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(next, original);

    // The old token was consumed by the rotation
    let (status, _) = app
        .json(Method::POST, "/api/v1/auth/refresh", None, json!({ "refresh_token": original }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An access token is not a refresh token
    let access = rotated["access_token"].as_str().unwrap();
    let (status, _) = app
        .json(Method::POST, "/api/v1/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(Method::POST, "/api/v1/auth/refresh", None, json!({ "refresh_token": next }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = TestApp::spawn().await;
    app.register("frank@example.com", "frank").await;
    let (_, tokens) = app.login("frank@example.com", PASSWORD).await;
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let (status, body) = app
        .json(Method::POST, "/api/v1/auth/logout", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    let (status, _) = app
        .json(Method::POST, "/api/v1/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_administration() {
    let app = TestApp::spawn().await;
    let (admin_id, admin) = app.admin_token().await;
    let user = app.user_token("grace@example.com", "grace").await;

    let (status, _) = app.get("/api/v1/users", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = app.get("/api/v1/users?page=1&page_size=1", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["page_info"]["total_items"], 2);
    assert_eq!(page["page_info"]["has_next"], true);

    let (status, _) = app.get("/api/v1/users?page=0", Some(&admin)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Privilege flags are admin-only, even on your own account
    let (status, _) = app
        .json(Method::PATCH, "/api/v1/users/me", Some(&user), json!({ "is_admin": true }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, me) = app
        .json(Method::PATCH, "/api/v1/users/me", Some(&user), json!({ "username": "gracie" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "gracie");
    let grace_id = me["id"].as_str().unwrap().to_string();

    let (status, _) = app.get(&format!("/api/v1/users/{}", admin_id), Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(
        app.delete(&format!("/api/v1/users/{}", admin_id), &admin).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.delete(&format!("/api/v1/users/{}", grace_id), &user).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&format!("/api/v1/users/{}", grace_id), &admin).await,
        StatusCode::NO_CONTENT
    );

    // Tokens of a deleted account stop working
    let (status, _) = app.get("/api/v1/users/me", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivated_user_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.admin_token().await;
    let user = app.user_token("heidi@example.com", "heidi").await;
    let (_, me) = app.get("/api/v1/users/me", Some(&user)).await;

    let (status, updated) = app
        .json(
            Method::PATCH,
            &format!("/api/v1/users/{}", me["id"].as_str().unwrap()),
            Some(&admin),
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (status, _) = app.get("/api/v1/users/me", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("heidi@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_items_are_scoped_to_owner() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.admin_token().await;
    let ivan = app.user_token("ivan@example.com", "ivan").await;
    let judy = app.user_token("judy@example.com", "judy").await;

    let (status, item) = app
        .json(
            Method::POST,
            "/api/v1/items",
            Some(&ivan),
            json!({ "title": "Groceries", "description": "Milk <b>and</b> eggs" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["description"], "Milk and eggs");
    let uri = format!("/api/v1/items/{}", item["id"].as_str().unwrap());

    app.json(Method::POST, "/api/v1/items", Some(&judy), json!({ "title": "Books" }))
        .await;

    let (status, _) = app.get(&uri, Some(&judy)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, own) = app.get("/api/v1/items", Some(&ivan)).await;
    assert_eq!(own["page_info"]["total_items"], 1);

    let (_, all) = app.get("/api/v1/items", Some(&admin)).await;
    assert_eq!(all["page_info"]["total_items"], 2);

    let (status, updated) = app
        .json(Method::PUT, &uri, Some(&ivan), json!({ "title": "Errands", "description": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Errands");
    assert!(updated["description"].is_null());

    // Cached read reflects the update
    let (_, fetched) = app.get(&uri, Some(&ivan)).await;
    assert_eq!(fetched["title"], "Errands");

    assert_eq!(app.delete(&uri, &judy).await, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &ivan).await, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&uri, Some(&ivan)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_item_validation() {
    let app = TestApp::spawn().await;
    let token = app.user_token("ken@example.com", "ken").await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/items", Some(&token), json!({ "title": "" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .get(&format!("/api/v1/items/{}", Uuid::new_v4()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_huge_page_numbers_are_rejected() {
    let app = TestApp::spawn().await;
    let token = app.user_token("pager@example.com", "pager").await;

    for uri in [
        "/api/v1/items?page=18446744073709551615",
        "/api/v1/items?page=1000000000000000000",
        "/api/v1/files?page=1000000001&page_size=100",
        "/api/v1/items?page=99999999999999999999999",
    ] {
        let (status, body) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}: {body}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    let (status, body) = app
        .get("/api/v1/items?page=1000000000&page_size=100", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}

// =============================================================================
// Files
// =============================================================================

#[tokio::test]
async fn test_file_metadata_lifecycle() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.admin_token().await;
    let owner = app.user_token("liz@example.com", "liz").await;
    let other = app.user_token("mallory@example.com", "mallory").await;

    let (status, file) = app
        .json(
            Method::POST,
            "/api/v1/files",
            Some(&owner),
            json!({
                "name": "photo.png",
                "path": "uploads/liz/photo.png",
                "file_type": "image",
                "mime_type": "image/png",
                "size": 2048
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/files/{}", file["id"].as_str().unwrap());

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/files",
            Some(&owner),
            json!({
                "name": "photo.png",
                "path": "uploads/liz/photo.png",
                "file_type": "image",
                "mime_type": "image/png"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/files",
            Some(&owner),
            json!({
                "name": "notes.txt",
                "path": "uploads/liz/notes.txt",
                "file_type": "image",
                "mime_type": "text/plain"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/files",
            Some(&owner),
            json!({
                "name": "notes.txt",
                "path": "uploads/liz/notes-upper.txt",
                "file_type": "Image",
                "mime_type": "text/plain"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.get(&uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = app.get("/api/v1/files", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page_info"]["total_items"], 1);

    let (status, _) = app.get("/api/v1/files?file_type=image", Some(&owner)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, images) = app.get("/api/v1/files?file_type=image", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(images["page_info"]["total_items"], 1);

    let (status, resized) = app
        .json(Method::PATCH, &uri, Some(&owner), json!({ "size": 4096 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resized["size"], 4096);

    assert_eq!(app.delete(&uri, &other).await, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &admin).await, StatusCode::NO_CONTENT);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let app = TestApp::with_rate_limit("2").await;

    let first = app.get("/api/v1/users/me", None).await.0;
    let second = app.get("/api/v1/users/me", None).await.0;
    assert_eq!(first, StatusCode::UNAUTHORIZED);
    assert_eq!(second, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Health checks are never limited
    assert_eq!(app.get("/health", None).await.0, StatusCode::OK);
}
