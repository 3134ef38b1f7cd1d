//! User management handlers.
//!
//! Everyone may read and update their own account. Listing, creating and
//! deleting accounts, and changing `is_active`/`is_admin`, are admin-only.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_access, require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::{Password, UserResponse};
use crate::errors::{AppError, AppResult};
use crate::services::{NewAccount, UserUpdate};
use crate::types::{Created, NoContent, Paginated, PaginationParams};

/// Admin request to create an account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    #[schema(example = "johndoe")]
    pub username: String,
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
}

fn active_by_default() -> bool {
    true
}

/// Partial update. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    pub password: Option<String>,
    /// Admin only
    pub is_active: Option<bool>,
    /// Admin only
    pub is_admin: Option<bool>,
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/me",
            get(get_current_user)
                .put(update_current_user)
                .patch(update_current_user),
        )
        .route(
            "/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

async fn apply_update(
    state: &AppState,
    current: &CurrentUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<UserResponse> {
    let update = UserUpdate {
        email: payload.email,
        username: payload.username,
        password: payload.password,
        is_active: payload.is_active,
        is_admin: payload.is_admin,
    };

    if update.touches_privileges() {
        require_admin(current)?;
    }
    if let Some(password) = update.password.as_deref() {
        Password::check_strength(password)?;
    }

    let user = state.services.users().update_user(id, update).await?;
    Ok(UserResponse::from(user))
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of users", body = PaginatedUsers),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
) -> AppResult<Json<Paginated<UserResponse>>> {
    require_admin(&current)?;

    let page = state.services.users().list_users(params).await?;
    Ok(Json(page.map(UserResponse::from)))
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserResponse>> {
    require_admin(&current)?;
    Password::check_strength(&payload.password)?;

    let user = state
        .services
        .users()
        .create_user(NewAccount {
            email: payload.email,
            username: payload.username,
            password: payload.password,
            is_active: payload.is_active,
            is_admin: payload.is_admin,
        })
        .await?;

    Ok(Created(UserResponse::from(user)))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(current: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(current.0))
}

/// Update the authenticated user
#[utoipa::path(
    put,
    path = "/users/me",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Privilege change by a non-admin"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_current_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let id = current.id();
    Ok(Json(apply_update(&state, &current, id, payload).await?))
}

/// Get a user by id (self or admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    require_access(&current, id)?;

    Ok(Json(state.services.users().get_user(id).await?))
}

/// Update a user by id (self or admin)
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    require_access(&current, id)?;

    Ok(Json(apply_update(&state, &current, id, payload).await?))
}

/// Delete a user (admin only, never yourself)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Attempt to delete your own account"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    require_admin(&current)?;
    if id == current.id() {
        return Err(AppError::bad_request("Admins cannot delete their own account"));
    }

    state.services.users().delete_user(id).await?;
    Ok(NoContent)
}
