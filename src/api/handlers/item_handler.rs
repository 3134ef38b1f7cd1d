//! Item handlers. Items are visible to their owner and to admins.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_access, CurrentUser};
use crate::api::AppState;
use crate::domain::{Item, ItemChanges, NewItem};
use crate::errors::AppResult;
use crate::types::{Created, NoContent, Paginated, PaginationParams};
use crate::validators::sanitize_input;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    #[schema(example = "Groceries")]
    pub title: String,
    #[schema(example = "Milk, eggs, bread")]
    pub description: Option<String>,
}

/// Partial update. `"description": null` clears the description.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Create item routes
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

/// Load an item and check the caller may touch it.
async fn accessible_item(state: &AppState, current: &CurrentUser, id: Uuid) -> AppResult<Item> {
    let item = state.services.items().get_item(id).await?;
    require_access(current, item.owner_id)?;
    Ok(item)
}

/// List items. Admins see every item, others only their own.
#[utoipa::path(
    get,
    path = "/items",
    tag = "Items",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of items", body = PaginatedItems),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_items(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
) -> AppResult<Json<Paginated<Item>>> {
    let items = state.services.items();
    let page = if current.is_admin() {
        items.list_items(params).await?
    } else {
        items.list_user_items(current.id(), params).await?
    };

    Ok(Json(page))
}

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "/items",
    tag = "Items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> AppResult<Created<Item>> {
    let item = state
        .services
        .items()
        .create_item(NewItem {
            title: sanitize_input(&payload.title),
            description: payload.description.as_deref().map(sanitize_input),
            owner_id: current.id(),
        })
        .await?;

    Ok(Created(item))
}

/// Get an item (owner or admin)
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    Ok(Json(accessible_item(&state, &current, id).await?))
}

/// Update an item (owner or admin)
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated item", body = Item),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateItemRequest>,
) -> AppResult<Json<Item>> {
    accessible_item(&state, &current, id).await?;

    let changes = ItemChanges {
        title: payload.title.as_deref().map(sanitize_input),
        description: payload
            .description
            .map(|description| description.as_deref().map(sanitize_input)),
    };
    let item = state.services.items().update_item(id, changes).await?;

    Ok(Json(item))
}

/// Delete an item (owner or admin)
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    accessible_item(&state, &current, id).await?;

    state.services.items().delete_item(id).await?;
    Ok(NoContent)
}
