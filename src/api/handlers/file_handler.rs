//! File metadata handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_access, require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::{File, FileChanges, NewFile};
use crate::errors::{AppError, AppResult};
use crate::types::{Created, NoContent, Paginated, PaginationParams};
use crate::validators::validate_image_file;

const IMAGE_FILE_TYPE: &str = "image";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterFileRequest {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    #[schema(example = "report.pdf")]
    pub name: String,
    #[validate(length(min = 1, max = 1024, message = "path must be between 1 and 1024 characters"))]
    #[schema(example = "uploads/2024/report.pdf")]
    pub path: String,
    #[validate(length(min = 1, max = 50, message = "file_type must be between 1 and 50 characters"))]
    #[schema(example = "document")]
    pub file_type: String,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFileRequest {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 1024, message = "path must be between 1 and 1024 characters"))]
    pub path: Option<String>,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
}

/// Optional listing filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileFilter {
    /// Admins only: list every file of this type
    pub file_type: Option<String>,
}

/// Create file routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).post(register_file))
        .route("/:id", get(get_file).patch(update_file).delete(delete_file))
}

fn require_file_access(current: &CurrentUser, file: &File) -> AppResult<()> {
    match file.user_id {
        Some(owner_id) => require_access(current, owner_id),
        None => require_admin(current),
    }
}

async fn accessible_file(state: &AppState, current: &CurrentUser, id: Uuid) -> AppResult<File> {
    let file = state.services.files().get_file(id).await?;
    require_file_access(current, &file)?;
    Ok(file)
}

fn check_image(file_type: &str, name: &str) -> AppResult<()> {
    if file_type.trim().eq_ignore_ascii_case(IMAGE_FILE_TYPE) {
        validate_image_file(name).map_err(AppError::validation)?;
    }
    Ok(())
}

/// List the caller's files, or every file of one type for admins
#[utoipa::path(
    get,
    path = "/files",
    tag = "Files",
    params(PaginationParams, FileFilter),
    responses(
        (status = 200, description = "Page of files", body = PaginatedFiles),
        (status = 403, description = "Type filter used by a non-admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
    Query(filter): Query<FileFilter>,
) -> AppResult<Json<Paginated<File>>> {
    let files = state.services.files();
    let page = match filter.file_type {
        Some(file_type) => {
            require_admin(&current)?;
            files.list_by_type(&file_type, params).await?
        }
        None => files.list_user_files(current.id(), params).await?,
    };

    Ok(Json(page))
}

/// Register file metadata owned by the caller
#[utoipa::path(
    post,
    path = "/files",
    tag = "Files",
    request_body = RegisterFileRequest,
    responses(
        (status = 201, description = "File registered", body = File),
        (status = 409, description = "Path already registered"),
        (status = 422, description = "Extension, size or MIME type not allowed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_file(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(payload): ValidatedJson<RegisterFileRequest>,
) -> AppResult<Created<File>> {
    check_image(&payload.file_type, &payload.name)?;

    let file = state
        .services
        .files()
        .register_file(NewFile {
            name: payload.name,
            path: payload.path,
            file_type: payload.file_type,
            mime_type: payload.mime_type,
            size: payload.size,
            user_id: Some(current.id()),
        })
        .await?;

    Ok(Created(file))
}

/// Get file metadata (owner or admin)
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File", body = File),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<File>> {
    Ok(Json(accessible_file(&state, &current, id).await?))
}

/// Update file metadata or record its final size (owner or admin)
#[utoipa::path(
    patch,
    path = "/files/{id}",
    tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated file", body = File),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_file(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateFileRequest>,
) -> AppResult<Json<File>> {
    let existing = accessible_file(&state, &current, id).await?;
    let files = state.services.files();

    let file_type = payload.file_type.as_deref().unwrap_or(&existing.file_type);
    let name = payload.name.as_deref().unwrap_or(&existing.name);
    check_image(file_type, name)?;

    let changes = FileChanges {
        name: payload.name,
        path: payload.path,
        file_type: payload.file_type,
        mime_type: payload.mime_type,
    };

    let mut file = if changes.name.is_some()
        || changes.path.is_some()
        || changes.file_type.is_some()
        || changes.mime_type.is_some()
    {
        files.update_file(id, changes).await?
    } else {
        existing
    };

    if let Some(size) = payload.size {
        file = files.update_size(id, size).await?;
    }

    Ok(Json(file))
}

/// Delete file metadata (owner or admin)
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "Files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    accessible_file(&state, &current, id).await?;

    state.services.files().delete_file(id).await?;
    Ok(NoContent)
}
