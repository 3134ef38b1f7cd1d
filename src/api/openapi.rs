//! OpenAPI documentation configuration.
//!
//! Served through Swagger UI when `ENABLE_DOCS` is set. Paths are relative
//! to the API prefix, which is injected as the server URL at startup.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth_handler, file_handler, item_handler, user_handler};
use crate::domain::{File, Item, UserResponse};
use crate::services::TokenPair;
use crate::types::{MessageResponse, PageInfo, PaginatedFiles, PaginatedItems, PaginatedUsers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRUD API Template",
        version = "0.1.0",
        description = "User, item and file management with JWT authentication"
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::refresh,
        auth_handler::logout,
        user_handler::list_users,
        user_handler::create_user,
        user_handler::get_current_user,
        user_handler::update_current_user,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        item_handler::list_items,
        item_handler::create_item,
        item_handler::get_item,
        item_handler::update_item,
        item_handler::delete_item,
        file_handler::list_files,
        file_handler::register_file,
        file_handler::get_file,
        file_handler::update_file,
        file_handler::delete_file,
    ),
    components(
        schemas(
            UserResponse,
            Item,
            File,
            TokenPair,
            MessageResponse,
            PageInfo,
            PaginatedUsers,
            PaginatedItems,
            PaginatedFiles,
            auth_handler::RegisterRequest,
            auth_handler::LoginForm,
            auth_handler::RefreshRequest,
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            item_handler::CreateItemRequest,
            item_handler::UpdateItemRequest,
            file_handler::RegisterFileRequest,
            file_handler::UpdateFileRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token rotation"),
        (name = "Users", description = "Account management"),
        (name = "Items", description = "Items owned by users"),
        (name = "Files", description = "File metadata")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
