//! Stored file metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata row for a file the API knows about. Contents live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct File {
    pub id: Uuid,
    #[schema(example = "report.pdf")]
    pub name: String,
    #[schema(example = "uploads/2024/report.pdf")]
    pub path: String,
    /// Coarse category, e.g. `document` or `image`
    #[schema(example = "document")]
    pub file_type: String,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    /// Size in bytes, unknown until the upload finishes
    pub size: Option<i64>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub path: String,
    pub file_type: String,
    pub mime_type: String,
    pub size: Option<i64>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct FileChanges {
    pub name: Option<String>,
    pub path: Option<String>,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
}
