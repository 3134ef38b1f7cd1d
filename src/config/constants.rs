//! Application-wide constants
//!
//! Centralized location for magic values and per-environment defaults.

// =============================================================================
// Application
// =============================================================================

/// Base project name (environment suffix appended in dev/test)
pub const DEFAULT_PROJECT_NAME: &str = "CRUD API Template";

/// Prefix for all versioned API routes
pub const DEFAULT_API_V1_STR: &str = "/api/v1";

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Highest accepted page number. `MAX_PAGE_NUMBER * MAX_PAGE_SIZE` stays
/// well inside the `i64` offset the database binds.
pub const MAX_PAGE_NUMBER: u64 = 1_000_000_000;

// =============================================================================
// Authentication & Security
// =============================================================================

/// Development-only secret. Rejected in production.
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-me-in-production!!";

/// Minimum secret key length in production
pub const MIN_SECRET_KEY_LENGTH: usize = 32;

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Default refresh token lifetime in days
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 7;

/// Upper bound for ACCESS_TOKEN_EXPIRE_MINUTES (one year)
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

/// Upper bound for REFRESH_TOKEN_EXPIRE_DAYS (ten years)
pub const MAX_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 3650;

/// Default JWT signing algorithm
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Supported HMAC JWT algorithms
pub const SUPPORTED_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// OAuth2 token type returned to clients
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// JWT `type` claim for access tokens
pub const TOKEN_KIND_ACCESS: &str = "access";

/// JWT `type` claim for refresh tokens
pub const TOKEN_KIND_REFRESH: &str = "refresh";

/// Salt used when deriving the encryption key from SECRET_KEY
pub const ENCRYPTION_KEY_SALT: &[u8] = b"crud_api_template_salt";

/// PBKDF2 iterations for key derivation
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derived encryption key length in bytes
pub const ENCRYPTION_KEY_LENGTH: usize = 32;

/// Minimum acceptable length for a user supplied encryption key
pub const MIN_ENCRYPTION_KEY_LENGTH: usize = 16;

// =============================================================================
// Server Configuration
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8000;

// =============================================================================
// Database
// =============================================================================

/// Development database (file-backed SQLite, created on demand)
pub const DEFAULT_DEV_DATABASE_URL: &str = "sqlite://./dev.db?mode=rwc";

/// Testing database (in-memory SQLite)
pub const DEFAULT_TEST_DATABASE_URL: &str = "sqlite::memory:";

/// Accepted database URL schemes
pub const VALID_DATABASE_PREFIXES: &[&str] = &["postgres://", "postgresql://", "sqlite:"];

// =============================================================================
// Cache
// =============================================================================

/// Default Redis host
pub const DEFAULT_REDIS_HOST: &str = "localhost";

/// Default Redis port
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default Redis logical database
pub const DEFAULT_REDIS_DB: u8 = 0;

/// Default cache TTL in seconds (1 hour)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Default directory for the file cache backend
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// File extension of file cache entries
pub const CACHE_FILE_EXTENSION: &str = "cache";

/// Cache key prefix for user data
pub const CACHE_PREFIX_USER: &str = "user";

/// Cache key prefix for item data
pub const CACHE_PREFIX_ITEM: &str = "item";

// =============================================================================
// Rate Limiting
// =============================================================================

/// Default allowed requests per client per window
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 10;

/// Sliding window length in milliseconds
pub const RATE_LIMIT_WINDOW_MS: u64 = 1000;

/// Idle clients are swept once more than this many are tracked
pub const RATE_LIMIT_MAX_TRACKED_CLIENTS: usize = 10_000;

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: u64 = 8;

/// Minimum username length requirement
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum accepted upload size in bytes (10 MB)
pub const MAX_FILE_SIZE_BYTES: i64 = 10 * 1024 * 1024;

/// Image extensions accepted by `validate_image_file`
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// Extensions accepted for registered files
pub const ALLOWED_FILE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".pdf", ".txt", ".csv", ".json", ".doc",
    ".docx", ".xls", ".xlsx", ".zip",
];

/// MIME types accepted for registered files
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "application/pdf",
    "text/plain",
    "text/csv",
    "application/json",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/zip",
];
