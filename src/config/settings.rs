//! Application settings loaded from dotenv files and environment variables.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;

use super::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES, DEFAULT_ALGORITHM, DEFAULT_API_V1_STR, DEFAULT_CACHE_DIR,
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_DEV_DATABASE_URL, DEFAULT_PROJECT_NAME,
    DEFAULT_RATE_LIMIT_PER_SECOND, DEFAULT_REDIS_DB, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT,
    DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS, DEFAULT_SECRET_KEY, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEFAULT_TEST_DATABASE_URL, MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
    MAX_REFRESH_TOKEN_EXPIRE_DAYS, MIN_SECRET_KEY_LENGTH,
    SUPPORTED_ALGORITHMS, VALID_DATABASE_PREFIXES,
};

/// Errors raised while building the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabaseUrl(String),

    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("A secure SECRET_KEY (at least 32 characters) is required in production")]
    InsecureSecretKey,

    #[error("DATABASE_URL is required in production")]
    MissingDatabaseUrl,

    #[error("CORS_ORIGINS must list explicit origins in production")]
    WildcardCorsOrigin,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Parse the ENVIRONMENT value. Unknown or empty values fall back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "testing" | "test" => Environment::Testing,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// Environment-specific dotenv file
    pub fn env_file(&self) -> &'static str {
        match self {
            Environment::Development => ".env.dev",
            Environment::Testing => ".env.test",
            Environment::Production => ".env.prod",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Redis,
    Memory,
    File,
}

impl FromStr for CacheKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheKind::Redis),
            "memory" => Ok(CacheKind::Memory),
            "file" => Ok(CacheKind::File),
            _ => Err(ConfigError::InvalidValue {
                key: "CACHE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub project_name: String,
    pub api_v1_str: String,
    pub debug: bool,
    pub server_host: String,
    pub server_port: u16,
    secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub algorithm: String,
    pub database_url: String,
    pub db_echo_log: bool,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u8,
    pub cache_ttl_seconds: u64,
    pub cache_backend: CacheKind,
    pub cache_dir: PathBuf,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    pub enable_docs: bool,
    pub rate_limit_per_second: u32,
    encryption_key: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("project_name", &self.project_name)
            .field("api_v1_str", &self.api_v1_str)
            .field("debug", &self.debug)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("secret_key", &"[REDACTED]")
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .field("algorithm", &self.algorithm)
            .field("database_url", &"[REDACTED]")
            .field("db_echo_log", &self.db_echo_log)
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("redis_db", &self.redis_db)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("cache_backend", &self.cache_backend)
            .field("cache_dir", &self.cache_dir)
            .field("log_level", &self.log_level)
            .field("cors_origins", &self.cors_origins)
            .field("enable_docs", &self.enable_docs)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration from dotenv files and the process environment.
    ///
    /// Precedence (lowest first): environment defaults, `.env`, the
    /// environment-specific file (`.env.dev`, `.env.test`, `.env.prod`),
    /// process environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let process: HashMap<String, String> = env::vars().collect();
        let base_file = read_env_file(Path::new(".env"));

        let environment = Environment::parse(
            process
                .get("ENVIRONMENT")
                .or_else(|| base_file.get("ENVIRONMENT"))
                .map(String::as_str)
                .unwrap_or_default(),
        );

        let mut values = base_file;
        values.extend(read_env_file(Path::new(environment.env_file())));
        values.extend(process);

        tracing::debug!(environment = %environment, "Loading configuration");
        Self::from_lookup(|key| values.get(key).cloned())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let environment = Environment::parse(&get("ENVIRONMENT").unwrap_or_default());
        let production = environment == Environment::Production;

        let project_name = get("PROJECT_NAME").unwrap_or_else(|| match environment {
            Environment::Development => format!("{} (dev)", DEFAULT_PROJECT_NAME),
            Environment::Testing => format!("{} (test)", DEFAULT_PROJECT_NAME),
            Environment::Production => DEFAULT_PROJECT_NAME.to_string(),
        });

        let secret_key = match get("SECRET_KEY") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::InsecureSecretKey),
            None => {
                tracing::warn!("SECRET_KEY not set, using insecure default for {}", environment);
                DEFAULT_SECRET_KEY.to_string()
            }
        };
        if production
            && (secret_key == DEFAULT_SECRET_KEY || secret_key.len() < MIN_SECRET_KEY_LENGTH)
        {
            return Err(ConfigError::InsecureSecretKey);
        }

        let algorithm = get("ALGORITHM")
            .unwrap_or_else(|| DEFAULT_ALGORITHM.to_string())
            .to_ascii_uppercase();
        if !SUPPORTED_ALGORITHMS.contains(&algorithm.as_str()) {
            return Err(ConfigError::UnsupportedAlgorithm(algorithm));
        }

        let database_url = match (get("DATABASE_URL"), environment) {
            (Some(url), _) => url,
            (None, Environment::Development) => DEFAULT_DEV_DATABASE_URL.to_string(),
            (None, Environment::Testing) => DEFAULT_TEST_DATABASE_URL.to_string(),
            (None, Environment::Production) => return Err(ConfigError::MissingDatabaseUrl),
        };
        validate_database_url(&database_url)?;

        let cors_origins = parse_cors_origins(&get("CORS_ORIGINS").unwrap_or_else(|| "*".into()));
        if production && cors_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::WildcardCorsOrigin);
        }

        let dev = environment == Environment::Development;
        let debug = !production && parse_bool(&get, "DEBUG", !production)?;

        Ok(Self {
            environment,
            project_name,
            api_v1_str: get("API_V1_STR").unwrap_or_else(|| DEFAULT_API_V1_STR.to_string()),
            debug,
            server_host: get("HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_or(&get, "PORT", DEFAULT_SERVER_PORT)?,
            secret_key,
            access_token_expire_minutes: parse_in_range(
                &get,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
                1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
            )?,
            refresh_token_expire_days: parse_in_range(
                &get,
                "REFRESH_TOKEN_EXPIRE_DAYS",
                DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
                1..=MAX_REFRESH_TOKEN_EXPIRE_DAYS,
            )?,
            algorithm,
            database_url,
            db_echo_log: parse_bool(&get, "DB_ECHO_LOG", dev)?,
            redis_host: get("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
            redis_port: parse_or(&get, "REDIS_PORT", DEFAULT_REDIS_PORT)?,
            redis_db: parse_or(&get, "REDIS_DB", DEFAULT_REDIS_DB)?,
            cache_ttl_seconds: parse_or(&get, "REDIS_TTL", DEFAULT_CACHE_TTL_SECONDS)?,
            cache_backend: match get("CACHE_BACKEND") {
                Some(kind) => kind.parse()?,
                None => CacheKind::Redis,
            },
            cache_dir: get("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            log_level: get("LOG_LEVEL")
                .unwrap_or_else(|| (if dev { "DEBUG" } else { "INFO" }).to_string()),
            cors_origins,
            enable_docs: parse_bool(&get, "ENABLE_DOCS", !production)?,
            rate_limit_per_second: parse_or(
                &get,
                "RATE_LIMIT_PER_SECOND",
                DEFAULT_RATE_LIMIT_PER_SECOND,
            )?,
            encryption_key: get("ENCRYPTION_KEY"),
        })
    }

    /// Get secret bytes for token signing/verification.
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }

    /// Explicit encryption key from ENCRYPTION_KEY, if any.
    pub fn encryption_key(&self) -> Option<&str> {
        self.encryption_key.as_deref()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Redis connection URL built from host, port and database index.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expire_minutes)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_expire_days)
    }

    /// JWT algorithm (validated at load time).
    pub fn jwt_algorithm(&self) -> Algorithm {
        match self.algorithm.as_str() {
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            _ => Algorithm::HS256,
        }
    }

    /// Whether every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Read a dotenv file into a map. Missing files yield an empty map.
fn read_env_file(path: &Path) -> HashMap<String, String> {
    let iter = match dotenvy::from_filename_iter(path) {
        Ok(iter) => iter,
        Err(_) => return HashMap::new(),
    };

    let mut values = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Skipping malformed dotenv line");
            }
        }
    }
    values
}

/// Split CORS_ORIGINS into a list. `*` stays a single wildcard entry.
pub(crate) fn parse_cors_origins(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return vec!["*".to_string()];
    }
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_database_url(url: &str) -> Result<(), ConfigError> {
    if VALID_DATABASE_PREFIXES.iter().any(|p| url.starts_with(p)) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()))
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_in_range<G>(
    get: &G,
    key: &'static str,
    default: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
        None => Ok(default),
    }
}
