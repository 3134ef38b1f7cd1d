//! JWT access and refresh tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::TokenKind;
use crate::errors::{AppError, AppResult};

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Unique per token so two tokens minted in the same second differ
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl Claims {
    /// Subject parsed as a user id.
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

/// `now + ttl`, or an error when the result is past what chrono can represent.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> AppResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::internal("Token lifetime out of range"))
}

/// Signing material plus default lifetimes.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8], algorithm: Algorithm, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.secret_bytes(),
            config.jwt_algorithm(),
            config.access_token_ttl(),
            config.refresh_token_ttl(),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Access token for `sub`, valid for `ttl` or the configured default.
    pub fn create_access_token(&self, sub: &str, ttl: Option<Duration>) -> AppResult<String> {
        self.issue(sub, TokenKind::Access, ttl.unwrap_or(self.access_ttl), None)
    }

    /// Access token that also carries the admin flag.
    pub fn create_access_token_for(&self, sub: &str, is_admin: bool) -> AppResult<String> {
        self.issue(sub, TokenKind::Access, self.access_ttl, Some(is_admin))
    }

    pub fn create_refresh_token(&self, sub: &str, ttl: Option<Duration>) -> AppResult<String> {
        self.issue(sub, TokenKind::Refresh, ttl.unwrap_or(self.refresh_ttl), None)
    }

    fn issue(&self, sub: &str, kind: TokenKind, ttl: Duration, is_admin: Option<bool>) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: expiry_after(now, ttl)?.timestamp(),
            kind,
            jti: Uuid::new_v4().to_string(),
            is_admin,
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding)?)
    }

    /// Decode and check the signature. Expiry is checked only when `verify_exp`.
    pub fn decode(&self, token: &str, verify_exp: bool) -> AppResult<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = verify_exp;
        if !verify_exp {
            validation.required_spec_claims.clear();
        }

        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }

    /// Decode a live token and require a specific kind.
    pub fn decode_kind(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = self.decode(token, true)?;

        if claims.kind != expected {
            tracing::debug!(expected = %expected, got = %claims.kind, "Wrong token type");
            return Err(AppError::InvalidToken);
        }

        Ok(claims)
    }
}
