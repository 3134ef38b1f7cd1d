//! Persisted tokens (refresh tokens and any other revocable token).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::{TOKEN_KIND_ACCESS, TOKEN_KIND_REFRESH};

/// Token purpose, stored in the `type` column and the JWT `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => TOKEN_KIND_ACCESS,
            TokenKind::Refresh => TOKEN_KIND_REFRESH,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TOKEN_KIND_ACCESS => Ok(TokenKind::Access),
            TOKEN_KIND_REFRESH => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: Uuid,
    pub token: String,
    pub token_type: TokenKind,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
