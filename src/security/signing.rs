//! Random tokens and HMAC-SHA256 signatures.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Random hex string of exactly `length` characters.
pub fn generate_secure_token(length: usize) -> String {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut token = hex::encode(bytes);
    token.truncate(length);
    token
}

pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn mac(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size")
}

/// `data.signature` where the signature is the hex HMAC-SHA256 of `data`.
pub fn sign_data(data: &str, secret: &[u8]) -> String {
    let mut mac = mac(secret);
    mac.update(data.as_bytes());
    format!("{}.{}", data, hex::encode(mac.finalize().into_bytes()))
}

/// Original data when the signature after the last `.` matches.
pub fn verify_signature(signed: &str, secret: &[u8]) -> Option<String> {
    let (data, signature) = signed.rsplit_once('.')?;
    let signature = hex::decode(signature).ok()?;

    let mut mac = mac(secret);
    mac.update(data.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&signature).ok()?;

    Some(data.to_string())
}

/// Outcome of checking a timed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedToken {
    Valid {
        user_id: String,
        expiry: DateTime<Utc>,
        /// Seconds left
        expires_in: i64,
    },
    Expired {
        user_id: String,
        expiry: DateTime<Utc>,
    },
    InvalidSignature,
    Malformed,
}

impl TimedToken {
    pub fn is_valid(&self) -> bool {
        matches!(self, TimedToken::Valid { .. })
    }
}

/// Signed `user_id:expiry` token valid for `expires_in`.
pub fn generate_timed_token(user_id: &str, expires_in: Duration, secret: &[u8]) -> String {
    let expiry = (Utc::now() + expires_in).timestamp();
    sign_data(&format!("{}:{}", user_id, expiry), secret)
}

pub fn validate_timed_token(token: &str, secret: &[u8]) -> TimedToken {
    if !token.contains('.') {
        return TimedToken::Malformed;
    }
    let Some(data) = verify_signature(token, secret) else {
        return TimedToken::InvalidSignature;
    };

    let Some((user_id, expiry)) = data.rsplit_once(':') else {
        return TimedToken::Malformed;
    };
    let Some(expiry) = expiry
        .parse::<i64>()
        .ok()
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    else {
        return TimedToken::Malformed;
    };

    let now = Utc::now();
    if now > expiry {
        return TimedToken::Expired {
            user_id: user_id.to_string(),
            expiry,
        };
    }

    TimedToken::Valid {
        user_id: user_id.to_string(),
        expiry,
        expires_in: (expiry - now).num_seconds(),
    }
}
