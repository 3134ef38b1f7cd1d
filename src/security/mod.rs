//! Token, signature and encryption primitives.

pub mod encryption;
pub mod jwt;
pub mod signing;

pub use encryption::{generate_key, validate_key, Encryptor};
pub use jwt::{expiry_after, Claims, JwtKeys};
pub use signing::{
    generate_secure_token, generate_timed_token, generate_uuid, sign_data, validate_timed_token,
    verify_signature, TimedToken,
};
