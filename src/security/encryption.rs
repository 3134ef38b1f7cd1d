//! Symmetric encryption for secrets at rest.
//!
//! ChaCha20-Poly1305 with a random 96-bit nonce per message. Ciphertext is
//! returned as URL-safe base64 of `nonce || ciphertext || tag`.

use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use sha2::Sha256;

use crate::config::{
    Config, ENCRYPTION_KEY_LENGTH, ENCRYPTION_KEY_SALT, MIN_ENCRYPTION_KEY_LENGTH,
    PBKDF2_ITERATIONS,
};
use crate::errors::{AppError, AppResult};

const NONCE_LENGTH: usize = 12;

pub struct Encryptor {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").field("key", &"[REDACTED]").finish()
    }
}

impl Encryptor {
    /// Build from a key string.
    ///
    /// URL-safe base64 of exactly 32 bytes is used as the raw key; any
    /// other string is stretched with PBKDF2.
    pub fn new(key: &str) -> Self {
        Self::from_key_bytes(resolve_key(key))
    }

    /// Key resolution: `explicit`, then `ENCRYPTION_KEY`, then a key derived
    /// from `SECRET_KEY`, then a random key that lives as long as the process.
    pub fn resolve(explicit: Option<&str>, config: Option<&Config>) -> Self {
        if let Some(key) = explicit {
            return Self::new(key);
        }

        if let Some(config) = config {
            if let Some(key) = config.encryption_key() {
                return Self::new(key);
            }
            if !config.secret_bytes().is_empty() {
                return Self::from_key_bytes(derive_key(config.secret_bytes()));
            }
        }

        tracing::warn!("No encryption key configured, using a random key; data will not survive a restart");
        Self::random()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::resolve(None, Some(config))
    }

    pub fn random() -> Self {
        let mut key = [0u8; ENCRYPTION_KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self::from_key_bytes(key)
    }

    fn from_key_bytes(key: [u8; ENCRYPTION_KEY_LENGTH]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> AppResult<String> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| AppError::internal("Encryption failed"))?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(payload))
    }

    /// Reverse of `encrypt`. Tampered or foreign payloads are a `BadRequest`.
    pub fn decrypt(&self, encoded: &str) -> AppResult<Vec<u8>> {
        let payload = URL_SAFE
            .decode(encoded.trim())
            .map_err(|_| AppError::bad_request("Encrypted payload is not valid base64"))?;

        if payload.len() <= NONCE_LENGTH {
            return Err(AppError::bad_request("Encrypted payload is too short"));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LENGTH);

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::bad_request("Decryption failed"))
    }

    pub fn encrypt_text(&self, text: &str) -> AppResult<String> {
        self.encrypt(text.as_bytes())
    }

    pub fn decrypt_text(&self, encoded: &str) -> AppResult<String> {
        String::from_utf8(self.decrypt(encoded)?)
            .map_err(|_| AppError::bad_request("Decrypted data is not UTF-8"))
    }

    /// Encrypt `input` into `output` (base64 text).
    pub async fn encrypt_file(&self, input: &Path, output: &Path) -> AppResult<()> {
        let data = tokio::fs::read(input).await.map_err(|e| file_error(input, e))?;
        let encrypted = self.encrypt(&data)?;
        tokio::fs::write(output, encrypted)
            .await
            .map_err(|e| file_error(output, e))
    }

    pub async fn decrypt_file(&self, input: &Path, output: &Path) -> AppResult<()> {
        let encoded = tokio::fs::read_to_string(input)
            .await
            .map_err(|e| file_error(input, e))?;
        let data = self.decrypt(&encoded)?;
        tokio::fs::write(output, data)
            .await
            .map_err(|e| file_error(output, e))
    }
}

/// Fresh random key, URL-safe base64 encoded.
pub fn generate_key() -> String {
    let mut key = [0u8; ENCRYPTION_KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    URL_SAFE.encode(key)
}

/// A key must carry at least 16 bytes, counted after base64 decoding when it decodes.
pub fn validate_key(key: &str) -> bool {
    let len = URL_SAFE
        .decode(key)
        .map(|bytes| bytes.len())
        .unwrap_or(key.len());
    len >= MIN_ENCRYPTION_KEY_LENGTH
}

fn resolve_key(key: &str) -> [u8; ENCRYPTION_KEY_LENGTH] {
    if let Ok(bytes) = URL_SAFE.decode(key) {
        if let Ok(raw) = <[u8; ENCRYPTION_KEY_LENGTH]>::try_from(bytes.as_slice()) {
            return raw;
        }
    }
    derive_key(key.as_bytes())
}

fn derive_key(secret: &[u8]) -> [u8; ENCRYPTION_KEY_LENGTH] {
    let mut key = [0u8; ENCRYPTION_KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, ENCRYPTION_KEY_SALT, PBKDF2_ITERATIONS, &mut key);
    key
}

fn file_error(path: &Path, e: std::io::Error) -> AppError {
    AppError::internal(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_with_generated_key() {
        let key = generate_key();
        assert!(validate_key(&key));

        let encryptor = Encryptor::new(&key);
        let encrypted = encryptor.encrypt_text("secret value").unwrap();

        assert_ne!(encrypted, "secret value");
        assert_eq!(encryptor.decrypt_text(&encrypted).unwrap(), "secret value");
    }

    #[test]
    fn test_nonce_makes_ciphertexts_differ() {
        let encryptor = Encryptor::random();
        assert_ne!(
            encryptor.encrypt_text("same").unwrap(),
            encryptor.encrypt_text("same").unwrap()
        );
    }

    #[test]
    fn test_passphrase_keys_are_deterministic() {
        let a = Encryptor::new("correct horse battery staple");
        let b = Encryptor::new("correct horse battery staple");
        let c = Encryptor::new("another passphrase entirely");

        let encrypted = a.encrypt_text("payload").unwrap();
        assert_eq!(b.decrypt_text(&encrypted).unwrap(), "payload");
        assert!(c.decrypt_text(&encrypted).is_err());
    }

    #[test]
    fn test_explicit_key_wins_over_config() {
        let config = Config::from_lookup(|key| match key {
            "ENVIRONMENT" => Some("testing".to_string()),
            "ENCRYPTION_KEY" => Some("configured-key-value".to_string()),
            _ => None,
        })
        .unwrap();

        let explicit = Encryptor::resolve(Some("explicit-key-value"), Some(&config));
        let configured = Encryptor::from_config(&config);
        let encrypted = configured.encrypt_text("x").unwrap();

        assert!(explicit.decrypt_text(&encrypted).is_err());
        assert_eq!(Encryptor::new("configured-key-value").decrypt_text(&encrypted).unwrap(), "x");
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let encryptor = Encryptor::random();
        let mut encrypted = encryptor.encrypt(b"data").unwrap().into_bytes();
        let last = encrypted.len() - 2;
        encrypted[last] = if encrypted[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(encrypted).unwrap();

        assert!(matches!(encryptor.decrypt(&tampered), Err(AppError::BadRequest(_))));
        assert!(encryptor.decrypt("@@not base64@@").is_err());
        assert!(encryptor.decrypt("AAAA").is_err());
    }

    #[test]
    fn test_validate_key_length() {
        assert!(!validate_key("short"));
        assert!(validate_key("sixteen chars ok"));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let sealed = dir.path().join("plain.txt.enc");
        let restored = dir.path().join("restored.txt");
        tokio::fs::write(&plain, b"file contents").await.unwrap();

        let encryptor = Encryptor::random();
        encryptor.encrypt_file(&plain, &sealed).await.unwrap();
        encryptor.decrypt_file(&sealed, &restored).await.unwrap();

        assert_ne!(tokio::fs::read(&sealed).await.unwrap(), b"file contents");
        assert_eq!(tokio::fs::read(&restored).await.unwrap(), b"file contents");
    }
}
