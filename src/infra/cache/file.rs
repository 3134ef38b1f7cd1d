//! Directory-backed cache.
//!
//! One JSON file per key, named after the SHA-256 of the key. The key is
//! stored inside the file so pattern invalidation can match on it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{glob_to_regex, CacheBackend};
use crate::config::CACHE_FILE_EXTENSION;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FileEntry {
    pub key: String,
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct FileCache {
    dir: PathBuf,
    default_ttl: u64,
}

impl FileCache {
    /// Use `dir` as the cache directory, creating it when missing.
    pub async fn open(dir: impl AsRef<Path>, default_ttl: u64) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Cache(format!("cannot create cache dir {}: {}", dir.display(), e))
        })?;

        Ok(Self { dir, default_ttl })
    }

    pub(crate) fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.{}", digest, CACHE_FILE_EXTENSION))
    }

    /// Parsed entry, or `None` for missing files. Corrupt files are removed.
    async fn read_entry(&self, path: &Path) -> AppResult<Option<FileEntry>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Removing corrupt cache file");
                remove_quietly(path).await;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key);

        match self.read_entry(&path).await? {
            Some(entry) if entry.is_expired(Utc::now()) => {
                remove_quietly(&path).await;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<u64>) -> AppResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = FileEntry {
            key: key.to_string(),
            value,
            expires_at: (ttl > 0).then(|| Utc::now() + Duration::seconds(ttl as i64)),
        };
        let json = serde_json::to_vec(&entry)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        // Write then rename so readers never see a half-written file
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn clear_pattern(&self, pattern: &str) -> AppResult<u64> {
        let re = glob_to_regex(pattern)?;
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut removed = 0;

        while let Some(item) = dir.next_entry().await.map_err(io_error)? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXTENSION) {
                continue;
            }

            if let Some(entry) = self.read_entry(&path).await? {
                if re.is_match(&entry.key) {
                    remove_quietly(&path).await;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    async fn ping(&self) -> AppResult<()> {
        tokio::fs::metadata(&self.dir).await.map_err(io_error)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(file = %path.display(), error = %e, "Failed to remove cache file");
        }
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Cache(format!("file cache: {}", e))
}
