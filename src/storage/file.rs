//! File-per-key storage backend
//!
//! Persists each key as its own file in an XDG-compliant data directory
//! (`~/.cache/stockwatch/` on Linux). Key names are percent-escaped so that any
//! key (including `@cache_version` or `cache:search_tesla motors`) maps to a
//! safe file name.

use async_trait::async_trait;
use directories::ProjectDirs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use super::{KvStore, StorageError};

/// File extension for stored values
const VALUE_EXTENSION: &str = "kv";

/// File extension for in-flight writes
const TEMP_EXTENSION: &str = "tmp";

/// Distinguishes concurrent writes within this process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores values as files in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore using the XDG cache directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "stockwatch")?;
        let dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { dir })
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION))
    }

    /// Unique scratch file for one write of `key`
    fn temp_path(&self, key: &str) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            "{}.{}-{}.{}",
            encode_key(key),
            std::process::id(),
            seq,
            TEMP_EXTENSION
        ))
    }

    async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.value_path(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir().await?;

        // Each write gets its own temp file; the rename replaces the record atomically
        let path = self.value_path(key);
        let tmp_path = self.temp_path(key);
        let written = match fs::write(&tmp_path, value).await {
            Ok(()) => fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        written?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Percent-escapes every byte outside `[A-Za-z0-9_-]`
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Reverses `encode_key`; `None` for names it could not have produced
fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
