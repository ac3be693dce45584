//! File-backed credential storage.
//!
//! Credentials live in a single JSON document, written atomically
//! (temp file + rename) with owner-only permissions on unix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::credentials::{CredentialStore, StoredCredentials};
use super::error::{StorageError, StorageResult};

/// File-based implementation of [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by `path`.
    ///
    /// The parent directory is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_restricted(path: &Path, contents: &[u8]) -> StorageResult<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(path)
            .await
            .map_err(|e| StorageError::file_io(path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| StorageError::file_io(path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::file_io(path, e))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> StorageResult<Option<StoredCredentials>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::file_io(&self.path, e)),
        };

        let stored: StoredCredentials = serde_json::from_str(&contents)
            .map_err(|e| StorageError::file_deserialization(&self.path, e.to_string()))?;

        if !stored.is_compatible() {
            return Err(StorageError::file_incompatible_schema(
                &self.path,
                StoredCredentials::SCHEMA_VERSION,
                &stored.schema_version,
            ));
        }

        Ok(Some(stored))
    }

    async fn set(&self, credentials: &StoredCredentials) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::file_io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        let temp_path = self.temp_path();
        Self::write_restricted(&temp_path, json.as_bytes()).await?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::file_io(&self.path, e))
    }

    async fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::file_io(&self.path, e)),
        }
    }
}
