//! Credential storage trait.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Identity;

use super::error::StorageResult;

/// Everything the session persists between runs.
///
/// Both credentials are written together so a reader never observes a new
/// access credential paired with a stale refresh credential.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub schema_version: String,
    pub access: String,
    pub refresh: String,
    /// Last known profile. Display only, never used for authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub const SCHEMA_VERSION: &'static str = "1";

    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        identity: Option<Identity>,
    ) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION.to_string(),
            access: access.into(),
            refresh: refresh.into(),
            identity,
            saved_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.schema_version == Self::SCHEMA_VERSION
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("schema_version", &self.schema_version)
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("identity", &self.identity)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Durable key-value persistence for the session's credentials.
///
/// Only the session manager writes through this trait.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credentials.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    async fn get(&self) -> StorageResult<Option<StoredCredentials>>;

    /// Replace the stored credentials.
    ///
    /// Must be atomic - either fully succeeds or has no effect.
    async fn set(&self, credentials: &StoredCredentials) -> StorageResult<()>;

    /// Remove everything. Clearing an empty store is not an error.
    async fn clear(&self) -> StorageResult<()>;
}
