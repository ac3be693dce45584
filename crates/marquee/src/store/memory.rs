//! In-memory credential storage for ephemeral sessions and tests.

// std::sync::Mutex is correct here: the lock is never held across .await points.
use std::sync::Mutex;

use async_trait::async_trait;

use super::credentials::{CredentialStore, StoredCredentials};
use super::error::StorageResult;

/// Credentials kept in process memory; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credentials`.
    #[must_use]
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            slot: Mutex::new(Some(credentials)),
        }
    }

    /// Current contents without going through the async trait.
    pub fn snapshot(&self) -> Option<StoredCredentials> {
        self.slot.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> StorageResult<Option<StoredCredentials>> {
        Ok(self.snapshot())
    }

    async fn set(&self, credentials: &StoredCredentials) -> StorageResult<()> {
        *self.slot.lock().expect("mutex poisoned") = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.slot.lock().expect("mutex poisoned").take();
        Ok(())
    }
}
