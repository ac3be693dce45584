//! Durable storage for session credentials.
//!
//! The session layer only depends on the [`CredentialStore`] trait; the
//! backends here are interchangeable.

mod credentials;
mod error;
mod file;
mod memory;

pub use credentials::{CredentialStore, StoredCredentials};
pub use error::{StorageError, StorageResult};
pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
