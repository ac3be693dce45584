//! Access-credential handling.

mod credential;

pub use credential::{AccessCredential, CredentialError, EXPIRY_LEEWAY_SECONDS};
