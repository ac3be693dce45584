use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::api::Identity;

/// Seconds before the embedded expiry at which a credential is already
/// treated as expired, so a request never reaches the wire with a credential
/// that lapses in transit.
pub const EXPIRY_LEEWAY_SECONDS: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid credential format")]
    Format,
    #[error("invalid credential payload: {0}")]
    Payload(String),
    #[error("credential has no expiry claim")]
    MissingExpiry,
}

/// Claims read from the credential payload. The signature is not verified;
/// the client only needs the expiry and a display identity.
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    exp: Option<i64>,
    #[serde(default)]
    user_id: Option<u64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Short-lived bearer credential with a self-describing expiry.
#[derive(Clone)]
pub struct AccessCredential {
    token: String,
    expires_at: DateTime<Utc>,
    claims: Claims,
}

impl AccessCredential {
    /// Decode a compact `header.payload.signature` token.
    pub fn parse(token: &str) -> Result<Self, CredentialError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::Format);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| CredentialError::Payload(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|e| CredentialError::Payload(e.to_string()))?;

        let exp = claims.exp.ok_or(CredentialError::MissingExpiry)?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| CredentialError::Payload(format!("exp out of range: {exp}")))?;

        Ok(Self {
            token: token.to_string(),
            expires_at,
            claims,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential must no longer be sent at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() + EXPIRY_LEEWAY_SECONDS >= self.expires_at.timestamp()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Identity seeded from the token claims until the profile is fetched.
    pub fn identity_hint(&self) -> Identity {
        Identity {
            id: self.claims.user_id,
            username: self.claims.username.clone(),
            email: self.claims.email.clone(),
            ..Identity::default()
        }
    }
}

impl PartialEq for AccessCredential {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for AccessCredential {}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
