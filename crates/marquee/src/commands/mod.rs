//! CLI command implementations.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tracing::debug;

use marquee::annotations::AnnotationEngine;
use marquee::client::{ApiError, CatalogClient, HttpTransport, RequestGateway, Transport};
use marquee::config::Config;
use marquee::session::{SessionManager, SessionStatus};
use marquee::store::FileCredentialStore;

pub mod annotate;
pub mod auth;
pub mod browse;
mod render;

/// Everything a command needs, wired from the config file.
pub struct Context {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub client: CatalogClient,
    pub engine: AnnotationEngine,
}

impl Context {
    /// Load config, open the credential store and start the session.
    pub async fn open(config_path: &str) -> Result<Self> {
        let path = Path::new(config_path);
        let config = Config::load(path)
            .await
            .with_context(|| format!("failed to load config '{config_path}'"))?;

        let transport: Arc<dyn Transport> = Arc::new(
            HttpTransport::new(&config.api.base_url, config.api.request_timeout())
                .context("failed to build HTTP client")?,
        );
        let credentials_path = config.credentials_path(path);
        debug!(path = %credentials_path.display(), "Using credentials file");
        let store = Arc::new(FileCredentialStore::new(credentials_path));

        let session = SessionManager::new(transport.clone(), store);
        let status = session.start().await;
        debug!(%status, "Session started");

        let gateway = Arc::new(RequestGateway::new(transport, session.clone()));
        let client = CatalogClient::new(gateway);
        let engine = AnnotationEngine::new(client.clone());

        Ok(Self {
            config,
            session,
            client,
            engine,
        })
    }

    pub fn require_session(&self) -> Result<()> {
        match self.session.status() {
            SessionStatus::Authenticated => Ok(()),
            _ => bail!("Not signed in. Run `marquee login` first."),
        }
    }

    /// Let background session work finish before the process exits.
    pub async fn finish(self) {
        self.session.settle().await;
    }
}

/// Prompt on stdout and read one trimmed line from stdin.
pub fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Use `given` or prompt for a secret. Empty answers are rejected.
pub fn secret_or_prompt(given: Option<String>, label: &str) -> Result<String> {
    let secret = match given {
        Some(secret) => secret,
        None => prompt(label)?,
    };
    if secret.is_empty() {
        bail!("{label} must not be empty");
    }
    Ok(secret)
}

/// Message to show for a failed account operation.
///
/// Login and form errors carry the service's own wording; everything else
/// falls back to the generic banner text.
pub fn explain(e: ApiError) -> anyhow::Error {
    match e {
        ApiError::AuthorizationInvalid(message) | ApiError::ValidationFailed(message) => {
            anyhow::anyhow!(message)
        }
        other => anyhow::anyhow!(other.user_message()),
    }
}
