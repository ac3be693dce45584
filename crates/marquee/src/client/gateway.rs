//! Credential-decorating request gateway.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::auth::AccessCredential;
use crate::session::SessionManager;

use super::error::{ApiError, Result};
use super::transport::{ApiRequest, ApiResponse, Transport};

/// Sends authorized requests and absorbs expired-credential failures.
///
/// A rejected credential triggers one refresh through the session manager
/// and exactly one retry. Anything that cannot be recovered signs the
/// session out and fires the login redirect.
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
}

impl RequestGateway {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Receiver for the one-shot login redirect.
    pub fn redirects(&self) -> watch::Receiver<bool> {
        self.session.redirects()
    }

    /// Send `request` with the current access credential.
    ///
    /// Returns only successful responses; every other status is mapped to
    /// an [`ApiError`]. [`ApiError::AuthorizationExpired`] never escapes.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let credential = self.authorize(None).await?;

        match self.dispatch(&request, &credential).await {
            Err(ApiError::AuthorizationExpired) => {
                debug!(path = %request.path, "Access credential rejected, refreshing");
                let renewed = self.authorize(Some(&credential)).await?;
                match self.dispatch(&request, &renewed).await {
                    Err(ApiError::AuthorizationExpired | ApiError::AuthorizationInvalid(_)) => {
                        warn!(path = %request.path, "Renewed credential rejected");
                        Err(self.end_session().await)
                    }
                    other => other,
                }
            }
            Err(ApiError::AuthorizationInvalid(_)) => Err(self.end_session().await),
            other => other,
        }
    }

    /// [`execute`](Self::execute) and decode the body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    /// A credential fit for dispatch, refreshing first if needed.
    async fn authorize(&self, rejected: Option<&AccessCredential>) -> Result<AccessCredential> {
        if rejected.is_none()
            && let Some(credential) = self.session.current_access_credential()
        {
            return Ok(credential);
        }

        match self.session.refresh(rejected).await {
            Ok(credential) => Ok(credential),
            Err(ApiError::AuthorizationInvalid(_)) => Err(self.end_session().await),
            Err(e) => Err(e),
        }
    }

    async fn dispatch(&self, request: &ApiRequest, credential: &AccessCredential) -> Result<ApiResponse> {
        let request = request.clone().with_bearer(credential.token());
        self.transport.send(request).await?.error_for_status()
    }

    async fn end_session(&self) -> ApiError {
        self.session.invalidate().await;
        ApiError::AuthorizationInvalid("Your session has ended. Please sign in again.".into())
    }
}
