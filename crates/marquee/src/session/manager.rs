use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::api::{Identity, LoginRequest, ProblemDetails, RefreshRequest, RegisterRequest, TokenPair};
use crate::auth::AccessCredential;
use crate::background::BackgroundTasks;
use crate::client::{ApiError, ApiRequest, ApiResponse, Result, Transport};
use crate::store::{CredentialStore, StorageResult, StoredCredentials};

use super::{LoginRedirect, SessionStatus};

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

#[derive(Default)]
struct SessionState {
    access: Option<AccessCredential>,
    refresh: Option<String>,
    identity: Option<Identity>,
}

/// Owns the session credentials and the authentication state machine.
///
/// The manager is the only writer of the [`CredentialStore`]. At most one
/// refresh is in flight at a time; concurrent callers wait on it and reuse
/// its result.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    // std::sync::RwLock is correct here: the lock is never held across .await points.
    state: RwLock<SessionState>,
    status: watch::Sender<SessionStatus>,
    /// Serializes refresh exchanges.
    refresh_lock: Mutex<()>,
    /// Serializes store writes against in-memory state.
    store_lock: Mutex<()>,
    redirect: LoginRedirect,
    tasks: BackgroundTasks,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Arc<Self> {
        let (status, _rx) = watch::channel(SessionStatus::Unknown);
        Arc::new(Self {
            transport,
            store,
            state: RwLock::new(SessionState::default()),
            status,
            refresh_lock: Mutex::new(()),
            store_lock: Mutex::new(()),
            redirect: LoginRedirect::new(),
            tasks: BackgroundTasks::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Cached profile. Display only; never consulted for authorization.
    pub fn identity(&self) -> Option<Identity> {
        self.read_state().identity.clone()
    }

    pub fn redirect(&self) -> &LoginRedirect {
        &self.redirect
    }

    /// Receiver observing the one-shot login redirect.
    pub fn redirects(&self) -> watch::Receiver<bool> {
        self.redirect.subscribe()
    }

    /// The access credential, but only while authenticated and unexpired.
    pub fn current_access_credential(&self) -> Option<AccessCredential> {
        if self.status() != SessionStatus::Authenticated {
            return None;
        }
        self.read_state()
            .access
            .as_ref()
            .filter(|access| !access.is_expired())
            .cloned()
    }

    /// Wait for background work spawned by the session to finish.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Leave `Unknown` by inspecting the credential store.
    pub async fn start(self: &Arc<Self>) -> SessionStatus {
        let stored = match self.store.get().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                None
            }
        };

        let Some(stored) = stored else {
            self.set_status(SessionStatus::Unauthenticated);
            return self.status();
        };

        let access = match AccessCredential::parse(&stored.access) {
            Ok(access) => Some(access),
            Err(e) => {
                warn!(error = %e, "Stored access credential is unreadable");
                None
            }
        };

        {
            let mut state = self.write_state();
            state.access = access.clone();
            state.refresh = Some(stored.refresh).filter(|r| !r.is_empty());
            state.identity = stored.identity;
        }

        match access {
            Some(access) if !access.is_expired() => {
                self.set_status(SessionStatus::Authenticated);
                self.spawn_identity_refresh();
            }
            _ => {
                self.set_status(SessionStatus::Authenticating);
                match self.refresh(None).await {
                    Ok(_) => self.spawn_identity_refresh(),
                    Err(e) if e.is_auth_failure() => {}
                    Err(e) => {
                        // Keep the refresh credential; the next request retries.
                        warn!(error = %e, "Could not renew session at startup");
                        self.set_status(SessionStatus::Authenticated);
                    }
                }
            }
        }

        self.status()
    }

    /// Exchange an identifier and secret for a new session.
    ///
    /// Nothing is written unless the service accepted the credentials and
    /// the store accepted the write.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        info!("Signing in");
        let request = ApiRequest::post("/session").with_json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response = self.transport.send(request).await?;
        let pair: TokenPair = match response.status {
            200..=299 => response.json()?,
            400 | 401 | 403 => {
                warn!(status = response.status, "Sign-in rejected");
                return Err(ApiError::AuthorizationInvalid(rejection_message(
                    &response,
                    LOGIN_FAILED,
                )));
            }
            status => return Err(ApiError::from_status(status, &response.body)),
        };

        let access = parse_access(&pair.access)?;
        let refresh = pair
            .refresh
            .ok_or_else(|| ApiError::Decode("sign-in returned no refresh credential".into()))?;
        let identity = access.identity_hint();

        {
            let _guard = self.store_lock.lock().await;
            let stored = StoredCredentials::new(access.token(), refresh.clone(), Some(identity.clone()));
            self.store.set(&stored).await?;
            *self.write_state() = SessionState {
                access: Some(access),
                refresh: Some(refresh),
                identity: Some(identity.clone()),
            };
        }
        self.set_status(SessionStatus::Authenticated);
        self.redirect.reset();
        info!(user = %identity.display_name(), "Signed in");

        match self.refresh_identity().await {
            Ok(identity) => Ok(identity),
            Err(e) if e.is_auth_failure() => Err(e),
            Err(e) => {
                warn!(error = %e, "Signed in, but the profile could not be loaded");
                Ok(identity)
            }
        }
    }

    /// Create an account, then sign in with the same credentials.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity> {
        info!("Registering account");
        let response = self
            .transport
            .send(ApiRequest::post("/users/register").with_json(request)?)
            .await?;
        response.error_for_status()?;
        self.login(&request.email, &request.password).await
    }

    /// Drop the session locally. Never fails and never needs the network.
    pub async fn logout(&self) {
        let _guard = self.store_lock.lock().await;
        let had_session = {
            let mut state = self.write_state();
            let had_session = state.access.is_some() || state.refresh.is_some();
            *state = SessionState::default();
            had_session
        };
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.set_status(SessionStatus::Unauthenticated);
        if had_session {
            info!("Signed out");
        }
    }

    /// End the session after an unrecoverable authorization failure and
    /// request the login redirect. Safe to call repeatedly.
    pub async fn invalidate(&self) {
        if self.status() != SessionStatus::Unauthenticated {
            warn!("Session is no longer valid");
        }
        self.logout().await;
        self.redirect.fire();
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Obtain a fresh access credential.
    ///
    /// `stale` is the credential the caller saw rejected, if any. When a
    /// concurrent refresh already replaced it, the replacement is returned
    /// without another exchange.
    pub async fn refresh(&self, stale: Option<&AccessCredential>) -> Result<AccessCredential> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.current_access_credential()
            && Some(&current) != stale
        {
            debug!("Access credential already renewed");
            return Ok(current);
        }

        if self.status() == SessionStatus::Unauthenticated {
            return Err(ApiError::AuthorizationInvalid(SESSION_EXPIRED.into()));
        }

        let refresh_token = self.read_state().refresh.clone();
        let Some(refresh_token) = refresh_token else {
            self.invalidate().await;
            return Err(ApiError::AuthorizationInvalid(SESSION_EXPIRED.into()));
        };

        info!("Refreshing access credential");
        let pair = match self.exchange_refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "Refresh credential rejected");
                self.invalidate().await;
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, keeping session");
                return Err(e);
            }
        };

        let access = parse_access(&pair.access)?;
        {
            let mut state = self.write_state();
            if state.identity.is_none() {
                state.identity = Some(access.identity_hint());
            }
            state.access = Some(access.clone());
            if let Some(rotated) = pair.refresh {
                state.refresh = Some(rotated);
            }
        }
        self.set_status(SessionStatus::Authenticated);
        if let Err(e) = self.persist_current().await {
            warn!(error = %e, "Failed to persist renewed credentials");
        }
        info!(expires_at = %access.expires_at(), "Access credential refreshed");
        Ok(access)
    }

    async fn exchange_refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let request = ApiRequest::post("/session/refresh").with_json(&RefreshRequest {
            refresh: refresh_token.to_string(),
        })?;
        let response = self.transport.send(request).await?;
        match response.status {
            200..=299 => response.json(),
            400 | 401 | 403 => Err(ApiError::AuthorizationInvalid(rejection_message(
                &response,
                SESSION_EXPIRED,
            ))),
            status => Err(ApiError::from_status(status, &response.body)),
        }
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Fetch the profile and replace the cached snapshot.
    ///
    /// A rejected access credential is refreshed and the fetch retried once.
    /// The session ends only when the refresh or the retry is rejected too.
    pub async fn refresh_identity(&self) -> Result<Identity> {
        let mut credential = match self.current_access_credential() {
            Some(credential) => credential,
            None => self.refresh(None).await?,
        };

        let mut retried = false;
        let identity: Identity = loop {
            let response = self
                .transport
                .send(ApiRequest::get("/identity").with_bearer(credential.token()))
                .await?;
            match response.error_for_status() {
                Ok(response) => break response.json()?,
                Err(ApiError::AuthorizationExpired) if !retried => {
                    debug!("Identity fetch rejected, refreshing");
                    retried = true;
                    credential = self.refresh(Some(&credential)).await?;
                }
                Err(ApiError::AuthorizationExpired | ApiError::AuthorizationInvalid(_)) => {
                    self.invalidate().await;
                    return Err(ApiError::AuthorizationInvalid(SESSION_EXPIRED.into()));
                }
                Err(e) => return Err(e),
            }
        };

        // A logout or re-login while in flight makes this result stale.
        let still_current = self.read_state().access.as_ref() == Some(&credential);
        if still_current {
            self.replace_identity(identity.clone()).await;
        }
        Ok(identity)
    }

    /// Replace the cached profile, e.g. after a profile update.
    pub async fn replace_identity(&self, identity: Identity) {
        {
            let mut state = self.write_state();
            if state.access.is_none() {
                return;
            }
            state.identity = Some(identity);
        }
        if let Err(e) = self.persist_current().await {
            warn!(error = %e, "Failed to persist identity snapshot");
        }
    }

    fn spawn_identity_refresh(self: &Arc<Self>) {
        let session = Arc::clone(self);
        self.tasks.spawn("identity-refresh", async move {
            match session.refresh_identity().await {
                Ok(identity) => debug!(user = %identity.display_name(), "Identity refreshed"),
                Err(e) => warn!(error = %e, "Identity refresh failed"),
            }
        });
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Write the in-memory credentials through to the store.
    ///
    /// Does nothing once the session has been cleared, so a late write can
    /// never resurrect a signed-out session.
    async fn persist_current(&self) -> StorageResult<()> {
        let _guard = self.store_lock.lock().await;
        let snapshot = {
            let state = self.read_state();
            match (&state.access, &state.refresh) {
                (Some(access), Some(refresh)) => Some(StoredCredentials::new(
                    access.token(),
                    refresh.clone(),
                    state.identity.clone(),
                )),
                _ => None,
            }
        };
        match snapshot {
            Some(stored) => self.store.set(&stored).await,
            None => Ok(()),
        }
    }

    fn set_status(&self, next: SessionStatus) {
        let mut previous = next;
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                previous = std::mem::replace(current, next);
                true
            }
        });
        if changed {
            info!(from = %previous, to = %next, "Session status changed");
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().expect("session lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().expect("session lock poisoned")
    }
}

fn parse_access(token: &str) -> Result<AccessCredential> {
    AccessCredential::parse(token).map_err(|e| ApiError::Decode(format!("access credential: {e}")))
}

fn rejection_message(response: &ApiResponse, fallback: &str) -> String {
    serde_json::from_slice::<ProblemDetails>(&response.body)
        .ok()
        .and_then(|p| p.message())
        .unwrap_or_else(|| fallback.to_string())
}
