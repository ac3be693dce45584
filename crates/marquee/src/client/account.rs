//! Account management endpoints.

use tracing::info;

use crate::api::{ChangePasswordRequest, Identity, ProfileUpdate};

use super::CatalogClient;
use super::error::{ApiError, Result};
use super::transport::ApiRequest;

impl CatalogClient {
    /// `PUT /identity`. The returned profile replaces the cached snapshot.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        if update.is_empty() {
            return Err(ApiError::ValidationFailed("nothing to update".to_string()));
        }
        let request = ApiRequest::put("/identity").with_json(update)?;
        let identity: Identity = self.gateway.execute_json(request).await?;
        self.session().replace_identity(identity.clone()).await;
        info!("Profile updated");
        Ok(identity)
    }

    /// `POST /identity/password`.
    ///
    /// A confirmation mismatch is rejected locally, before any request.
    pub async fn change_password(&self, old: &str, new: &str, confirm: &str) -> Result<()> {
        if new != confirm {
            return Err(ApiError::ValidationFailed(
                "New passwords do not match.".to_string(),
            ));
        }
        if new.is_empty() {
            return Err(ApiError::ValidationFailed(
                "New password must not be empty.".to_string(),
            ));
        }
        let request = ApiRequest::post("/identity/password").with_json(&ChangePasswordRequest {
            old_password: old.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        })?;
        self.gateway.execute(request).await?;
        info!("Password changed");
        Ok(())
    }

    /// `DELETE /identity`, then sign out locally.
    pub async fn delete_account(&self) -> Result<()> {
        self.gateway.execute(ApiRequest::delete("/identity")).await?;
        info!("Account deleted");
        self.session().logout().await;
        Ok(())
    }
}
