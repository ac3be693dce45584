//! Typed access to the catalog service.
//!
//! Layers, from the wire up:
//! - [`Transport`]: sends one request, reports any status.
//! - [`RequestGateway`]: attaches the access credential, refreshes and
//!   retries once on rejection.
//! - [`CatalogClient`]: one method per endpoint.

mod account;
mod error;
mod gateway;
mod transport;

use std::sync::Arc;

use tracing::debug;

pub use error::{ApiError, ErrorKind, Result};
pub use gateway::RequestGateway;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

use crate::api::{
    AnnotationKind, CatalogItem, Category, CollectionKind, Identity, ItemId, Page, RatingRequest,
};
use crate::session::SessionManager;

/// Endpoint-level client. Cheap to clone.
#[derive(Clone)]
pub struct CatalogClient {
    gateway: Arc<RequestGateway>,
}

impl CatalogClient {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.gateway.session()
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    /// `GET /catalog/{category}?page=N`
    pub async fn feed(&self, category: Category, page: u32) -> Result<Page<CatalogItem>> {
        let request = ApiRequest::get(format!("/catalog/{}", category.as_str())).with_query("page", page);
        self.gateway.execute_json(request).await
    }

    /// `GET /catalog/search?query=Q&page=N`
    pub async fn search(&self, query: &str, page: u32) -> Result<Page<CatalogItem>> {
        let request = ApiRequest::get("/catalog/search")
            .with_query("query", query)
            .with_query("page", page);
        self.gateway.execute_json(request).await
    }

    /// `GET /catalog/item/{id}`
    pub async fn item(&self, id: ItemId) -> Result<CatalogItem> {
        self.gateway
            .execute_json(ApiRequest::get(format!("/catalog/item/{id}")))
            .await
    }

    // ------------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------------

    /// `GET /annotations/{kind}?page=N`
    pub async fn collection(&self, kind: CollectionKind, page: u32) -> Result<Page<CatalogItem>> {
        let request = ApiRequest::get(format!("/annotations/{}", kind.as_str())).with_query("page", page);
        self.gateway.execute_json(request).await
    }

    /// `POST /annotations/{kind}/{id}` for the boolean kinds.
    pub async fn toggle(&self, kind: AnnotationKind, id: ItemId) -> Result<()> {
        if kind == AnnotationKind::Rating {
            return Err(ApiError::ValidationFailed(
                "ratings are set, not toggled".to_string(),
            ));
        }
        self.gateway
            .execute(ApiRequest::post(format!("/annotations/{}/{id}", kind.as_str())))
            .await?;
        debug!(item_id = %id, kind = %kind, "Annotation toggled");
        Ok(())
    }

    /// `POST /annotations/rating/{id}`. A value of `0` clears the rating.
    pub async fn rate(&self, id: ItemId, rating: f32) -> Result<()> {
        let request =
            ApiRequest::post(format!("/annotations/rating/{id}")).with_json(&RatingRequest { rating })?;
        self.gateway.execute(request).await?;
        debug!(item_id = %id, rating, "Rating stored");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// `GET /identity`, replacing the session's cached snapshot.
    pub async fn identity(&self) -> Result<Identity> {
        let identity: Identity = self.gateway.execute_json(ApiRequest::get("/identity")).await?;
        self.session().replace_identity(identity.clone()).await;
        Ok(identity)
    }
}
