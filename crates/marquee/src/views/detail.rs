use tracing::debug;

use crate::annotations::{AnnotationEngine, Mutation};
use crate::api::{CatalogItem, ItemId};
use crate::client::{CatalogClient, Result};

use super::{FetchOutcome, PatchOutcome, ViewSnapshot};

/// Fetch of one item, stamped with the generation that issued it.
#[derive(Debug, Clone, Copy)]
pub struct DetailTicket {
    generation: u64,
    id: ItemId,
}

impl DetailTicket {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub async fn execute(&self, client: &CatalogClient) -> Result<CatalogItem> {
        client.item(self.id).await
    }
}

/// Single-item detail page. Mutations always patch in place.
#[derive(Debug, Clone, Default)]
pub struct DetailView {
    item: Option<CatalogItem>,
    generation: u64,
    loading: bool,
    error: Option<String>,
}

impl DetailView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self) -> Option<&CatalogItem> {
        self.item.as_ref()
    }

    /// Start showing `id`, superseding any fetch in flight.
    pub fn open(&mut self, id: ItemId) -> DetailTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        if self.item.as_ref().is_some_and(|item| item.id != id) {
            self.item = None;
        }
        DetailTicket {
            generation: self.generation,
            id,
        }
    }

    pub fn complete(&mut self, ticket: DetailTicket, result: Result<CatalogItem>) -> FetchOutcome {
        if ticket.generation != self.generation {
            debug!(item_id = %ticket.id, "Discarding superseded detail fetch");
            return FetchOutcome::Superseded;
        }
        self.loading = false;
        match result {
            Ok(item) => {
                self.item = Some(item);
                FetchOutcome::Applied
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.item = None;
                }
                if e.is_user_visible() {
                    self.error = Some(e.user_message());
                }
                FetchOutcome::Failed
            }
        }
    }

    pub async fn load(&mut self, client: &CatalogClient, id: ItemId) -> FetchOutcome {
        let ticket = self.open(id);
        let result = ticket.execute(client).await;
        self.complete(ticket, result)
    }

    pub async fn apply_mutation(
        &mut self,
        engine: &AnnotationEngine,
        mutation: Mutation,
    ) -> Result<PatchOutcome> {
        let Some((id, current)) = self.item.as_ref().map(|item| (item.id, item.annotation)) else {
            return Ok(PatchOutcome::NotPresent);
        };

        match engine.mutate(id, &current, mutation).await {
            Ok(patch) => {
                if let Some(item) = self.item.as_mut().filter(|item| item.id == patch.item_id) {
                    item.annotation = patch.annotation;
                    Ok(PatchOutcome::Patched)
                } else {
                    Ok(PatchOutcome::NotPresent)
                }
            }
            Err(e) => {
                if e.is_user_visible() {
                    self.error = Some(e.user_message());
                }
                Err(e)
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            title: self
                .item
                .as_ref()
                .map(|item| item.title.clone())
                .unwrap_or_default(),
            items: self.item.iter().cloned().collect(),
            page: 1,
            total_pages: u32::from(self.item.is_some()),
            loading: self.loading,
            pending_refresh: false,
            error: self.error.clone(),
        }
    }
}
