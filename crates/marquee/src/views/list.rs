use tracing::{debug, info};

use crate::annotations::{AnnotationEngine, Mutation, PatchInstruction};
use crate::api::{CatalogItem, ItemId, Page};
use crate::client::{ApiError, CatalogClient, Result};

use super::{FetchOutcome, FetchTicket, ListSource, PatchOutcome, ViewQuery, ViewSnapshot};

/// Paginated list state shared by the feed, search and collection views.
#[derive(Debug, Clone)]
pub struct ListView {
    source: ListSource,
    page: u32,
    total_pages: u32,
    items: Vec<CatalogItem>,
    /// Bumped by every change that makes in-flight fetches stale.
    generation: u64,
    loading: bool,
    pending_refresh: bool,
    error: Option<String>,
    page_ceiling: u32,
}

impl ListView {
    pub fn new(source: ListSource, page_ceiling: u32) -> Self {
        Self {
            source,
            page: 1,
            total_pages: 0,
            items: Vec::new(),
            generation: 0,
            loading: false,
            pending_refresh: false,
            error: None,
            page_ceiling: page_ceiling.max(1),
        }
    }

    pub fn source(&self) -> &ListSource {
        &self.source
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page count exposed to pagination controls.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_pending_refresh(&self) -> bool {
        self.pending_refresh
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn query(&self) -> ViewQuery {
        ViewQuery {
            source: self.source.clone(),
            page: self.page,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            title: self.source.title(),
            items: self.items.clone(),
            page: self.page,
            total_pages: self.total_pages,
            loading: self.loading,
            pending_refresh: self.pending_refresh,
            error: self.error.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Switch to a new source: back to page 1 with an empty list, so stale
    /// items never render under the new pagination.
    pub fn reset(&mut self, source: ListSource) {
        debug!(from = ?self.source, to = ?source, "View source changed");
        self.source = source;
        self.page = 1;
        self.total_pages = 0;
        self.items.clear();
        self.pending_refresh = false;
        self.loading = false;
        self.error = None;
        self.generation += 1;
    }

    /// Move to `page`. Returns `false` when out of range or unchanged.
    ///
    /// Before the first fetch the page count is unknown and any page is
    /// accepted.
    pub fn set_page(&mut self, page: u32) -> bool {
        if page == 0 || page == self.page {
            return false;
        }
        if self.total_pages > 0 && page > self.total_pages {
            return false;
        }
        self.page = page;
        self.generation += 1;
        true
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Start a fetch for the current query. Any fetch still in flight is
    /// superseded. Returns `None` when there is nothing to fetch.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if matches!(&self.source, ListSource::Search(query) if query.is_empty()) {
            return None;
        }
        self.generation += 1;
        self.loading = true;
        Some(FetchTicket {
            generation: self.generation,
            query: self.query(),
        })
    }

    /// Hand a response back. Responses from superseded tickets are ignored.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<CatalogItem>>,
    ) -> FetchOutcome {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                page = ticket.query.page,
                "Discarding superseded fetch"
            );
            return FetchOutcome::Superseded;
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => return self.record_failure(e),
        };

        let total_pages = if self.source.is_capped() {
            page.total_pages.min(self.page_ceiling)
        } else {
            page.total_pages
        };

        if total_pages > 0 && self.page > total_pages {
            debug!(page = self.page, total_pages, "Page no longer exists, moving back");
            self.page = total_pages;
            self.total_pages = total_pages;
            self.pending_refresh = true;
            self.generation += 1;
            return FetchOutcome::PageShifted;
        }

        self.items = page.items;
        self.total_pages = total_pages;
        self.pending_refresh = false;
        self.error = None;
        FetchOutcome::Applied
    }

    /// Fetch the current page and apply it.
    pub async fn load(&mut self, client: &CatalogClient) -> FetchOutcome {
        let mut shifted = false;
        loop {
            let Some(ticket) = self.begin_fetch() else {
                return FetchOutcome::Skipped;
            };
            let result = ticket.execute(client).await;
            match self.complete_fetch(ticket, result) {
                FetchOutcome::PageShifted if !shifted => shifted = true,
                outcome => return outcome,
            }
        }
    }

    fn record_failure(&mut self, error: ApiError) -> FetchOutcome {
        if error.is_auth_failure() {
            // The session is gone; a fresh login refetches everything.
            self.items.clear();
            self.page = 1;
            self.total_pages = 0;
            self.pending_refresh = false;
        }
        if error.is_user_visible() {
            self.error = Some(error.user_message());
        }
        FetchOutcome::Failed
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Apply a confirmed annotation change.
    ///
    /// If the new annotation no longer satisfies the view's membership the
    /// item is left untouched and the view is marked pending refresh.
    pub fn apply_patch(&mut self, patch: &PatchInstruction) -> PatchOutcome {
        let admits = self.source.membership().admits(&patch.annotation);
        let Some(item) = self.items.iter_mut().find(|item| item.id == patch.item_id) else {
            return PatchOutcome::NotPresent;
        };

        if admits {
            item.annotation = patch.annotation;
            PatchOutcome::Patched
        } else {
            info!(item_id = %patch.item_id, kind = %patch.kind, "Item left the view, refetch needed");
            self.pending_refresh = true;
            PatchOutcome::Refetch
        }
    }

    /// Run `mutation` through the engine and apply the result without
    /// refetching. A `Refetch` outcome leaves the view pending refresh.
    ///
    /// On failure the held list is untouched and the error is recorded.
    pub async fn mutate(
        &mut self,
        engine: &AnnotationEngine,
        id: ItemId,
        mutation: Mutation,
    ) -> Result<PatchOutcome> {
        let Some(current) = self.item(id).map(|item| item.annotation) else {
            return Ok(PatchOutcome::NotPresent);
        };

        match engine.mutate(id, &current, mutation).await {
            Ok(patch) => Ok(self.apply_patch(&patch)),
            Err(e) => {
                if e.is_user_visible() {
                    self.error = Some(e.user_message());
                }
                Err(e)
            }
        }
    }

    /// [`mutate`](Self::mutate), then refetch if the item left the view.
    pub async fn apply_mutation(
        &mut self,
        engine: &AnnotationEngine,
        id: ItemId,
        mutation: Mutation,
    ) -> Result<PatchOutcome> {
        let outcome = self.mutate(engine, id, mutation).await?;
        if outcome == PatchOutcome::Refetch {
            self.load(engine.client()).await;
        }
        Ok(outcome)
    }
}
