//! View state controllers.
//!
//! Each controller holds the list on display and applies the engine's
//! patch instructions according to its membership predicate. Fetches are
//! split into [`FetchTicket`]s so a response can be checked against the
//! controller's current generation when it arrives; a superseded response
//! is dropped.

mod collection;
mod detail;
mod feed;
mod list;
mod search;

use async_trait::async_trait;

use crate::annotations::{AnnotationEngine, Mutation};
use crate::api::{Annotation, AnnotationKind, CatalogItem, Category, CollectionKind, ItemId, Page};
use crate::client::{CatalogClient, Result};

pub use collection::CollectionView;
pub use detail::{DetailTicket, DetailView};
pub use feed::FeedView;
pub use list::ListView;
pub use search::SearchView;

/// Feed and search page counts are capped at this by default.
pub const DEFAULT_PAGE_CEILING: u32 = 100;

// ============================================================================
// Queries
// ============================================================================

/// Where a list view's items come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    Feed(Category),
    Search(String),
    Collection(CollectionKind),
}

impl ListSource {
    pub fn membership(&self) -> MembershipPredicate {
        match self {
            ListSource::Feed(_) | ListSource::Search(_) => MembershipPredicate::ServerDetermined,
            ListSource::Collection(kind) => MembershipPredicate::Flag(kind.annotation_kind()),
        }
    }

    /// Upstream totals for feeds and searches are unbounded; collections are
    /// the user's own and reported exactly.
    pub fn is_capped(&self) -> bool {
        !matches!(self, ListSource::Collection(_))
    }

    pub fn title(&self) -> String {
        match self {
            ListSource::Feed(category) => category.title().to_string(),
            ListSource::Search(query) if query.is_empty() => "Search".to_string(),
            ListSource::Search(query) => format!("Results for \"{query}\""),
            ListSource::Collection(kind) => kind.title().to_string(),
        }
    }
}

/// Rule deciding which items a view displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipPredicate {
    /// The service decides; annotations never affect inclusion.
    ServerDetermined,
    /// Only items with this annotation set belong.
    Flag(AnnotationKind),
}

impl MembershipPredicate {
    pub fn admits(&self, annotation: &Annotation) -> bool {
        match self {
            MembershipPredicate::ServerDetermined => true,
            MembershipPredicate::Flag(kind) => annotation.has(*kind),
        }
    }
}

/// What a view is showing, and which page of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub source: ListSource,
    pub page: u32,
}

impl ViewQuery {
    pub fn membership(&self) -> MembershipPredicate {
        self.source.membership()
    }
}

// ============================================================================
// Fetch Tickets
// ============================================================================

/// One page fetch, stamped with the generation that issued it.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    query: ViewQuery,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub async fn execute(&self, client: &CatalogClient) -> Result<Page<CatalogItem>> {
        let page = self.query.page;
        match &self.query.source {
            ListSource::Feed(category) => client.feed(*category, page).await,
            ListSource::Search(query) => client.search(query, page).await,
            ListSource::Collection(kind) => client.collection(*kind, page).await,
        }
    }
}

/// Result of handing a response back to its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was started; the response was dropped.
    Superseded,
    /// The fetch failed; the error is on the snapshot.
    Failed,
    /// The page no longer exists (the list shrank); the view moved to the
    /// last page and needs another fetch.
    PageShifted,
    /// Nothing to fetch, e.g. an empty search.
    Skipped,
}

/// How a patch instruction landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    /// The item left the view's membership; the view is pending refresh.
    Refetch,
    /// The item is not in the held list.
    NotPresent,
}

// ============================================================================
// Snapshots
// ============================================================================

/// Immutable copy of what a view would render.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub title: String,
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub total_pages: u32,
    pub loading: bool,
    /// The held list is known to be stale and a refetch is due.
    pub pending_refresh: bool,
    /// Dismissible, user-facing error.
    pub error: Option<String>,
}

impl ViewSnapshot {
    pub fn item(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

// ============================================================================
// ListController
// ============================================================================

/// Shared behaviour of the paginated list views.
#[async_trait]
pub trait ListController: Send {
    fn list(&self) -> &ListView;

    fn list_mut(&mut self) -> &mut ListView;

    fn snapshot(&self) -> ViewSnapshot {
        self.list().snapshot()
    }

    fn query(&self) -> ViewQuery {
        self.list().query()
    }

    fn set_page(&mut self, page: u32) -> bool {
        self.list_mut().set_page(page)
    }

    fn begin_fetch(&mut self) -> Option<FetchTicket> {
        self.list_mut().begin_fetch()
    }

    fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<CatalogItem>>,
    ) -> FetchOutcome {
        self.list_mut().complete_fetch(ticket, result)
    }

    fn dismiss_error(&mut self) {
        self.list_mut().dismiss_error();
    }

    async fn load(&mut self, client: &CatalogClient) -> FetchOutcome {
        self.list_mut().load(client).await
    }

    async fn apply_mutation(
        &mut self,
        engine: &AnnotationEngine,
        id: ItemId,
        mutation: Mutation,
    ) -> Result<PatchOutcome> {
        self.list_mut().apply_mutation(engine, id, mutation).await
    }
}
