use tracing::{info, warn};

use crate::api::{Annotation, AnnotationKind, ItemId};
use crate::client::{CatalogClient, Result};
use crate::sync::ItemLocks;

use super::Rating;

/// A requested annotation change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    Toggle(AnnotationKind),
    /// `None` or `Some(0.0)` clears the rating.
    Rate(Option<f32>),
}

impl Mutation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Mutation::Toggle(kind) => *kind,
            Mutation::Rate(_) => AnnotationKind::Rating,
        }
    }
}

/// Confirmed annotation change for one item.
///
/// Only produced after the service acknowledged the mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchInstruction {
    pub item_id: ItemId,
    pub kind: AnnotationKind,
    pub annotation: Annotation,
}

/// Mediates every annotation mutation.
///
/// Updates are confirmation-gated: nothing local changes until the service
/// acknowledges, and a failure yields no patch at all.
#[derive(Clone)]
pub struct AnnotationEngine {
    client: CatalogClient,
    locks: ItemLocks,
}

impl AnnotationEngine {
    pub fn new(client: CatalogClient) -> Self {
        Self {
            client,
            locks: ItemLocks::new(),
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    pub async fn toggle_favorite(&self, id: ItemId, current: &Annotation) -> Result<PatchInstruction> {
        self.toggle(id, current, AnnotationKind::Favorite).await
    }

    pub async fn toggle_watchlist(&self, id: ItemId, current: &Annotation) -> Result<PatchInstruction> {
        self.toggle(id, current, AnnotationKind::Watchlist).await
    }

    pub async fn toggle_watched(&self, id: ItemId, current: &Annotation) -> Result<PatchInstruction> {
        self.toggle(id, current, AnnotationKind::Watched).await
    }

    /// Set (`0 < value <= 10`, half steps) or clear (`None` / `0`) the rating.
    ///
    /// Invalid values fail with `ValidationFailed` before any request.
    pub async fn set_rating(
        &self,
        id: ItemId,
        current: &Annotation,
        value: Option<f32>,
    ) -> Result<PatchInstruction> {
        let rating = Rating::from_input(value)?;

        let mut guard = self.locks.acquire(id).await;
        let annotation = guard.unwrap_or(*current).rated(rating);
        let wire_value = rating.map_or(0.0, Rating::value);
        let sent = self.client.rate(id, wire_value).await;
        if sent.is_ok() {
            *guard = Some(annotation);
        }
        self.locks.release(guard);

        if let Err(e) = sent {
            warn!(item_id = %id, error = %e, "Rating update failed");
            return Err(e);
        }
        info!(item_id = %id, rating = ?annotation.rating, "Rating updated");
        Ok(PatchInstruction {
            item_id: id,
            kind: AnnotationKind::Rating,
            annotation,
        })
    }

    /// Dispatch any [`Mutation`].
    pub async fn mutate(
        &self,
        id: ItemId,
        current: &Annotation,
        mutation: Mutation,
    ) -> Result<PatchInstruction> {
        match mutation {
            Mutation::Toggle(kind) => self.toggle(id, current, kind).await,
            Mutation::Rate(value) => self.set_rating(id, current, value).await,
        }
    }

    async fn toggle(
        &self,
        id: ItemId,
        current: &Annotation,
        kind: AnnotationKind,
    ) -> Result<PatchInstruction> {
        // A mutation that finished while this one waited supersedes `current`.
        let mut guard = self.locks.acquire(id).await;
        let annotation = guard.unwrap_or(*current).toggled(kind);
        let sent = self.client.toggle(kind, id).await;
        if sent.is_ok() {
            *guard = Some(annotation);
        }
        self.locks.release(guard);

        if let Err(e) = sent {
            warn!(item_id = %id, kind = %kind, error = %e, "Annotation update failed");
            return Err(e);
        }
        info!(item_id = %id, kind = %kind, set = annotation.has(kind), "Annotation updated");
        Ok(PatchInstruction {
            item_id: id,
            kind,
            annotation,
        })
    }
}
