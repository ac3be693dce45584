//! `marquee favorite|watchlist|watched|rate`

use anyhow::{Result, anyhow, bail};

use marquee::api::{AnnotationKind, ItemId};
use marquee::annotations::Mutation;
use marquee::views::{DetailView, FetchOutcome};

use super::{Context, render};

pub async fn favorite(config: &str, id: ItemId) -> Result<()> {
    annotate(config, id, Mutation::Toggle(AnnotationKind::Favorite)).await
}

pub async fn watchlist(config: &str, id: ItemId) -> Result<()> {
    annotate(config, id, Mutation::Toggle(AnnotationKind::Watchlist)).await
}

pub async fn watched(config: &str, id: ItemId) -> Result<()> {
    annotate(config, id, Mutation::Toggle(AnnotationKind::Watched)).await
}

pub async fn rate(config: &str, id: ItemId, rating: &str) -> Result<()> {
    annotate(config, id, Mutation::Rate(parse_rating(rating)?)).await
}

/// `clear` (or `0`) removes the rating; anything else must be a number.
fn parse_rating(input: &str) -> Result<Option<f32>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("clear") {
        return Ok(None);
    }
    match input.parse::<f32>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => bail!("Rating must be a number or 'clear', got '{input}'."),
    }
}

async fn annotate(config: &str, id: ItemId, mutation: Mutation) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    // The engine derives the new state from the server's current annotation.
    let mut view = DetailView::new();
    if view.load(&ctx.client, id).await != FetchOutcome::Applied {
        let message = view.snapshot().error;
        return Err(anyhow!(message.unwrap_or_else(|| format!("Item {id} is unavailable."))));
    }

    view.apply_mutation(&ctx.engine, mutation)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if let Some(item) = view.item() {
        let badges = render::annotation_badges(&item.annotation);
        if badges.is_empty() {
            println!("{}: no annotations", item.title);
        } else {
            println!("{}: {badges}", item.title);
        }
    }
    ctx.finish().await;
    Ok(())
}
