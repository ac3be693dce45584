//! `marquee browse|search|collection|show`

use anyhow::{Result, anyhow};

use marquee::api::{Category, CollectionKind, ItemId};
use marquee::views::{
    CollectionView, DetailView, FeedView, FetchOutcome, ListController, SearchView,
};

use super::{Context, render};

pub async fn feed(config: &str, category: Category, page: u32) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let mut view = FeedView::new(category, ctx.config.views.page_ceiling);
    view.set_page(page);
    show_list(&ctx, &mut view).await?;
    ctx.finish().await;
    Ok(())
}

pub async fn search(config: &str, query: &str, page: u32) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let mut view = SearchView::new(ctx.config.views.page_ceiling);
    if !view.set_query(query) {
        println!("Nothing to search for.");
        return Ok(());
    }
    view.set_page(page);
    show_list(&ctx, &mut view).await?;
    ctx.finish().await;
    Ok(())
}

pub async fn collection(config: &str, kind: CollectionKind, page: u32) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let mut view = CollectionView::new(kind);
    view.set_page(page);
    show_list(&ctx, &mut view).await?;
    ctx.finish().await;
    Ok(())
}

pub async fn show(config: &str, id: ItemId) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let mut view = DetailView::new();
    let outcome = view.load(&ctx.client, id).await;
    match (outcome, view.item()) {
        (FetchOutcome::Applied, Some(item)) => render::detail(item),
        _ => return Err(fetch_error(view.snapshot().error)),
    }
    ctx.finish().await;
    Ok(())
}

async fn show_list(ctx: &Context, view: &mut impl ListController) -> Result<()> {
    match view.load(&ctx.client).await {
        FetchOutcome::Failed => Err(fetch_error(view.snapshot().error)),
        _ => {
            render::list(&view.snapshot());
            Ok(())
        }
    }
}

fn fetch_error(message: Option<String>) -> anyhow::Error {
    match message {
        Some(message) => anyhow!(message),
        None => anyhow!("Your session has ended. Please sign in again."),
    }
}
