//! Plain-text rendering for command output.

use marquee::api::{Annotation, CatalogItem, Identity};
use marquee::views::ViewSnapshot;

pub fn annotation_badges(annotation: &Annotation) -> String {
    let mut badges = Vec::new();
    if annotation.favorite {
        badges.push("♥ favorite".to_string());
    }
    if annotation.watchlist {
        badges.push("+ watchlist".to_string());
    }
    if annotation.watched {
        badges.push("✓ watched".to_string());
    }
    if let Some(rating) = annotation.rating {
        badges.push(format!("★ {rating:.1}"));
    }
    badges.join("  ")
}

fn year(item: &CatalogItem) -> String {
    item.release_date
        .as_deref()
        .and_then(|date| date.get(..4))
        .map(|y| format!(" ({y})"))
        .unwrap_or_default()
}

pub fn list(snapshot: &ViewSnapshot) {
    println!("{}", snapshot.title);
    println!("{}", "=".repeat(50));
    if snapshot.items.is_empty() {
        println!("(nothing here)");
    }
    for item in &snapshot.items {
        let badges = annotation_badges(&item.annotation);
        println!("{:>8}  {}{}  {}", item.id, item.title, year(item), badges);
    }
    if snapshot.total_pages > 1 {
        println!();
        println!("Page {} of {}", snapshot.page, snapshot.total_pages);
    }
    if let Some(error) = &snapshot.error {
        println!();
        println!("! {error}");
    }
}

pub fn detail(item: &CatalogItem) {
    println!("{}{}", item.title, year(item));
    println!("{}", "=".repeat(50));
    if let Some(vote) = item.vote_average {
        println!("Score: {vote:.1}");
    }
    if let Some(overview) = &item.overview {
        println!();
        println!("{overview}");
    }
    for (key, value) in &item.extra {
        if let Some(text) = value.as_str() {
            println!("{key}: {text}");
        } else if value.is_number() {
            println!("{key}: {value}");
        }
    }
    let badges = annotation_badges(&item.annotation);
    if !badges.is_empty() {
        println!();
        println!("{badges}");
    }
}

pub fn identity(identity: &Identity) {
    println!("{}", identity.display_name());
    if let Some(username) = &identity.username {
        println!("  username: {username}");
    }
    if let Some(email) = &identity.email {
        println!("  email:    {email}");
    }
    if let Some(bio) = &identity.bio {
        println!("  bio:      {bio}");
    }
    if let Some(joined) = identity.date_joined {
        println!("  joined:   {}", joined.format("%Y-%m-%d"));
    }
}
