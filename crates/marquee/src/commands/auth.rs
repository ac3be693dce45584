//! `marquee login|logout|register|whoami|profile|passwd|delete-account`

use anyhow::{Result, bail};

use marquee::api::{ProfileUpdate, RegisterRequest};

use super::{Context, explain, prompt, render, secret_or_prompt};

pub async fn login(config: &str, email: &str, password: Option<String>) -> Result<()> {
    let ctx = Context::open(config).await?;
    let password = secret_or_prompt(password, "Password")?;

    let identity = ctx
        .session
        .login(email, &password)
        .await
        .map_err(explain)?;

    println!("Signed in as {}", identity.display_name());
    ctx.finish().await;
    Ok(())
}

pub async fn logout(config: &str) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.session.logout().await;
    println!("Signed out.");
    Ok(())
}

pub async fn register(
    config: &str,
    email: String,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let ctx = Context::open(config).await?;
    let password = secret_or_prompt(password, "Password")?;

    let identity = ctx
        .session
        .register(&RegisterRequest {
            email,
            username,
            password,
            first_name,
            last_name,
        })
        .await
        .map_err(explain)?;

    println!("Welcome, {}!", identity.display_name());
    ctx.finish().await;
    Ok(())
}

pub async fn whoami(config: &str, refresh: bool) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let identity = if refresh {
        Some(ctx.client.identity().await?)
    } else {
        ctx.session.settle().await;
        ctx.session.identity()
    };

    match identity {
        Some(identity) => render::identity(&identity),
        None => println!("Signed in (profile not loaded yet)"),
    }
    Ok(())
}

pub async fn profile(
    config: &str,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
) -> Result<()> {
    let update = ProfileUpdate {
        username,
        first_name,
        last_name,
        bio,
    };
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one of --username, --first-name, --last-name, --bio.");
    }

    let ctx = Context::open(config).await?;
    ctx.require_session()?;
    let identity = ctx.client.update_profile(&update).await?;
    render::identity(&identity);
    Ok(())
}

pub async fn passwd(config: &str) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    let old = secret_or_prompt(None, "Current password")?;
    let new = secret_or_prompt(None, "New password")?;
    let confirm = secret_or_prompt(None, "Confirm new password")?;

    ctx.client
        .change_password(&old, &new, &confirm)
        .await
        .map_err(explain)?;
    println!("Password changed.");
    Ok(())
}

pub async fn delete_account(config: &str, yes: bool) -> Result<()> {
    let ctx = Context::open(config).await?;
    ctx.require_session()?;

    if !yes {
        let answer = prompt("Delete your account permanently? Type 'delete' to confirm")?;
        if answer != "delete" {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.delete_account().await?;
    println!("Account deleted.");
    Ok(())
}
