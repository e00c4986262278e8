//! Demo data for local development, enabled with `SEED_DEMO_DATA=true`.

use anyhow::Context;

use quill_core::domain::{PostInput, PostStatus, Role, TagId, TagInput};
use quill_core::ports::Transaction;
use quill_core::services::accounts::{self, RegisterInput};
use quill_core::services::{post_sync, tags};

use crate::state::AppState;

const ADMIN_EMAIL: &str = "admin@example.com";
const AUTHOR_EMAIL: &str = "author1@example.com";
const DEMO_PASSWORD: &str = "password";
const DEMO_TAGS: [&str; 3] = ["Entertainment", "Sport", "Academic"];

/// Insert the demo accounts, tags and post unless they already exist.
pub async fn seed_demo_data(state: &AppState) -> anyhow::Result<()> {
    if state.store.users().find_by_email(ADMIN_EMAIL).await?.is_some() {
        tracing::info!("Demo data already present, skipping seed");
        return Ok(());
    }

    let tx = state.store.begin().await?;
    match seed(tx.as_ref(), state).await {
        Ok(()) => {
            tx.commit().await.context("committing demo data")?;
            tracing::info!("Demo data seeded");
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback of demo data failed");
            }
            Err(err)
        }
    }
}

async fn seed(tx: &dyn Transaction, state: &AppState) -> anyhow::Result<()> {
    let passwords = state.passwords.as_ref();

    accounts::create_account(
        tx,
        passwords,
        demo_account("Admin", "admin", ADMIN_EMAIL),
        Role::Admin,
    )
    .await
    .context("creating demo admin")?;

    let author = accounts::create_account(
        tx,
        passwords,
        demo_account("Author One", "author1", AUTHOR_EMAIL),
        Role::Author,
    )
    .await
    .context("creating demo author")?;

    let mut tag_ids: Vec<TagId> = Vec::with_capacity(DEMO_TAGS.len());
    for name in DEMO_TAGS {
        let tag = tags::create(tx, TagInput { name: name.into() })
            .await
            .with_context(|| format!("creating demo tag {name}"))?;
        tag_ids.push(tag.id);
    }

    let post = PostInput {
        title: "Welcome to Quill".to_string(),
        content: "This demo post was created by the seeder on first start.".to_string(),
        status: PostStatus::Published,
        tag_ids: tag_ids.into_iter().take(2).collect(),
    };
    post_sync::create(tx, author.user.id, post)
        .await
        .context("creating demo post")?;

    Ok(())
}

fn demo_account(name: &str, username: &str, email: &str) -> RegisterInput {
    RegisterInput {
        name: name.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password: DEMO_PASSWORD.to_string(),
    }
}
