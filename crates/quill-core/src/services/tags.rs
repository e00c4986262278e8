//! Tag writes. Like the post workflows, these run inside a caller-owned transaction.

use chrono::Utc;

use crate::domain::{NewTag, Tag, TagId, TagInput};
use crate::error::{DomainError, RepoError};
use crate::ports::Transaction;
use crate::slug::slugify;
use crate::validation::{self, ValidationErrors};

pub async fn create(tx: &dyn Transaction, input: TagInput) -> Result<Tag, DomainError> {
    input.validate()?;
    let tags = tx.tags();
    let name = input.name.trim().to_string();

    if tags.name_taken(&name, None).await? {
        return Err(name_taken());
    }

    let tag = NewTag {
        slug: slugify(&name),
        name,
    };
    tags.create(tag).await.map_err(write_error)
}

pub async fn update(tx: &dyn Transaction, id: TagId, input: TagInput) -> Result<Tag, DomainError> {
    input.validate()?;
    let tags = tx.tags();
    let name = input.name.trim().to_string();

    let mut tag = tags
        .find(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Tag", id))?;

    if tags.name_taken(&name, Some(id)).await? {
        return Err(name_taken());
    }

    tag.slug = slugify(&name);
    tag.name = name;
    tag.updated_at = Utc::now();
    tags.update(tag).await.map_err(write_error)
}

/// Delete a tag (and, through the store, its post associations).
pub async fn delete(tx: &dyn Transaction, id: TagId) -> Result<Tag, DomainError> {
    let tags = tx.tags();

    let tag = tags
        .find(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Tag", id))?;
    tags.delete(id).await?;

    Ok(tag)
}

fn name_taken() -> DomainError {
    ValidationErrors::single("name", validation::taken("name")).into()
}

fn write_error(err: RepoError) -> DomainError {
    match err {
        RepoError::Duplicate(_) => name_taken(),
        other => other.into(),
    }
}
