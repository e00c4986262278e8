//! Post writes that keep the post-tag association table in step with the post row.
//!
//! Every function runs against a caller-owned [`Transaction`]. None of them
//! commits; the caller commits on `Ok` and rolls back on `Err`, so a failure at
//! any step leaves neither the post row nor its associations changed.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::domain::{Post, PostDetails, PostInput, TagId};
use crate::error::{DomainError, RepoError};
use crate::ports::Transaction;
use crate::validation::{self, ValidationErrors};

/// Insert a post and one association per distinct requested tag.
pub async fn create(
    tx: &dyn Transaction,
    owner_id: Uuid,
    input: PostInput,
) -> Result<PostDetails, DomainError> {
    let input = input.trimmed();
    input.validate()?;
    let posts = tx.posts();

    if posts.title_taken(&input.title, None).await? {
        return Err(title_taken());
    }

    let attach: Vec<TagId> = input.tag_set().into_iter().collect();
    let post = Post::new(owner_id, input.title, input.content, input.status);
    let post = posts.create(post).await.map_err(post_write_error)?;

    posts
        .sync_associations(post.id, &attach, &[])
        .await
        .map_err(association_error)?;

    read_back(tx, post.id).await
}

/// Rewrite a post and diff its associations to the requested tag set.
pub async fn update(
    tx: &dyn Transaction,
    post_id: Uuid,
    input: PostInput,
) -> Result<PostDetails, DomainError> {
    let input = input.trimmed();
    input.validate()?;
    let posts = tx.posts();

    let mut post = posts
        .find(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?
        .post;

    if posts.title_taken(&input.title, Some(post_id)).await? {
        return Err(title_taken());
    }

    let desired = input.tag_set();
    post.revise(input.title, input.content, input.status);
    posts.update(post).await.map_err(post_write_error)?;

    let current = posts.tag_ids(post_id).await?;
    let (attach, detach) = diff_tags(&current, &desired);
    if !attach.is_empty() || !detach.is_empty() {
        posts
            .sync_associations(post_id, &attach, &detach)
            .await
            .map_err(association_error)?;
    }

    read_back(tx, post_id).await
}

/// Delete a post and return how it looked right before deletion.
///
/// The post's image file, if any, must be removed by the caller after commit.
pub async fn delete(tx: &dyn Transaction, post_id: Uuid) -> Result<PostDetails, DomainError> {
    let posts = tx.posts();

    let snapshot = posts
        .find(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?;

    posts.delete(post_id).await?;

    Ok(snapshot)
}

/// Point a post at a newly stored image.
///
/// Returns the previous image path, which the caller deletes after commit.
pub async fn attach_image(
    tx: &dyn Transaction,
    post_id: Uuid,
    image_path: String,
) -> Result<(Option<String>, PostDetails), DomainError> {
    let posts = tx.posts();

    let mut post = posts
        .find(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?
        .post;

    let previous = post.image_path.replace(image_path);
    post.updated_at = chrono::Utc::now();
    posts.update(post).await?;

    Ok((previous, read_back(tx, post_id).await?))
}

/// Split the change from `current` to `desired` into (attach, detach).
/// Ids present in both sets appear in neither list.
pub fn diff_tags(
    current: &BTreeSet<TagId>,
    desired: &BTreeSet<TagId>,
) -> (Vec<TagId>, Vec<TagId>) {
    let attach = desired.difference(current).copied().collect();
    let detach = current.difference(desired).copied().collect();
    (attach, detach)
}

async fn read_back(tx: &dyn Transaction, post_id: Uuid) -> Result<PostDetails, DomainError> {
    tx.posts()
        .find(post_id)
        .await?
        .ok_or_else(|| DomainError::Internal(format!("post {post_id} missing after write")))
}

fn title_taken() -> DomainError {
    ValidationErrors::single("title", validation::taken("title")).into()
}

// A unique violation here means a concurrent writer took the title after our check.
fn post_write_error(err: RepoError) -> DomainError {
    match err {
        RepoError::Duplicate(_) => title_taken(),
        other => other.into(),
    }
}

fn association_error(err: RepoError) -> DomainError {
    match err {
        RepoError::MissingReference(_) => {
            ValidationErrors::single("tag_ids", validation::invalid_selection("tag_ids")).into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[TagId]) -> BTreeSet<TagId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_diff_replaces_changed_ids_only() {
        let (attach, detach) = diff_tags(&set(&[1, 2]), &set(&[2, 3]));
        assert_eq!(attach, vec![3]);
        assert_eq!(detach, vec![1]);
    }

    #[test]
    fn test_diff_of_equal_sets_is_empty() {
        let (attach, detach) = diff_tags(&set(&[4, 5]), &set(&[5, 4]));
        assert!(attach.is_empty());
        assert!(detach.is_empty());
    }

    #[test]
    fn test_diff_from_empty_attaches_everything() {
        let (attach, detach) = diff_tags(&set(&[]), &set(&[7, 1]));
        assert_eq!(attach, vec![1, 7]);
        assert!(detach.is_empty());
    }

    #[test]
    fn test_association_errors_become_tag_validation() {
        let err = association_error(RepoError::MissingReference("fk_post_tags_tag".into()));
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.messages("tag_ids"), ["The selected tag_ids is invalid."]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = association_error(RepoError::Query("boom".into()));
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
