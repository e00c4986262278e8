//! Persistence ports.
//!
//! A [`Store`] hands out [`Transaction`]s. Both expose the same repositories,
//! so reads can run directly against the store while every write runs inside
//! a transaction that is committed or rolled back exactly once.

use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Author, NewTag, Post, PostDetails, Tag, TagId, User};
use crate::error::RepoError;

/// Post repository, including the post-tag association table.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a new post row.
    async fn create(&self, post: Post) -> Result<Post, RepoError>;

    /// Load a post with its owner and tags.
    async fn find(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError>;

    /// All posts with owners and tags, newest first.
    async fn list(&self) -> Result<Vec<PostDetails>, RepoError>;

    /// Overwrite an existing post row.
    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    /// Delete a post row; its associations go with it.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Whether another post already uses `title`, ignoring `except`.
    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> Result<bool, RepoError>;

    /// Tag ids currently associated with a post.
    async fn tag_ids(&self, post_id: Uuid) -> Result<BTreeSet<TagId>, RepoError>;

    /// Remove the `detach` associations, then add the `attach` associations.
    async fn sync_associations(
        &self,
        post_id: Uuid,
        attach: &[TagId],
        detach: &[TagId],
    ) -> Result<(), RepoError>;
}

/// Tag repository.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// All tags, newest first.
    async fn list(&self) -> Result<Vec<Tag>, RepoError>;

    async fn find(&self, id: TagId) -> Result<Option<Tag>, RepoError>;

    async fn create(&self, tag: NewTag) -> Result<Tag, RepoError>;

    async fn update(&self, tag: Tag) -> Result<Tag, RepoError>;

    async fn delete(&self, id: TagId) -> Result<(), RepoError>;

    /// Whether another tag already uses `name`, ignoring `except`.
    async fn name_taken(&self, name: &str, except: Option<TagId>) -> Result<bool, RepoError>;
}

/// User repository.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Load the author view (user + profile name) of a user.
    async fn find_author(&self, id: Uuid) -> Result<Option<Author>, RepoError>;

    /// Insert a user and its profile.
    async fn create(&self, user: User, name: String) -> Result<Account, RepoError>;
}

/// Access to the repositories of a store or of an open transaction.
pub trait Repositories: Send + Sync {
    fn posts(&self) -> &dyn PostStore;
    fn tags(&self) -> &dyn TagStore;
    fn users(&self) -> &dyn UserStore;
}

/// An open unit of work.
///
/// Writes made through its repositories become visible to others only after
/// [`Transaction::commit`]. Dropping a transaction without committing it
/// discards its writes.
#[async_trait]
pub trait Transaction: Repositories {
    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}

/// Entry point to persistence.
#[async_trait]
pub trait Store: Repositories {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, RepoError>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}
