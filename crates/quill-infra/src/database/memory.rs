//! In-memory store - used as fallback when PostgreSQL is unavailable.
//!
//! Enforces the same constraints as the relational schema (unique post titles,
//! tag names and emails, foreign keys and the composite key of the association
//! table, cascading deletes) so behaviour matches the database backend.
//! Note: Data is lost on process restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use quill_core::domain::{Account, Author, NewTag, Post, PostDetails, Tag, TagId, User};
use quill_core::error::RepoError;
use quill_core::ports::{PostStore, Repositories, Store, TagStore, Transaction, UserStore};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, Account>,
    posts: HashMap<Uuid, Post>,
    tags: BTreeMap<TagId, Tag>,
    post_tags: BTreeSet<(Uuid, TagId)>,
    last_tag_id: TagId,
}

impl Tables {
    fn details(&self, post: &Post) -> Result<PostDetails, RepoError> {
        let author = self
            .users
            .get(&post.user_id)
            .map(Account::author)
            .ok_or_else(|| RepoError::Query(format!("owner of post {} is missing", post.id)))?;

        let tags = self
            .post_tags
            .range((post.id, TagId::MIN)..=(post.id, TagId::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();

        Ok(PostDetails {
            post: post.clone(),
            author,
            tags,
        })
    }

    fn detach_all(&mut self, predicate: impl Fn(&(Uuid, TagId)) -> bool) {
        self.post_tags.retain(|link| !predicate(link));
    }
}

/// Failure injection for exercising rollback paths.
#[derive(Debug)]
struct Faults {
    association_inserts_left: AtomicUsize,
    refuse_begin: AtomicBool,
    fail_post_updates: AtomicBool,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            association_inserts_left: AtomicUsize::new(usize::MAX),
            refuse_begin: AtomicBool::new(false),
            fail_post_updates: AtomicBool::new(false),
        }
    }
}

impl Faults {
    fn check_begin(&self) -> Result<(), RepoError> {
        if self.refuse_begin.load(Ordering::SeqCst) {
            return Err(RepoError::Connection("injected failure opening a transaction".into()));
        }
        Ok(())
    }

    fn check_post_update(&self) -> Result<(), RepoError> {
        if self.fail_post_updates.load(Ordering::SeqCst) {
            return Err(RepoError::Query("injected failure updating posts".into()));
        }
        Ok(())
    }

    fn take_association_insert(&self) -> Result<(), RepoError> {
        let taken = self.association_inserts_left.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |left| match left {
                usize::MAX => Some(usize::MAX),
                0 => None,
                n => Some(n - 1),
            },
        );

        taken
            .map(|_| ())
            .map_err(|_| RepoError::Query("injected failure inserting into post_tags".into()))
    }
}

/// Repositories over one table set: the committed tables for the store,
/// a private working copy for a transaction.
struct MemoryRepos {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

/// In-memory store using async RwLock-guarded tables.
///
/// Transactions are serialized: `begin` waits for the previous transaction to
/// finish, then works on a copy of the committed tables that replaces them on
/// commit.
pub struct InMemoryStore {
    repos: MemoryRepos,
    writer: Arc<Mutex<()>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            repos: MemoryRepos {
                tables: Arc::new(RwLock::new(Tables::default())),
                faults: Arc::new(Faults::default()),
            },
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Let the next `n` association rows insert, then fail every insert after them.
    pub fn fail_association_inserts_after(&self, n: usize) {
        self.repos
            .faults
            .association_inserts_left
            .store(n, Ordering::SeqCst);
    }

    /// Make every `begin` fail as if the database were unreachable.
    pub fn refuse_transactions(&self) {
        self.repos.faults.refuse_begin.store(true, Ordering::SeqCst);
    }

    /// Make every post row update fail.
    pub fn fail_post_updates(&self) {
        self.repos
            .faults
            .fail_post_updates
            .store(true, Ordering::SeqCst);
    }

    /// Stop injecting failures.
    pub fn clear_faults(&self) {
        self.fail_association_inserts_after(usize::MAX);
        self.repos.faults.refuse_begin.store(false, Ordering::SeqCst);
        self.repos
            .faults
            .fail_post_updates
            .store(false, Ordering::SeqCst);
    }

    /// Committed association rows, ordered by (post id, tag id).
    pub async fn association_rows(&self) -> Vec<(Uuid, TagId)> {
        self.repos
            .tables
            .read()
            .await
            .post_tags
            .iter()
            .copied()
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Repositories for InMemoryStore {
    fn posts(&self) -> &dyn PostStore {
        &self.repos
    }

    fn tags(&self) -> &dyn TagStore {
        &self.repos
    }

    fn users(&self) -> &dyn UserStore {
        &self.repos
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, RepoError> {
        self.repos.faults.check_begin()?;
        let guard = self.writer.clone().lock_owned().await;
        let snapshot = self.repos.tables.read().await.clone();

        Ok(Box::new(InMemoryTransaction {
            repos: MemoryRepos {
                tables: Arc::new(RwLock::new(snapshot)),
                faults: self.repos.faults.clone(),
            },
            committed: self.repos.tables.clone(),
            _guard: guard,
        }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// An open in-memory transaction. Dropping it discards the working copy.
pub struct InMemoryTransaction {
    repos: MemoryRepos,
    committed: Arc<RwLock<Tables>>,
    _guard: OwnedMutexGuard<()>,
}

impl Repositories for InMemoryTransaction {
    fn posts(&self) -> &dyn PostStore {
        &self.repos
    }

    fn tags(&self) -> &dyn TagStore {
        &self.repos
    }

    fn users(&self) -> &dyn UserStore {
        &self.repos
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let working = self.repos.tables.read().await.clone();
        *self.committed.write().await = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryRepos {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&post.user_id) {
            return Err(RepoError::MissingReference("posts_user_id_fkey".into()));
        }
        if tables.posts.contains_key(&post.id) {
            return Err(RepoError::Duplicate("posts_pkey".into()));
        }
        if tables.posts.values().any(|p| p.title == post.title) {
            return Err(RepoError::Duplicate("posts_title_key".into()));
        }

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError> {
        let tables = self.tables.read().await;
        tables.posts.get(&id).map(|p| tables.details(p)).transpose()
    }

    async fn list(&self) -> Result<Vec<PostDetails>, RepoError> {
        let tables = self.tables.read().await;

        let mut posts: Vec<&Post> = tables.posts.values().collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        posts.into_iter().map(|p| tables.details(p)).collect()
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        self.faults.check_post_update()?;
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }
        if tables
            .posts
            .values()
            .any(|p| p.id != post.id && p.title == post.title)
        {
            return Err(RepoError::Duplicate("posts_title_key".into()));
        }

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;

        tables.posts.remove(&id).ok_or(RepoError::NotFound)?;
        tables.detach_all(|(post_id, _)| *post_id == id);
        Ok(())
    }

    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .any(|p| p.title == title && Some(p.id) != except))
    }

    async fn tag_ids(&self, post_id: Uuid) -> Result<BTreeSet<TagId>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .post_tags
            .range((post_id, TagId::MIN)..=(post_id, TagId::MAX))
            .map(|(_, tag_id)| *tag_id)
            .collect())
    }

    async fn sync_associations(
        &self,
        post_id: Uuid,
        attach: &[TagId],
        detach: &[TagId],
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;

        tables.detach_all(|(p, t)| *p == post_id && detach.contains(t));

        // A multi-row insert lands whole or not at all.
        let mut staged = tables.post_tags.clone();
        for &tag_id in attach {
            self.faults.take_association_insert()?;

            if !tables.posts.contains_key(&post_id) {
                return Err(RepoError::MissingReference("post_tags_post_id_fkey".into()));
            }
            if !tables.tags.contains_key(&tag_id) {
                return Err(RepoError::MissingReference("post_tags_tag_id_fkey".into()));
            }
            if !staged.insert((post_id, tag_id)) {
                return Err(RepoError::Duplicate("post_tags_pkey".into()));
            }
        }
        tables.post_tags = staged;

        Ok(())
    }
}

#[async_trait]
impl TagStore for MemoryRepos {
    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let tables = self.tables.read().await;

        let mut tags: Vec<Tag> = tables.tags.values().cloned().collect();
        tags.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(tags)
    }

    async fn find(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn create(&self, new_tag: NewTag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;

        if tables.tags.values().any(|t| t.name == new_tag.name) {
            return Err(RepoError::Duplicate("tags_name_key".into()));
        }

        tables.last_tag_id += 1;
        let now = Utc::now();
        let tag = Tag {
            id: tables.last_tag_id,
            name: new_tag.name,
            slug: new_tag.slug,
            created_at: now,
            updated_at: now,
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update(&self, record: Tag) -> Result<Tag, RepoError> {
        let mut tables = self.tables.write().await;

        if !tables.tags.contains_key(&record.id) {
            return Err(RepoError::NotFound);
        }
        if tables
            .tags
            .values()
            .any(|t| t.id != record.id && t.name == record.name)
        {
            return Err(RepoError::Duplicate("tags_name_key".into()));
        }

        tables.tags.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: TagId) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;

        tables.tags.remove(&id).ok_or(RepoError::NotFound)?;
        tables.detach_all(|(_, tag_id)| *tag_id == id);
        Ok(())
    }

    async fn name_taken(&self, name: &str, except: Option<TagId>) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .values()
            .any(|t| t.name == name && Some(t.id) != except))
    }
}

#[async_trait]
impl UserStore for MemoryRepos {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|account| account.user.email == email)
            .map(|account| account.user.clone()))
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<Author>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).map(Account::author))
    }

    async fn create(&self, user: User, name: String) -> Result<Account, RepoError> {
        let mut tables = self.tables.write().await;

        if tables.users.contains_key(&user.id) {
            return Err(RepoError::Duplicate("users_pkey".into()));
        }
        if tables.users.values().any(|a| a.user.email == user.email) {
            return Err(RepoError::Duplicate("users_email_key".into()));
        }

        let account = Account { user, name };
        tables.users.insert(account.user.id, account.clone());
        Ok(account)
    }
}
