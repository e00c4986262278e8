//! PostgreSQL repository implementations.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use quill_core::domain::{Account, Author, NewTag, Post, PostDetails, Tag, TagId, User};
use quill_core::error::RepoError;
use quill_core::ports::{PostStore, TagStore, UserStore};

use super::entity::{post, post_tag, profile, tag, user};
use super::postgres_base::{SeaOrmStore, map_db_err};

#[async_trait]
impl<C> PostStore for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .insert(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let authors = load_authors(&self.conn, vec![model.user_id]).await?;
        let mut tags = load_tags(&self.conn, vec![model.id]).await?;

        assemble(model, &authors, &mut tags).map(Some)
    }

    async fn list(&self) -> Result<Vec<PostDetails>, RepoError> {
        let models = post::Entity::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.conn)
            .await
            .map_err(map_db_err)?;

        let owner_ids: BTreeSet<Uuid> = models.iter().map(|m| m.user_id).collect();
        let post_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let authors = load_authors(&self.conn, owner_ids.into_iter().collect()).await?;
        let mut tags = load_tags(&self.conn, post_ids).await?;

        models
            .into_iter()
            .map(|model| assemble(model, &authors, &mut tags))
            .collect()
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .update(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = post::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn title_taken(&self, title: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = post::Entity::find().filter(post::Column::Title.eq(title));
        if let Some(id) = except {
            query = query.filter(post::Column::Id.ne(id));
        }

        let count = query.count(&self.conn).await.map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn tag_ids(&self, post_id: Uuid) -> Result<BTreeSet<TagId>, RepoError> {
        let links = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.eq(post_id))
            .all(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(links.into_iter().map(|link| link.tag_id).collect())
    }

    async fn sync_associations(
        &self,
        post_id: Uuid,
        attach: &[TagId],
        detach: &[TagId],
    ) -> Result<(), RepoError> {
        if !detach.is_empty() {
            let removed = post_tag::Entity::delete_many()
                .filter(post_tag::Column::PostId.eq(post_id))
                .filter(post_tag::Column::TagId.is_in(detach.iter().copied()))
                .exec(&self.conn)
                .await
                .map_err(map_db_err)?;
            tracing::debug!(%post_id, removed = removed.rows_affected, "Detached tags");
        }

        if !attach.is_empty() {
            let links = attach.iter().map(|&tag_id| post_tag::ActiveModel {
                post_id: Set(post_id),
                tag_id: Set(tag_id),
            });
            let added = post_tag::Entity::insert_many(links)
                .exec_without_returning(&self.conn)
                .await
                .map_err(map_db_err)?;
            tracing::debug!(%post_id, added, "Attached tags");
        }

        Ok(())
    }
}

#[async_trait]
impl<C> TagStore for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let models = tag::Entity::find()
            .order_by_desc(tag::Column::CreatedAt)
            .order_by_desc(tag::Column::Id)
            .all(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        let result = tag::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, new_tag: NewTag) -> Result<Tag, RepoError> {
        let now = Utc::now();
        let model = tag::ActiveModel {
            name: Set(new_tag.name),
            slug: Set(new_tag.slug),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn update(&self, record: Tag) -> Result<Tag, RepoError> {
        let model = tag::ActiveModel {
            id: Set(record.id),
            name: Set(record.name),
            slug: Set(record.slug),
            created_at: Set(record.created_at.into()),
            updated_at: Set(record.updated_at.into()),
        }
        .update(&self.conn)
        .await
        .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: TagId) -> Result<(), RepoError> {
        let result = tag::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn name_taken(&self, name: &str, except: Option<TagId>) -> Result<bool, RepoError> {
        let mut query = tag::Entity::find().filter(tag::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(tag::Column::Id.ne(id));
        }

        let count = query.count(&self.conn).await.map_err(map_db_err)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl<C> UserStore for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<Author>, RepoError> {
        let mut authors = load_authors(&self.conn, vec![id]).await?;
        Ok(authors.remove(&id))
    }

    async fn create(&self, user: User, name: String) -> Result<Account, RepoError> {
        let profile = profile::ActiveModel {
            user_id: Set(user.id),
            name: Set(name),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        };

        let user: User = user::ActiveModel::from(user)
            .insert(&self.conn)
            .await
            .map_err(map_db_err)?
            .into();
        let profile = profile.insert(&self.conn).await.map_err(map_db_err)?;

        Ok(Account {
            user,
            name: profile.name,
        })
    }
}

/// Load the author view of every user in `ids`, keyed by user id.
async fn load_authors<C>(conn: &C, ids: Vec<Uuid>) -> Result<HashMap<Uuid, Author>, RepoError>
where
    C: ConnectionTrait,
{
    let rows = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .find_also_related(profile::Entity)
        .all(conn)
        .await
        .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|(user, profile)| {
            let author = Author {
                id: user.id,
                name: profile.map(|p| p.name).unwrap_or_else(|| user.username.clone()),
                username: user.username,
                role: user.role.into(),
            };
            (author.id, author)
        })
        .collect())
}

/// Load the tags of every post in `post_ids`, keyed by post id, ordered by tag id.
async fn load_tags<C>(conn: &C, post_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError>
where
    C: ConnectionTrait,
{
    let rows = post_tag::Entity::find()
        .filter(post_tag::Column::PostId.is_in(post_ids))
        .find_also_related(tag::Entity)
        .order_by_asc(post_tag::Column::TagId)
        .all(conn)
        .await
        .map_err(map_db_err)?;

    let mut by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (link, tag) in rows {
        if let Some(tag) = tag {
            by_post.entry(link.post_id).or_default().push(tag.into());
        }
    }

    Ok(by_post)
}

fn assemble(
    model: post::Model,
    authors: &HashMap<Uuid, Author>,
    tags: &mut HashMap<Uuid, Vec<Tag>>,
) -> Result<PostDetails, RepoError> {
    let author = authors
        .get(&model.user_id)
        .cloned()
        .ok_or_else(|| RepoError::Query(format!("owner of post {} is missing", model.id)))?;
    let tags = tags.remove(&model.id).unwrap_or_default();

    Ok(PostDetails {
        post: model.into(),
        author,
        tags,
    })
}

/// Mask an email for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
