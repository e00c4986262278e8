use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tag::{Tag, TagId};
use super::user::Author;
use crate::slug::slugify;
use crate::validation::{self, ValidationErrors};

/// Minimum number of characters in a post body.
pub const MIN_CONTENT_CHARS: usize = 15;

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {other}")),
        }
    }
}

/// Post entity - represents a blog post or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PostStatus,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post owned by `user_id`; the slug is derived from the title.
    pub fn new(user_id: Uuid, title: String, content: String, status: PostStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            slug: slugify(&title),
            title,
            content,
            status,
            image_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields, re-deriving the slug.
    pub fn revise(&mut self, title: String, content: String, status: PostStatus) {
        self.slug = slugify(&title);
        self.title = title;
        self.content = content;
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// A post read back together with its owner and its tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub author: Author,
    pub tags: Vec<Tag>,
}

/// Validated input for creating or updating a post.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub tag_ids: Vec<TagId>,
}

impl PostInput {
    /// Check the rules that do not need the store.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.title.trim().is_empty() {
            errors.add("title", validation::required("title"));
        }
        if self.content.trim().is_empty() {
            errors.add("content", validation::required("content"));
        } else if self.content.chars().count() < MIN_CONTENT_CHARS {
            errors.add(
                "content",
                format!("The content field must be at least {MIN_CONTENT_CHARS} characters."),
            );
        }
        if self.tag_ids.is_empty() {
            errors.add("tag_ids", validation::required("tag_ids"));
        }

        errors.into_result()
    }

    /// Strip surrounding whitespace from the text fields.
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            ..self
        }
    }

    /// The requested tags with duplicates collapsed.
    pub fn tag_set(&self) -> BTreeSet<TagId> {
        self.tag_ids.iter().copied().collect()
    }
}
