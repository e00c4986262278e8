use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationErrors};

/// Tags are addressed by an auto-incremented integer id.
pub type TagId = i32;

/// Tag entity - a label that can be attached to many posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tag that has not been persisted yet; the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

/// Input for creating or renaming a tag.
#[derive(Debug, Clone)]
pub struct TagInput {
    pub name: String,
}

impl TagInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.name.trim().is_empty() {
            return Err(ValidationErrors::single("name", validation::required("name")));
        }
        Ok(())
    }
}
