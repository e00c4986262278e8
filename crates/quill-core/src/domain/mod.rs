//! Domain entities - the core business objects.

mod user;

mod post;
mod tag;

pub use post::{MIN_CONTENT_CHARS, Post, PostDetails, PostInput, PostStatus};
pub use tag::{NewTag, Tag, TagId, TagInput};
pub use user::{Account, Author, Role, User};
