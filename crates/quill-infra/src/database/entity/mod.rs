//! SeaORM entities, one module per table.

pub mod post;
pub mod post_tag;
pub mod profile;
pub mod tag;
pub mod user;
