//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! persistence, authentication and file storage.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory store only
//! - `postgres` - PostgreSQL database support via SeaORM

pub mod auth;
pub mod database;
pub mod storage;

// Re-exports - In-Memory
pub use database::{DatabaseConfig, InMemoryStore};
pub use storage::{InMemoryFileStorage, LocalFileStorage};

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::PostgresStore;
