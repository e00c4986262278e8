//! Persistence: the PostgreSQL store and the in-memory fallback.

mod connections;
mod memory;

#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
mod postgres_repo;

#[cfg(feature = "postgres")]
pub mod entity;

pub use connections::DatabaseConfig;
pub use memory::{InMemoryStore, InMemoryTransaction};

#[cfg(feature = "postgres")]
pub use connections::connect;
#[cfg(feature = "postgres")]
pub use postgres_base::{PostgresStore, PostgresTransaction, SeaOrmStore};

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
