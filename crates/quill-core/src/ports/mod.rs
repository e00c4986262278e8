//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod storage;
mod store;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use storage::{FileStorage, StorageError};
pub use store::{PostStore, Repositories, Store, TagStore, Transaction, UserStore};
