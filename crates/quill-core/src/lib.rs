//! # Quill Core
//!
//! The domain layer of the Quill blog backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, the ports adapters must implement, and the post/tag workflows that
//! run against those ports inside an explicit transaction.

pub mod domain;
pub mod error;
pub mod policy;
pub mod ports;
pub mod services;
pub mod slug;
pub mod validation;

pub use error::DomainError;
pub use validation::ValidationErrors;
