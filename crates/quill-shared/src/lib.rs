//! # Quill Shared
//!
//! Wire types of the HTTP API: request/response DTOs and the response envelope.

pub mod dto;
pub mod response;

pub use response::ApiResponse;
