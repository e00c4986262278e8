//! The response envelope every endpoint answers with.

use serde::{Deserialize, Serialize};

/// `{"success": bool, "message": string | null, "data": T | null}`.
///
/// `message` and `data` are always present in the JSON, as `null` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Build an envelope for an HTTP status code; `success` is `code < 400`.
    /// An empty message is treated as no message.
    pub fn new(code: u16, message: impl Into<String>, data: Option<T>) -> Self {
        let message = message.into();
        Self {
            success: code < 400,
            message: (!message.is_empty()).then_some(message),
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(200, "", Some(data))
    }
}
