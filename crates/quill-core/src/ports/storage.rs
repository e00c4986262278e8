//! File storage port - used for post images.

use async_trait::async_trait;

/// File storage keyed by relative path. Operations are not transactional.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing file.
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the file at `path`.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &str) -> bool;
}

/// File storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}
