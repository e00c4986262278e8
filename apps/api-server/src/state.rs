//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{FileStorage, PasswordService, Store, TokenService};
use quill_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService, LocalFileStorage};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: Arc<dyn FileStorage>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let store = init_store(config).await;
        tracing::info!(backend = store.backend(), "Store ready");

        let files = Arc::new(LocalFileStorage::new(config.upload_dir.clone()));
        tracing::info!(root = %config.upload_dir.display(), "File storage ready");

        tracing::info!("Application state initialized");

        Self {
            store,
            files,
            tokens: Arc::new(JwtTokenService::from_env()),
            passwords: Arc::new(Argon2PasswordService::new()),
        }
    }
}

#[cfg(feature = "postgres")]
async fn init_store(config: &AppConfig) -> Arc<dyn Store> {
    use quill_infra::PostgresStore;
    use quill_infra::database::connect;

    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return Arc::new(InMemoryStore::new());
    };

    match connect(db_config).await {
        Ok(conn) => return Arc::new(PostgresStore::new(conn)),
        Err(e) => tracing::error!(
            "Failed to connect to database: {}. Using in-memory fallback.",
            e
        ),
    }

    Arc::new(InMemoryStore::new())
}

#[cfg(not(feature = "postgres"))]
async fn init_store(_config: &AppConfig) -> Arc<dyn Store> {
    tracing::info!("Running without postgres feature - using in-memory store");
    Arc::new(InMemoryStore::new())
}
