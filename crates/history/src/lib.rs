//! Conversation history stores for Documentor.
//!
//! One backend is chosen per process from [`HistoryConfig`]:
//! - [`InMemoryHistory`]: volatile, lost on restart
//! - [`SqliteHistory`]: persistent, single node (feature `sqlite`, default)
//! - [`PostgresHistory`]: persistent, shared (feature `postgres`)

pub mod clock;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryHistory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteHistory;

#[cfg(feature = "postgres")]
pub use postgres::PostgresHistory;

use std::sync::Arc;

use documentor_config::{AppConfig, HistoryBackendKind};
use documentor_core::{HistoryError, HistoryStore};
use tracing::info;

/// Open the history backend selected by `config`.
///
/// Persistent backends are migrated before they are returned.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    let store: Arc<dyn HistoryStore> = match config.history.backend {
        HistoryBackendKind::Memory => Arc::new(InMemoryHistory::new()),
        HistoryBackendKind::Sqlite => open_sqlite(config).await?,
        HistoryBackendKind::Postgres => open_postgres(config).await?,
    };
    info!(backend = store.name(), "History store ready");
    Ok(store)
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(config: &AppConfig) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    let store = SqliteHistory::connect(&config.sqlite_url(), config.history.max_connections).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_config: &AppConfig) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    Err(HistoryError::Storage(
        "sqlite history requires the `sqlite` feature".into(),
    ))
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &AppConfig) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    let url = config.history.database_url.as_deref().ok_or_else(|| {
        HistoryError::Storage("history.database_url is required for postgres".into())
    })?;
    let store = PostgresHistory::connect(url, config.history.max_connections).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_config: &AppConfig) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    Err(HistoryError::Storage(
        "postgres history requires the `postgres` feature".into(),
    ))
}
