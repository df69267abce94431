//! Chat history stores for ChatRelay.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[cfg(feature = "mysql")]
pub use mysql::MysqlStore;

use std::sync::Arc;

use chatrelay_config::{StorageBackend, StorageConfig, is_sql_identifier};
use chatrelay_core::error::StorageError;
use chatrelay_core::store::ExchangeStore;
use tracing::info;

/// Build the configured store and make sure its schema exists.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ExchangeStore>, StorageError> {
    if !is_sql_identifier(&config.table) {
        return Err(StorageError::InvalidConfig(format!(
            "'{}' is not a valid table name",
            config.table
        )));
    }

    let store = connect(config).await?;
    store.initialize().await?;
    info!(backend = store.name(), table = %config.table, "History store ready");
    Ok(store)
}

async fn connect(config: &StorageConfig) -> Result<Arc<dyn ExchangeStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStore::new())),

        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => Ok(Arc::new(
            SqliteStore::open(&config.path, &config.table, config.max_connections).await?,
        )),

        #[cfg(feature = "postgres")]
        StorageBackend::Postgres => {
            let url = require_url(config)?;
            Ok(Arc::new(
                PostgresStore::connect(url, &config.table, config.max_connections).await?,
            ))
        }

        #[cfg(feature = "mysql")]
        StorageBackend::Mysql => {
            let url = require_url(config)?;
            Ok(Arc::new(
                MysqlStore::connect(url, &config.table, config.max_connections).await?,
            ))
        }

        #[allow(unreachable_patterns)]
        other => Err(StorageError::InvalidConfig(format!(
            "storage backend '{}' is not compiled in (enable the '{}' feature)",
            other.as_str(),
            other.as_str()
        ))),
    }
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn require_url(config: &StorageConfig) -> Result<&str, StorageError> {
    config.url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
        StorageError::InvalidConfig(format!(
            "storage.url is required for the {} backend",
            config.backend.as_str()
        ))
    })
}
