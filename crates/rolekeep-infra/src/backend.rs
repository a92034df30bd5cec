//! Backend selected at runtime from configuration.

use std::path::Path;
use std::time::Duration;

use rolekeep_core::storage::backend::Backend;
use rolekeep_core::storage::clock::Clock;
use rolekeep_types::config::{BackendKind, GlobalConfig};
use rolekeep_types::error::BackendError;

use crate::config::resolve_database_url;
use crate::memory::MemoryBackend;
use crate::sqlite::backend::SqliteBackend;
use crate::sqlite::pool::DatabasePool;

/// One of the concrete backends, chosen by `GlobalConfig::backend`.
pub enum ConfiguredBackend {
    Memory(MemoryBackend),
    Sqlite(SqliteBackend),
}

impl ConfiguredBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            ConfiguredBackend::Memory(_) => BackendKind::Memory,
            ConfiguredBackend::Sqlite(_) => BackendKind::Sqlite,
        }
    }
}

/// Open the backend named in `config`, connecting and migrating SQLite if needed.
pub async fn open_backend(
    config: &GlobalConfig,
    data_dir: &Path,
) -> Result<ConfiguredBackend, BackendError> {
    match config.backend {
        BackendKind::Memory => {
            tracing::info!("using in-memory backend; roles will not persist");
            Ok(ConfiguredBackend::Memory(MemoryBackend::new()))
        }
        BackendKind::Sqlite => {
            let url = resolve_database_url(config, data_dir);
            tracing::debug!(url = %url, "opening sqlite backend");
            let pool = DatabasePool::new(&url)
                .await
                .map_err(|e| BackendError::Connection(format!("{url}: {e}")))?;
            Ok(ConfiguredBackend::Sqlite(SqliteBackend::new(pool)))
        }
    }
}

impl Backend for ConfiguredBackend {
    async fn get_val(&self, path: &[&str], key: &str) -> Result<Vec<u8>, BackendError> {
        match self {
            ConfiguredBackend::Memory(b) => b.get_val(path, key).await,
            ConfiguredBackend::Sqlite(b) => b.get_val(path, key).await,
        }
    }

    async fn upsert_val(
        &self,
        path: &[&str],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        match self {
            ConfiguredBackend::Memory(b) => b.upsert_val(path, key, value, ttl).await,
            ConfiguredBackend::Sqlite(b) => b.upsert_val(path, key, value, ttl).await,
        }
    }

    async fn get_keys(&self, path: &[&str]) -> Result<Vec<String>, BackendError> {
        match self {
            ConfiguredBackend::Memory(b) => b.get_keys(path).await,
            ConfiguredBackend::Sqlite(b) => b.get_keys(path).await,
        }
    }

    async fn delete_bucket(&self, path: &[&str], name: &str) -> Result<(), BackendError> {
        match self {
            ConfiguredBackend::Memory(b) => b.delete_bucket(path, name).await,
            ConfiguredBackend::Sqlite(b) => b.delete_bucket(path, name).await,
        }
    }

    fn clock(&self) -> &dyn Clock {
        match self {
            ConfiguredBackend::Memory(b) => b.clock(),
            ConfiguredBackend::Sqlite(b) => b.clock(),
        }
    }
}
