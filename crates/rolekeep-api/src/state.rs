//! Application state wiring the role store to its configured backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use rolekeep_core::service::role::RoleStore;
use rolekeep_infra::backend::{ConfiguredBackend, open_backend};
use rolekeep_infra::config::{load_global_config, resolve_data_dir};
use rolekeep_types::config::GlobalConfig;

/// Role store pinned to the runtime-selected backend.
pub type ConcreteRoleStore = RoleStore<ConfiguredBackend>;

/// Shared application state used by CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub role_store: Arc<ConcreteRoleStore>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, open the backend, wire the store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let backend = open_backend(&config, &data_dir)
            .await
            .context("Failed to open role backend")?;
        tracing::debug!(backend = %backend.kind(), data_dir = %data_dir.display(), "backend ready");

        Ok(Self {
            role_store: Arc::new(RoleStore::new(backend)),
            config,
            data_dir,
        })
    }
}
