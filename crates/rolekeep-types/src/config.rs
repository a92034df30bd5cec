//! Global configuration types for rolekeep.
//!
//! `GlobalConfig` represents the top-level `config.toml` that selects the
//! storage backend and the default role time-to-live.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration for rolekeep.
///
/// Loaded from `~/.rolekeep/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Which backend stores role records.
    #[serde(default)]
    pub backend: BackendKind,

    /// SQLite connection URL. Defaults to `sqlite://{data_dir}/rolekeep.db`.
    #[serde(default)]
    pub database_url: Option<String>,

    /// TTL applied by `role upsert` when `--ttl` is not given. 0 = no expiration.
    #[serde(default)]
    pub default_role_ttl_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            database_url: None,
            default_role_ttl_secs: 0,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local map; contents are lost on exit.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert!(config.database_url.is_none());
        assert_eq!(config.default_role_ttl_secs, 0);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.default_role_ttl_secs, 0);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
backend = "memory"
database_url = "sqlite:///tmp/roles.db"
default_role_ttl_secs = 3600
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/roles.db"));
        assert_eq!(config.default_role_ttl_secs, 3600);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<GlobalConfig, _> = toml::from_str(r#"backend = "etcd""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
    }
}
