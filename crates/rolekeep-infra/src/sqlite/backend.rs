//! SQLite key-value backend implementation.
//!
//! Implements `Backend` from `rolekeep-core` using sqlx with split read/write
//! pools. Each value is a row in `kv_entries` keyed by `(path, key)` where
//! `path` is the flattened bucket path. Expiration is stored as unix
//! milliseconds taken from the backend clock, never from SQLite's own time.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;

use rolekeep_core::storage::backend::{
    Backend, PATH_SEPARATOR, child_segment, flatten_path, validate_segment,
};
use rolekeep_core::storage::clock::{Clock, SystemClock};
use rolekeep_core::storage::ttl::expires_at;
use rolekeep_types::error::BackendError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `Backend`.
pub struct SqliteBackend {
    pool: DatabasePool,
    clock: Arc<dyn Clock>,
}

impl SqliteBackend {
    /// Create a backend on the given pool using the system clock.
    pub fn new(pool: DatabasePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: DatabasePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Remove rows whose expiration has passed.
    pub async fn sweep_expired(&self) -> Result<u64, BackendError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(self.now_millis())
            .execute(&self.pool.writer)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn storage_error(e: sqlx::Error) -> BackendError {
    BackendError::Storage(e.to_string())
}

/// Prefix shared by every path strictly below `bucket`.
fn subtree_prefix(bucket: &str) -> String {
    format!("{bucket}{PATH_SEPARATOR}")
}

// ---------------------------------------------------------------------------
// Backend implementation
// ---------------------------------------------------------------------------

impl Backend for SqliteBackend {
    async fn get_val(&self, path: &[&str], key: &str) -> Result<Vec<u8>, BackendError> {
        validate_segment(key)?;
        let flat = flatten_path(path)?;

        let row = sqlx::query(
            "SELECT value FROM kv_entries WHERE path = ? AND key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(&flat)
        .bind(key)
        .bind(self.now_millis())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(storage_error)?;

        match row {
            Some(row) => row.try_get("value").map_err(storage_error),
            None => Err(BackendError::NotFound(format!("key {flat}/{key} is not found"))),
        }
    }

    async fn upsert_val(
        &self,
        path: &[&str],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        validate_segment(key)?;
        let flat = flatten_path(path)?;
        let now = self.clock.now();
        let expires = expires_at(now, ttl).map(|at| at.timestamp_millis());

        // Housekeeping only: reads already hide expired rows.
        if let Err(err) = self.sweep_expired().await {
            tracing::warn!(error = %err, "failed to sweep expired rows");
        }

        sqlx::query(
            r#"INSERT INTO kv_entries (path, key, value, expires_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (path, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"#,
        )
        .bind(&flat)
        .bind(key)
        .bind(value)
        .bind(expires)
        .execute(&self.pool.writer)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_keys(&self, path: &[&str]) -> Result<Vec<String>, BackendError> {
        let flat = flatten_path(path)?;
        let now = self.now_millis();

        let rows = if flat.is_empty() {
            sqlx::query("SELECT path, key FROM kv_entries WHERE expires_at IS NULL OR expires_at > ?")
                .bind(now)
                .fetch_all(&self.pool.reader)
                .await
        } else {
            let subtree = subtree_prefix(&flat);
            sqlx::query(
                r#"SELECT path, key FROM kv_entries
                   WHERE (path = ? OR substr(path, 1, length(?)) = ?)
                     AND (expires_at IS NULL OR expires_at > ?)"#,
            )
            .bind(&flat)
            .bind(&subtree)
            .bind(&subtree)
            .bind(now)
            .fetch_all(&self.pool.reader)
            .await
        }
        .map_err(storage_error)?;

        let mut children = BTreeSet::new();
        for row in &rows {
            let row_path: String = row.try_get("path").map_err(storage_error)?;
            if row_path == flat {
                let key: String = row.try_get("key").map_err(storage_error)?;
                children.insert(key);
            } else if let Some(child) = child_segment(&flat, &row_path) {
                children.insert(child.to_string());
            }
        }

        Ok(children.into_iter().collect())
    }

    async fn delete_bucket(&self, path: &[&str], name: &str) -> Result<(), BackendError> {
        let mut bucket_path = path.to_vec();
        bucket_path.push(name);
        let bucket = flatten_path(&bucket_path)?;
        let subtree = subtree_prefix(&bucket);
        let now = self.now_millis();

        let mut tx = self.pool.writer.begin().await.map_err(storage_error)?;

        let (live,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM kv_entries
               WHERE (path = ? OR substr(path, 1, length(?)) = ?)
                 AND (expires_at IS NULL OR expires_at > ?)"#,
        )
        .bind(&bucket)
        .bind(&subtree)
        .bind(&subtree)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        sqlx::query("DELETE FROM kv_entries WHERE path = ? OR substr(path, 1, length(?)) = ?")
            .bind(&bucket)
            .bind(&subtree)
            .bind(&subtree)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        if live == 0 {
            return Err(BackendError::NotFound(format!(
                "bucket {bucket} is not found"
            )));
        }

        tracing::debug!(bucket = %bucket, removed = live, "deleted bucket");
        Ok(())
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolekeep_core::service::role::RoleStore;
    use rolekeep_core::storage::clock::ManualClock;
    use rolekeep_types::role::{RoleV1, ServiceRole};

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn backend_with_clock() -> (SqliteBackend, ManualClock) {
        let clock = ManualClock::new("2026-03-01T09:00:00Z".parse().unwrap());
        let backend = SqliteBackend::with_clock(test_pool().await, Arc::new(clock.clone()));
        (backend, clock)
    }

    #[tokio::test]
    async fn test_upsert_get_roundtrip() {
        let backend = SqliteBackend::new(test_pool().await);
        backend
            .upsert_val(&["roles", "admin"], "params", b"\x00binary\xff", None)
            .await
            .unwrap();

        let got = backend.get_val(&["roles", "admin"], "params").await.unwrap();
        assert_eq!(got, b"\x00binary\xff");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = SqliteBackend::new(test_pool().await);
        let err = backend.get_val(&["roles", "nope"], "params").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_replaces_value_and_ttl() {
        let (backend, clock) = backend_with_clock().await;
        backend
            .upsert_val(&["roles", "admin"], "params", b"v1", Some(Duration::from_secs(5)))
            .await
            .unwrap();
        backend
            .upsert_val(&["roles", "admin"], "params", b"v2", None)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(60));

        let got = backend.get_val(&["roles", "admin"], "params").await.unwrap();
        assert_eq!(got, b"v2");
    }

    #[tokio::test]
    async fn test_value_expires() {
        let (backend, clock) = backend_with_clock().await;
        backend
            .upsert_val(&["roles", "temp"], "params", b"x", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(9));
        assert!(backend.get_val(&["roles", "temp"], "params").await.is_ok());

        clock.advance(Duration::from_secs(1));
        let err = backend.get_val(&["roles", "temp"], "params").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_sweep_expired_on_write() {
        let (backend, clock) = backend_with_clock().await;
        backend
            .upsert_val(&["roles", "temp"], "params", b"x", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2));

        backend
            .upsert_val(&["roles", "keep"], "params", b"x", None)
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv_entries")
            .fetch_one(&backend.pool().reader)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_failed_sweep_does_not_block_write() {
        let (backend, clock) = backend_with_clock().await;
        backend
            .upsert_val(&["roles", "temp"], "params", b"x", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2));

        sqlx::query(
            "CREATE TRIGGER no_deletes BEFORE DELETE ON kv_entries \
             BEGIN SELECT RAISE(ABORT, 'deletes disabled'); END",
        )
        .execute(&backend.pool().writer)
        .await
        .unwrap();
        assert!(backend.sweep_expired().await.is_err());

        backend
            .upsert_val(&["roles", "keep"], "params", b"kept", None)
            .await
            .unwrap();

        let got = backend.get_val(&["roles", "keep"], "params").await.unwrap();
        assert_eq!(got, b"kept");
    }

    #[tokio::test]
    async fn test_get_keys_lists_immediate_children_sorted() {
        let backend = SqliteBackend::new(test_pool().await);
        for name in ["zebra", "alpha", "mike"] {
            backend
                .upsert_val(&["roles", name], "params", b"x", None)
                .await
                .unwrap();
        }
        backend
            .upsert_val(&["rolesx", "other"], "params", b"x", None)
            .await
            .unwrap();

        let keys = backend.get_keys(&["roles"]).await.unwrap();
        assert_eq!(keys, vec!["alpha", "mike", "zebra"]);

        let root = backend.get_keys(&[]).await.unwrap();
        assert_eq!(root, vec!["roles", "rolesx"]);

        let leaf = backend.get_keys(&["roles", "alpha"]).await.unwrap();
        assert_eq!(leaf, vec!["params"]);
    }

    #[tokio::test]
    async fn test_get_keys_hides_expired() {
        let (backend, clock) = backend_with_clock().await;
        backend
            .upsert_val(&["roles", "temp"], "params", b"x", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .upsert_val(&["roles", "keep"], "params", b"x", None)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(2));

        assert_eq!(backend.get_keys(&["roles"]).await.unwrap(), vec!["keep"]);
    }

    #[tokio::test]
    async fn test_delete_bucket_removes_subtree_only() {
        let backend = SqliteBackend::new(test_pool().await);
        backend
            .upsert_val(&["roles", "admin"], "params", b"x", None)
            .await
            .unwrap();
        backend
            .upsert_val(&["roles", "admin2"], "params", b"x", None)
            .await
            .unwrap();

        backend.delete_bucket(&["roles"], "admin").await.unwrap();

        assert_eq!(backend.get_keys(&["roles"]).await.unwrap(), vec!["admin2"]);
    }

    #[tokio::test]
    async fn test_delete_missing_bucket_is_not_found() {
        let backend = SqliteBackend::new(test_pool().await);
        let err = backend.delete_bucket(&[], "roles").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_segments_with_like_wildcards_are_literal() {
        let backend = SqliteBackend::new(test_pool().await);
        backend
            .upsert_val(&["ro%", "a"], "params", b"x", None)
            .await
            .unwrap();
        backend
            .upsert_val(&["roles", "b"], "params", b"x", None)
            .await
            .unwrap();

        assert_eq!(backend.get_keys(&["ro%"]).await.unwrap(), vec!["a"]);
        backend.delete_bucket(&[], "ro%").await.unwrap();
        assert_eq!(backend.get_keys(&["roles"]).await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = RoleStore::new(SqliteBackend::new(test_pool().await));
        for name in ["zebra", "alpha", "mike"] {
            store
                .upsert_role(&RoleV1::new(name), Duration::ZERO)
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .get_roles()
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mike", "zebra"]);

        store.delete_role("mike").await.unwrap();
        assert!(store.get_role("mike").await.unwrap_err().is_not_found());
        assert!(store.delete_role("mike").await.unwrap_err().is_not_found());

        store.delete_all_roles().await.unwrap();
        store.delete_all_roles().await.unwrap();
        assert!(store.get_roles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_caps_ttl_at_role_expiry() {
        let (backend, clock) = backend_with_clock().await;
        let store = RoleStore::new(backend);
        let mut role = RoleV1::new("temp");
        role.set_expiry(Some(clock.now() + chrono::Duration::seconds(10)));

        store
            .upsert_role(&role, Duration::from_secs(100))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(store.get_role("temp").await.unwrap_err().is_not_found());
    }
}
