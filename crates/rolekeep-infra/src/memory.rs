//! In-process key-value backend.
//!
//! Implements `Backend` from `rolekeep-core` over a `DashMap` keyed by the
//! flattened `path/key` string. Expired values are hidden from every read
//! and purged lazily on access and on each write.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use rolekeep_core::storage::backend::{Backend, child_segment, flatten_path, validate_segment};
use rolekeep_core::storage::clock::{Clock, SystemClock};
use rolekeep_core::storage::ttl::expires_at;
use rolekeep_types::error::BackendError;

#[derive(Debug, Clone)]
struct Item {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Item {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// `DashMap`-backed implementation of `Backend`. Contents are lost on drop.
pub struct MemoryBackend {
    items: DashMap<String, Item>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    /// Create an empty backend on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: DashMap::new(),
            clock,
        }
    }

    /// Drop every expired value. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.items.len();
        self.items.retain(|_, item| item.is_live(now));
        before.saturating_sub(self.items.len())
    }

    /// Number of stored values, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn item_key(path: &[&str], key: &str) -> Result<String, BackendError> {
        validate_segment(key)?;
        let prefix = flatten_path(path)?;
        Ok(if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}/{key}")
        })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    async fn get_val(&self, path: &[&str], key: &str) -> Result<Vec<u8>, BackendError> {
        let item_key = Self::item_key(path, key)?;
        let now = self.clock.now();

        // Clone out before removing so no shard guard is held across the purge.
        let item = self.items.get(&item_key).map(|entry| entry.value().clone());
        match item {
            Some(item) if item.is_live(now) => Ok(item.value),
            Some(_) => {
                self.items.remove_if(&item_key, |_, item| !item.is_live(now));
                Err(BackendError::NotFound(format!("key {item_key} is not found")))
            }
            None => Err(BackendError::NotFound(format!("key {item_key} is not found"))),
        }
    }

    async fn upsert_val(
        &self,
        path: &[&str],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let item_key = Self::item_key(path, key)?;
        let now = self.clock.now();

        self.purge_expired();
        self.items.insert(
            item_key,
            Item {
                value: value.to_vec(),
                expires_at: expires_at(now, ttl),
            },
        );
        Ok(())
    }

    async fn get_keys(&self, path: &[&str]) -> Result<Vec<String>, BackendError> {
        let prefix = flatten_path(path)?;
        let now = self.clock.now();

        let children: BTreeSet<String> = self
            .items
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .filter_map(|entry| child_segment(&prefix, entry.key()).map(str::to_string))
            .collect();

        Ok(children.into_iter().collect())
    }

    async fn delete_bucket(&self, path: &[&str], name: &str) -> Result<(), BackendError> {
        let mut bucket_path = path.to_vec();
        bucket_path.push(name);
        let bucket = flatten_path(&bucket_path)?;
        let subtree = format!("{bucket}/");
        let now = self.clock.now();

        let mut removed_live = 0usize;
        self.items.retain(|key, item| {
            if !key.starts_with(&subtree) {
                return true;
            }
            if item.is_live(now) {
                removed_live += 1;
            }
            false
        });

        if removed_live == 0 {
            return Err(BackendError::NotFound(format!(
                "bucket {bucket} is not found"
            )));
        }

        tracing::debug!(bucket = %bucket, removed = removed_live, "deleted bucket");
        Ok(())
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
