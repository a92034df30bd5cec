//! Hierarchical key-value backend trait.
//!
//! Values live at `(path, key)` where `path` is an ordered list of bucket
//! names. A bucket is the subtree under a path prefix and can be deleted as
//! a unit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rolekeep_types::error::BackendError;

use super::clock::Clock;

/// Separator used when a path is flattened into a single string key.
pub const PATH_SEPARATOR: char = '/';

/// Trait for hierarchical key-value storage with per-value expiration.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in rolekeep-infra and must be safe for concurrent
/// use by many callers. Expired values are invisible to every operation.
pub trait Backend: Send + Sync {
    /// Get the value stored at `path`/`key`.
    /// Returns `BackendError::NotFound` if it is absent or expired.
    fn get_val(
        &self,
        path: &[&str],
        key: &str,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    /// Create or replace the value at `path`/`key`.
    ///
    /// `ttl` of `None` stores the value without expiration; `Some(d)` makes it
    /// invisible once `d` has elapsed on the backend clock.
    fn upsert_val(
        &self,
        path: &[&str],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// List the immediate children (buckets and keys) under `path`, sorted.
    /// Returns an empty list if the path does not exist.
    fn get_keys(
        &self,
        path: &[&str],
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Remove the bucket `path`/`name` and everything below it.
    /// Returns `BackendError::NotFound` if the bucket holds no live values.
    fn delete_bucket(
        &self,
        path: &[&str],
        name: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Time source used for expiration.
    fn clock(&self) -> &dyn Clock;
}

impl<T: Backend> Backend for Arc<T> {
    fn get_val(
        &self,
        path: &[&str],
        key: &str,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send {
        (**self).get_val(path, key)
    }

    fn upsert_val(
        &self,
        path: &[&str],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).upsert_val(path, key, value, ttl)
    }

    fn get_keys(
        &self,
        path: &[&str],
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send {
        (**self).get_keys(path)
    }

    fn delete_bucket(
        &self,
        path: &[&str],
        name: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).delete_bucket(path, name)
    }

    fn clock(&self) -> &dyn Clock {
        (**self).clock()
    }
}

/// Reject path segments that cannot be flattened unambiguously.
pub fn validate_segment(segment: &str) -> Result<(), BackendError> {
    if segment.is_empty() {
        return Err(BackendError::BadParameter(
            "path segment must not be empty".to_string(),
        ));
    }
    if segment.contains(PATH_SEPARATOR) {
        return Err(BackendError::BadParameter(format!(
            "path segment '{segment}' must not contain '{PATH_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// Validate every segment of `path` and join them with [`PATH_SEPARATOR`].
///
/// The empty path (the backend root) flattens to the empty string.
pub fn flatten_path(path: &[&str]) -> Result<String, BackendError> {
    for segment in path {
        validate_segment(segment)?;
    }
    Ok(path.join("/"))
}

/// Return the immediate child of `prefix` in the flattened `full` path, if
/// `full` lies strictly below `prefix`.
///
/// `prefix` is a flattened path as produced by [`flatten_path`].
pub fn child_segment<'a>(prefix: &str, full: &'a str) -> Option<&'a str> {
    let rest = if prefix.is_empty() {
        full
    } else {
        full.strip_prefix(prefix)?.strip_prefix(PATH_SEPARATOR)?
    };
    rest.split(PATH_SEPARATOR).next().filter(|s| !s.is_empty())
}
