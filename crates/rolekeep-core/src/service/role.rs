//! Role persistence service.
//!
//! RoleStore keeps service roles in the `roles` namespace of a backend, one
//! bucket per role with the encoded record under the `params` key:
//!
//! ```text
//! roles/<name>/params -> marshaled role
//! ```
//!
//! Nothing is cached; every call goes to the backend.

use std::time::Duration;

use rolekeep_types::error::RoleError;
use rolekeep_types::role::{ServiceRole, compare_by_name};

use crate::marshal::{JsonRoleMarshaler, RoleMarshaler};
use crate::storage::backend::Backend;
use crate::storage::ttl::{min_ttl, requested_ttl, ttl_until};

/// Bucket holding every role.
pub const ROLES_BUCKET: &str = "roles";

/// Key under a role's bucket that stores the encoded role.
pub const PARAMS_KEY: &str = "params";

/// Service managing the role lifecycle on top of a key-value backend.
///
/// Generic over the backend and the marshaler so that rolekeep-core never
/// depends on rolekeep-infra.
pub struct RoleStore<B: Backend, M: RoleMarshaler = JsonRoleMarshaler> {
    backend: B,
    marshaler: M,
}

impl<B: Backend> RoleStore<B, JsonRoleMarshaler> {
    /// Create a store that encodes roles as JSON.
    pub fn new(backend: B) -> Self {
        Self::with_marshaler(backend, JsonRoleMarshaler)
    }
}

impl<B: Backend, M: RoleMarshaler> RoleStore<B, M> {
    pub fn with_marshaler(backend: B, marshaler: M) -> Self {
        Self { backend, marshaler }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Delete every role in one bucket-level delete.
    ///
    /// An empty or missing namespace is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_roles(&self) -> Result<(), RoleError> {
        match self.backend.delete_bucket(&[], ROLES_BUCKET).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!("role namespace already empty");
                Ok(())
            }
            Err(e) => Err(RoleError::backend("failed to delete all roles", e)),
        }
    }

    /// List all roles, sorted by name.
    ///
    /// Roles that disappear between the key listing and the read (expired
    /// or deleted concurrently) are skipped. Any other failure aborts.
    #[tracing::instrument(skip(self))]
    pub async fn get_roles(&self) -> Result<Vec<M::Role>, RoleError> {
        let names = self
            .backend
            .get_keys(&[ROLES_BUCKET])
            .await
            .map_err(|e| RoleError::backend("failed to list roles", e))?;

        let mut roles = Vec::with_capacity(names.len());
        for name in &names {
            match self.get_role(name).await {
                Ok(role) => roles.push(role),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(role = %name, "role vanished during listing, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        roles.sort_by(compare_by_name);
        Ok(roles)
    }

    /// Create or replace a role.
    ///
    /// The stored TTL is the shorter of `ttl` (zero = no expiration) and the
    /// time left until the role's own `expires`, measured on the backend
    /// clock.
    #[tracing::instrument(skip(self, role), fields(role = %role.name()))]
    pub async fn upsert_role(&self, role: &M::Role, ttl: Duration) -> Result<(), RoleError> {
        let name = role.name();
        if name.is_empty() {
            return Err(RoleError::BadParameter("missing role name".to_string()));
        }

        let data = self.marshaler.marshal_service_role(role)?;

        let now = self.backend.clock().now();
        let backend_ttl = min_ttl(requested_ttl(ttl), ttl_until(now, role.expires()));
        tracing::debug!(?backend_ttl, "writing role");

        self.backend
            .upsert_val(&[ROLES_BUCKET, name], PARAMS_KEY, &data, backend_ttl)
            .await
            .map_err(|e| RoleError::backend(format!("failed to write role '{name}'"), e))
    }

    /// Get a role by name.
    #[tracing::instrument(skip(self))]
    pub async fn get_role(&self, name: &str) -> Result<M::Role, RoleError> {
        if name.is_empty() {
            return Err(RoleError::BadParameter("missing role name".to_string()));
        }

        let data = match self.backend.get_val(&[ROLES_BUCKET, name], PARAMS_KEY).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Err(RoleError::NotFound(format!("role {name} is not found")));
            }
            Err(e) => {
                return Err(RoleError::backend(format!("failed to read role '{name}'"), e));
            }
        };

        let role = self.marshaler.unmarshal_service_role(&data)?;
        if role.name() != name {
            return Err(RoleError::Unexpected(format!(
                "bucket '{name}' holds role '{}'",
                role.name()
            )));
        }

        Ok(role)
    }

    /// Delete a role and every key in its bucket.
    ///
    /// Unlike [`delete_all_roles`](Self::delete_all_roles), a missing role is
    /// reported as `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_role(&self, name: &str) -> Result<(), RoleError> {
        if name.is_empty() {
            return Err(RoleError::BadParameter("missing role name".to_string()));
        }

        match self.backend.delete_bucket(&[ROLES_BUCKET], name).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                Err(RoleError::NotFound(format!("role '{name}' is not found")))
            }
            Err(e) => Err(RoleError::backend(format!("failed to delete role '{name}'"), e)),
        }
    }
}
