//! Service role domain types.
//!
//! `ServiceRole` is the capability set the role store relies on: a name and
//! metadata carrying an optional absolute expiration. `RoleV1` is the
//! concrete, serde-encoded role shipped with the workspace.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarshalError;

/// Resource kind written into every encoded role.
pub const KIND_ROLE: &str = "role";

/// The only role schema version understood by this crate.
pub const V1: &str = "v1";

/// Namespace assigned to roles that do not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default upper bound for sessions issued under a role (30 hours).
pub const DEFAULT_MAX_SESSION_TTL_SECS: u64 = 30 * 60 * 60;

/// A named role record persisted by the role store.
pub trait ServiceRole: Send + Sync + fmt::Debug {
    /// Unique role name, also used as the storage key.
    fn name(&self) -> &str;

    fn metadata(&self) -> &Metadata;

    /// Absolute expiration declared by the role, if any.
    fn expires(&self) -> Option<DateTime<Utc>> {
        self.metadata().expires
    }
}

/// Total order used to present role lists: ascending by name.
pub fn compare_by_name<R: ServiceRole>(a: &R, b: &R) -> Ordering {
    a.name().cmp(b.name())
}

/// Resource metadata shared by every role version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Absolute expiration. `None` means the record never expires on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// Access rules carried by a role. Opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    #[serde(default = "default_max_session_ttl_secs")]
    pub max_session_ttl_secs: u64,

    #[serde(default)]
    pub logins: Vec<String>,

    #[serde(default)]
    pub node_labels: BTreeMap<String, String>,

    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,

    /// Resource name -> allowed verbs (e.g. "session" -> ["read", "list"]).
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<String>>,
}

fn default_max_session_ttl_secs() -> u64 {
    DEFAULT_MAX_SESSION_TTL_SECS
}

fn default_namespaces() -> Vec<String> {
    vec![DEFAULT_NAMESPACE.to_string()]
}

impl Default for RoleSpec {
    fn default() -> Self {
        Self {
            max_session_ttl_secs: default_max_session_ttl_secs(),
            logins: Vec::new(),
            node_labels: BTreeMap::new(),
            namespaces: default_namespaces(),
            resources: BTreeMap::new(),
        }
    }
}

/// Version 1 of the service role resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleV1 {
    pub kind: String,
    pub version: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: RoleSpec,
}

impl RoleV1 {
    /// Create a role with default spec and no expiration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: KIND_ROLE.to_string(),
            version: V1.to_string(),
            metadata: Metadata {
                name: name.into(),
                ..Metadata::default()
            },
            spec: RoleSpec::default(),
        }
    }

    pub fn with_spec(mut self, spec: RoleSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Set (or clear) the absolute expiration of the role.
    pub fn set_expiry(&mut self, expires: Option<DateTime<Utc>>) {
        self.metadata.expires = expires;
    }

    /// Validate the role and fill in defaults left empty by hand-written input.
    ///
    /// The name becomes a path segment in the backend, so it must be
    /// non-empty and free of `/`.
    pub fn check_and_set_defaults(&mut self) -> Result<(), MarshalError> {
        if self.kind != KIND_ROLE {
            return Err(MarshalError::UnexpectedKind(self.kind.clone()));
        }
        if self.version != V1 {
            return Err(MarshalError::UnsupportedVersion(self.version.clone()));
        }

        let name = &self.metadata.name;
        if name.is_empty() {
            return Err(MarshalError::InvalidRole("missing role name".to_string()));
        }
        if name.contains('/') {
            return Err(MarshalError::InvalidRole(format!(
                "role name '{name}' must not contain '/'"
            )));
        }

        if self.spec.max_session_ttl_secs == 0 {
            self.spec.max_session_ttl_secs = DEFAULT_MAX_SESSION_TTL_SECS;
        }
        if self.spec.namespaces.is_empty() {
            self.spec.namespaces = default_namespaces();
        }

        Ok(())
    }
}

impl ServiceRole for RoleV1 {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl fmt::Display for RoleV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Role({}, logins={:?})", self.metadata.name, self.spec.logins)
    }
}
