//! Role marshaling.
//!
//! The role store never looks inside stored bytes; it hands them to a
//! `RoleMarshaler`, which decides the encoding and the concrete role type.

use serde::Deserialize;

use rolekeep_types::error::MarshalError;
use rolekeep_types::role::{KIND_ROLE, RoleV1, ServiceRole, V1};

/// Converts roles to and from their stored byte form.
///
/// Implementations must be symmetric: unmarshaling the output of
/// `marshal_service_role` yields a role equal in every observable field to
/// the role that was written. Marshaling validates, so a role that could not
/// be read back is never encoded.
pub trait RoleMarshaler: Send + Sync {
    type Role: ServiceRole;

    fn marshal_service_role(&self, role: &Self::Role) -> Result<Vec<u8>, MarshalError>;

    fn unmarshal_service_role(&self, data: &[u8]) -> Result<Self::Role, MarshalError>;
}

/// JSON encoding of [`RoleV1`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRoleMarshaler;

/// Just enough of a resource to dispatch on its version before full decoding.
#[derive(Deserialize)]
struct ResourceHeader {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    version: String,
}

impl RoleMarshaler for JsonRoleMarshaler {
    type Role = RoleV1;

    /// Encodes the role with its defaults applied.
    ///
    /// Empty `namespaces` and a zero `max_session_ttl_secs` are stored as
    /// their defaults, which is what every later read returns.
    fn marshal_service_role(&self, role: &RoleV1) -> Result<Vec<u8>, MarshalError> {
        let mut role = role.clone();
        role.check_and_set_defaults()?;
        serde_json::to_vec(&role).map_err(|e| MarshalError::Serialize(e.to_string()))
    }

    fn unmarshal_service_role(&self, data: &[u8]) -> Result<RoleV1, MarshalError> {
        let header: ResourceHeader = serde_json::from_slice(data)
            .map_err(|e| MarshalError::Deserialize(e.to_string()))?;

        if header.version != V1 {
            return Err(MarshalError::UnsupportedVersion(header.version));
        }
        if header.kind != KIND_ROLE {
            return Err(MarshalError::UnexpectedKind(header.kind));
        }

        let mut role: RoleV1 = serde_json::from_slice(data)
            .map_err(|e| MarshalError::Deserialize(e.to_string()))?;
        role.check_and_set_defaults()?;
        Ok(role)
    }
}
