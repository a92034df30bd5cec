use thiserror::Error;

/// Errors returned by key-value backends (used by the `Backend` trait in rolekeep-core).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    NotFound(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("backend connection error: {0}")]
    Connection(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

/// Errors from converting roles to and from their stored byte form.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("failed to serialize role: {0}")]
    Serialize(String),

    #[error("failed to deserialize role: {0}")]
    Deserialize(String),

    #[error("unsupported role version: '{0}'")]
    UnsupportedVersion(String),

    #[error("unexpected resource kind: '{0}'")]
    UnexpectedKind(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),
}

/// Errors returned by role store operations.
///
/// Callers branch on the kind: `BadParameter` means the request must be
/// fixed, `NotFound` means the role is absent, everything else is a broken
/// backend or a malformed stored record.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("{0}")]
    BadParameter(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error("unexpected stored record: {0}")]
    Unexpected(String),
}

impl RoleError {
    /// Wrap a backend failure with a short description of what was attempted.
    pub fn backend(context: impl Into<String>, source: BackendError) -> Self {
        RoleError::Backend {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            RoleError::NotFound(_) => true,
            RoleError::Backend { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn is_bad_parameter(&self) -> bool {
        match self {
            RoleError::BadParameter(_) => true,
            RoleError::Backend { source, .. } => {
                matches!(source, BackendError::BadParameter(_))
            }
            _ => false,
        }
    }
}
