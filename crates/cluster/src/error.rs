//! Classified cluster errors.
//!
//! Every call on the cluster boundary returns an error already sorted into
//! the taxonomy the reconciler acts on. Nothing downstream inspects error
//! text; classification happens once, here.

use thiserror::Error;

use crate::resource::ResourceKind;
use crate::types::ObjectKey;

/// Result type alias for cluster operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified cluster error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested object does not exist.
    ///
    /// Usually benign: a missing Website means the object was deleted, a
    /// missing managed resource means it has not been created yet (or a
    /// delete raced with the current pass).
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: ObjectKey },

    /// A resource with the same identity already exists.
    ///
    /// The expected steady-state answer to a create, not a failure.
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    /// Concurrent modification detected (resource-version mismatch).
    #[error("conflict writing {kind} '{key}': {reason}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        reason: String,
    },

    /// The request was structurally rejected (schema, quota, permission).
    #[error("invalid {kind} '{key}': {reason}")]
    Invalid {
        kind: ResourceKind,
        key: ObjectKey,
        reason: String,
    },

    /// The requested external port is already allocated to another object.
    #[error("port {port} is already allocated")]
    PortAllocated { port: u16 },

    /// Transport or state-store failure outside the taxonomy above.
    #[error("cluster call failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a not-found error for a Website object.
    pub fn website_not_found(key: &ObjectKey) -> Self {
        Self::NotFound {
            kind: "website".to_string(),
            key: key.clone(),
        }
    }

    /// Create a not-found error for a managed resource.
    pub fn resource_not_found(kind: ResourceKind, key: &ObjectKey) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            key: key.clone(),
        }
    }

    /// Create an already-exists error.
    pub fn already_exists(kind: ResourceKind, key: &ObjectKey) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.clone(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(kind: ResourceKind, key: &ObjectKey, reason: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid(kind: ResourceKind, key: &ObjectKey, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a not-found classification.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
