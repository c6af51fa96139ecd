//! Core identity and desired-state types.

use serde::{Deserialize, Serialize};

/// Identity of a namespaced cluster object.
///
/// Every object this operator touches - the Website itself and the
/// resources derived from it - is addressed by the same (namespace, name)
/// pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Namespace the object lives in.
    pub namespace: String,
    /// Object name within the namespace.
    pub name: String,
}

impl ObjectKey {
    /// Create a new object key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// User-declared spec of a Website.
///
/// The `image_tag` pattern (`^[-a-z0-9]*$`) is enforced upstream by schema
/// validation; an empty string is a conforming value and must not break a
/// pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteSpec {
    /// Tag of the container image to deploy.
    pub image_tag: String,
}

/// A Website object as read from the cluster.
///
/// Read-only to the controller: users create, update, and delete these,
/// and the cluster state store owns them. A fetched copy is immutable for
/// the duration of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    /// Object identity.
    pub key: ObjectKey,
    /// Declared desired state.
    pub spec: WebsiteSpec,
}

impl Website {
    /// Create a website with the given identity and image tag.
    pub fn new(key: ObjectKey, image_tag: impl Into<String>) -> Self {
        Self {
            key,
            spec: WebsiteSpec {
                image_tag: image_tag.into(),
            },
        }
    }
}
