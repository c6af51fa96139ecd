//! Cluster client trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::resource::{FieldPatch, Resource, ResourceKind};
use crate::types::{ObjectKey, Website};

/// Trait for the cluster state store.
///
/// The real transport (API server, auth, caching) lives behind this trait;
/// the controller only ever sees classified results. A single shared client
/// is injected into every component at construction, so tests swap in
/// [`InMemoryCluster`](crate::memory::InMemoryCluster) without touching the
/// reconciliation code.
///
/// Consistency is optimistic: `patch` is rejected with
/// [`Error::Conflict`](crate::error::Error::Conflict) when the resource
/// changed since it was read, and callers are expected to retry a full
/// pass rather than resolve the conflict locally.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a Website object by identity.
    async fn get_website(&self, key: &ObjectKey) -> Result<Website>;

    /// Fetch a live managed resource by identity and kind.
    async fn get(&self, key: &ObjectKey, kind: ResourceKind) -> Result<Resource>;

    /// Create a resource exactly as specified.
    async fn create(&self, resource: Resource) -> Result<()>;

    /// Apply a field-scoped partial update to a live resource.
    ///
    /// Only the field named by the patch is written; everything else on the
    /// live resource is left untouched.
    async fn patch(&self, key: &ObjectKey, kind: ResourceKind, patch: FieldPatch) -> Result<()>;
}
