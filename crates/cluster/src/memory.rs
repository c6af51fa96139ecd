//! In-memory cluster for testing.
//!
//! Behaves like the real state store on the paths the controller exercises:
//! identity-keyed storage, resource versions bumped on every write, node
//! port allocation across objects, and classified errors. Fault injection
//! hooks let tests force a specific classified failure on the next create
//! or patch call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::client::ClusterClient;
use crate::error::{Error, Result};
use crate::resource::{DeploymentResource, FieldPatch, Resource, ResourceKind, ServiceResource};
use crate::types::{ObjectKey, Website};

/// A stored resource with its version counter.
#[derive(Debug, Clone)]
struct Stored<T> {
    resource: T,
    version: u64,
}

impl<T> Stored<T> {
    fn new(resource: T) -> Self {
        Self {
            resource,
            version: 1,
        }
    }
}

/// In-memory cluster state store.
#[derive(Default)]
pub struct InMemoryCluster {
    websites: RwLock<HashMap<ObjectKey, Website>>,
    deployments: RwLock<HashMap<ObjectKey, Stored<DeploymentResource>>>,
    services: RwLock<HashMap<ObjectKey, Stored<ServiceResource>>>,
    /// Node ports currently held, and by which object.
    node_ports: RwLock<HashMap<u16, ObjectKey>>,
    /// Count of state-changing writes made through the client.
    mutations: AtomicU64,
    fail_next_create: Mutex<Option<Error>>,
    fail_next_patch: Mutex<Option<Error>>,
}

impl InMemoryCluster {
    /// Create a new empty in-memory cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory cluster wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a Website object, as a user applying it would.
    pub async fn put_website(&self, website: Website) {
        let mut websites = self.websites.write().await;
        websites.insert(website.key.clone(), website);
    }

    /// Delete a Website object.
    pub async fn remove_website(&self, key: &ObjectKey) {
        let mut websites = self.websites.write().await;
        websites.remove(key);
    }

    /// Insert a live deployment directly, bypassing the client.
    ///
    /// Stands in for another actor having created or mutated the resource;
    /// does not count as a controller mutation.
    pub async fn seed_deployment(&self, resource: DeploymentResource) {
        let mut deployments = self.deployments.write().await;
        deployments.insert(resource.key.clone(), Stored::new(resource));
    }

    /// Mark a node port as held by an unrelated object.
    pub async fn claim_node_port(&self, port: u16, owner: ObjectKey) {
        let mut node_ports = self.node_ports.write().await;
        node_ports.insert(port, owner);
    }

    /// Get the live deployment for an identity, if any.
    pub async fn deployment(&self, key: &ObjectKey) -> Option<DeploymentResource> {
        let deployments = self.deployments.read().await;
        deployments.get(key).map(|s| s.resource.clone())
    }

    /// Get the live service for an identity, if any.
    pub async fn service(&self, key: &ObjectKey) -> Option<ServiceResource> {
        let services = self.services.read().await;
        services.get(key).map(|s| s.resource.clone())
    }

    /// Get the version of the live deployment for an identity.
    pub async fn deployment_version(&self, key: &ObjectKey) -> Option<u64> {
        let deployments = self.deployments.read().await;
        deployments.get(key).map(|s| s.version)
    }

    /// Number of state-changing writes issued through the client so far.
    ///
    /// Creates that fail (already exists, port allocated) and patches that
    /// fail do not count; this is the observable for idempotence tests.
    pub fn mutations(&self) -> u64 {
        self.mutations.load(Ordering::Relaxed)
    }

    /// Make the next `create` call fail with the given error.
    pub async fn fail_next_create(&self, error: Error) {
        let mut slot = self.fail_next_create.lock().await;
        *slot = Some(error);
    }

    /// Make the next `patch` call fail with the given error.
    pub async fn fail_next_patch(&self, error: Error) {
        let mut slot = self.fail_next_patch.lock().await;
        *slot = Some(error);
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_website(&self, key: &ObjectKey) -> Result<Website> {
        let websites = self.websites.read().await;
        websites
            .get(key)
            .cloned()
            .ok_or_else(|| Error::website_not_found(key))
    }

    async fn get(&self, key: &ObjectKey, kind: ResourceKind) -> Result<Resource> {
        match kind {
            ResourceKind::Deployment => {
                let deployments = self.deployments.read().await;
                deployments
                    .get(key)
                    .map(|s| Resource::Deployment(s.resource.clone()))
                    .ok_or_else(|| Error::resource_not_found(kind, key))
            }
            ResourceKind::Service => {
                let services = self.services.read().await;
                services
                    .get(key)
                    .map(|s| Resource::Service(s.resource.clone()))
                    .ok_or_else(|| Error::resource_not_found(kind, key))
            }
        }
    }

    async fn create(&self, resource: Resource) -> Result<()> {
        if let Some(error) = self.fail_next_create.lock().await.take() {
            return Err(error);
        }

        let key = resource.key().clone();
        let kind = resource.kind();

        match resource {
            Resource::Deployment(d) => {
                let mut deployments = self.deployments.write().await;
                if deployments.contains_key(&d.key) {
                    return Err(Error::already_exists(ResourceKind::Deployment, &d.key));
                }
                deployments.insert(d.key.clone(), Stored::new(d));
            }
            Resource::Service(s) => {
                let mut services = self.services.write().await;
                if services.contains_key(&s.key) {
                    return Err(Error::already_exists(ResourceKind::Service, &s.key));
                }
                let mut node_ports = self.node_ports.write().await;
                if let Some(holder) = node_ports.get(&s.node_port) {
                    if *holder != s.key {
                        return Err(Error::PortAllocated { port: s.node_port });
                    }
                }
                node_ports.insert(s.node_port, s.key.clone());
                services.insert(s.key.clone(), Stored::new(s));
            }
        }

        debug!(key = %key, %kind, "stored created resource");
        self.record_mutation();
        Ok(())
    }

    async fn patch(&self, key: &ObjectKey, kind: ResourceKind, patch: FieldPatch) -> Result<()> {
        if let Some(error) = self.fail_next_patch.lock().await.take() {
            return Err(error);
        }

        match (kind, patch) {
            (ResourceKind::Deployment, FieldPatch::ContainerImage(image)) => {
                let mut deployments = self.deployments.write().await;
                let stored = deployments
                    .get_mut(key)
                    .ok_or_else(|| Error::resource_not_found(kind, key))?;
                stored.resource.image = image;
                stored.version = stored.version.saturating_add(1);
                debug!(key = %key, version = stored.version, "patched deployment image");
            }
            (ResourceKind::Service, FieldPatch::ContainerImage(_)) => {
                return Err(Error::invalid(kind, key, "service has no patchable fields"));
            }
        }

        self.record_mutation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::collections::BTreeMap;

    use super::*;

    fn deployment(key: &ObjectKey, image: &str) -> DeploymentResource {
        DeploymentResource {
            key: key.clone(),
            labels: BTreeMap::new(),
            selector: BTreeMap::new(),
            replicas: 2,
            container_name: "nginx".to_string(),
            image: image.to_string(),
            container_port: 80,
        }
    }

    fn service(key: &ObjectKey, node_port: u16) -> ServiceResource {
        ServiceResource {
            key: key.clone(),
            labels: BTreeMap::new(),
            selector: BTreeMap::new(),
            port: 80,
            node_port,
        }
    }

    #[tokio::test]
    async fn test_create_then_duplicate_create() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("default", "blog");

        let first = cluster
            .create(Resource::Deployment(deployment(&key, "repo:v1")))
            .await;
        assert!(first.is_ok());

        let second = cluster
            .create(Resource::Deployment(deployment(&key, "repo:v1")))
            .await;
        assert_eq!(
            second,
            Err(Error::already_exists(ResourceKind::Deployment, &key))
        );
        assert_eq!(cluster.mutations(), 1);
    }

    #[tokio::test]
    async fn test_patch_bumps_version_and_only_image() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("default", "blog");
        let mut seeded = deployment(&key, "repo:v1");
        seeded
            .labels
            .insert("injected".to_string(), "elsewhere".to_string());
        cluster.seed_deployment(seeded).await;

        let result = cluster
            .patch(
                &key,
                ResourceKind::Deployment,
                FieldPatch::ContainerImage("repo:v2".to_string()),
            )
            .await;
        assert!(result.is_ok());

        let live = cluster.deployment(&key).await.unwrap();
        assert_eq!(live.image, "repo:v2");
        assert_eq!(live.labels.get("injected").map(String::as_str), Some("elsewhere"));
        assert_eq!(cluster.deployment_version(&key).await, Some(2));
    }

    #[tokio::test]
    async fn test_node_port_collision() {
        let cluster = InMemoryCluster::new();
        cluster
            .claim_node_port(31000, ObjectKey::new("other", "tenant"))
            .await;

        let key = ObjectKey::new("default", "blog");
        let result = cluster.create(Resource::Service(service(&key, 31000))).await;
        assert_eq!(result, Err(Error::PortAllocated { port: 31000 }));
        assert_eq!(cluster.mutations(), 0);
    }

    #[tokio::test]
    async fn test_fault_injection_fires_once() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("default", "blog");
        cluster.seed_deployment(deployment(&key, "repo:v1")).await;
        cluster
            .fail_next_patch(Error::conflict(
                ResourceKind::Deployment,
                &key,
                "version mismatch",
            ))
            .await;

        let patch = FieldPatch::ContainerImage("repo:v2".to_string());
        let first = cluster
            .patch(&key, ResourceKind::Deployment, patch.clone())
            .await;
        assert!(matches!(first, Err(Error::Conflict { .. })));

        let second = cluster.patch(&key, ResourceKind::Deployment, patch).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_get_website_not_found() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("default", "missing");
        let result = cluster.get_website(&key).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
