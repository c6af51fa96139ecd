//! Convergence engine.
//!
//! Brings a single live resource to its target specification: create it if
//! it is missing, patch the one owned field if it drifted, accept the rest
//! as-is. Create-first keeps the common path to a single cluster call and
//! makes re-delivery harmless.

use std::sync::Arc;

use tracing::{debug, info};
use webctl_cluster::{
    ClusterClient, DeploymentResource, Error as ClusterError, FieldPatch, Resource, ResourceKind,
};

use crate::outcome::{Convergence, ConvergeError};

/// Converges one live resource to one target specification.
pub struct ConvergenceEngine {
    client: Arc<dyn ClusterClient>,
}

impl ConvergenceEngine {
    /// Create a new convergence engine.
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Ensure the cluster holds a resource matching `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvergeError::Retryable`] on concurrent-modification
    /// signals (conflicts, a delete racing this pass, patch failures) and
    /// [`ConvergeError::Fatal`] on structural rejection (quota, validation,
    /// permission).
    pub async fn ensure(&self, target: Resource) -> Result<Convergence, ConvergeError> {
        let key = target.key().clone();
        let kind = target.kind();

        match self.client.create(target.clone()).await {
            Ok(()) => {
                info!(key = %key, %kind, "created resource");
                Ok(Convergence::Created)
            }
            Err(ClusterError::AlreadyExists { .. }) => match target {
                Resource::Deployment(deployment) => self.converge_deployment(deployment).await,
                Resource::Service(_) => {
                    // Service drift is never corrected after creation.
                    debug!(key = %key, "service already exists");
                    Ok(Convergence::Unchanged)
                }
            },
            Err(ClusterError::PortAllocated { port }) => {
                // Steady-state signal for the service; the port mapping is
                // not re-examined once something holds it.
                info!(key = %key, port, "node port already allocated, treating as converged");
                Ok(Convergence::Unchanged)
            }
            Err(ClusterError::Conflict { reason, .. }) => Err(ConvergeError::retryable(reason)),
            Err(error @ ClusterError::Invalid { .. }) => Err(ConvergeError::fatal(format!(
                "creating {kind} '{key}': {error}"
            ))),
            // Transport failures and other oddities are worth another pass;
            // only structural rejection stalls the key.
            Err(error) => Err(ConvergeError::retryable(format!(
                "creating {kind} '{key}': {error}"
            ))),
        }
    }

    /// Converge an existing deployment.
    ///
    /// Compares only the container image reference, the one field this
    /// operator owns. Everything else on the live resource belongs to other
    /// actors and is left alone.
    async fn converge_deployment(
        &self,
        target: DeploymentResource,
    ) -> Result<Convergence, ConvergeError> {
        let key = &target.key;

        let live = match self.client.get(key, ResourceKind::Deployment).await {
            Ok(Resource::Deployment(live)) => live,
            Ok(other) => {
                return Err(ConvergeError::fatal(format!(
                    "fetched '{key}' expecting a deployment, got a {}",
                    other.kind()
                )))
            }
            Err(error) if error.is_not_found() => {
                // A delete raced this pass; the next pass recreates it.
                return Err(ConvergeError::retryable(format!(
                    "deployment '{key}' disappeared mid-pass"
                )));
            }
            Err(error) => return Err(ConvergeError::retryable(error.to_string())),
        };

        if live.image == target.image {
            debug!(key = %key, image = %live.image, "deployment image already matches");
            return Ok(Convergence::Unchanged);
        }

        info!(
            key = %key,
            from = %live.image,
            to = %target.image,
            "image drift detected, patching"
        );

        self.client
            .patch(
                key,
                ResourceKind::Deployment,
                FieldPatch::ContainerImage(target.image),
            )
            .await
            .map(|()| Convergence::Patched)
            .map_err(|error| ConvergeError::retryable(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;
    use crate::template::{deployment_spec, service_spec};
    use webctl_cluster::{InMemoryCluster, ObjectKey};

    fn key() -> ObjectKey {
        ObjectKey::new("default", "blog")
    }

    #[tokio::test]
    async fn test_creates_missing_deployment() {
        let cluster = InMemoryCluster::new_arc();
        let engine = ConvergenceEngine::new(cluster.clone());

        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert_eq!(result, Ok(Convergence::Created));
        let live = cluster.deployment(&key()).await.unwrap();
        assert_eq!(live.image, "abangser/todo-local-storage:v2");
    }

    #[tokio::test]
    async fn test_patches_drifted_image_only() {
        let cluster = InMemoryCluster::new_arc();
        let mut live = deployment_spec(&key(), "v1");
        live.labels
            .insert("team".to_string(), "platform".to_string());
        cluster.seed_deployment(live).await;

        let engine = ConvergenceEngine::new(cluster.clone());
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert_eq!(result, Ok(Convergence::Patched));
        let live = cluster.deployment(&key()).await.unwrap();
        assert_eq!(live.image, "abangser/todo-local-storage:v2");
        // The foreign label survives: only the image field is owned.
        assert_eq!(live.labels.get("team").map(String::as_str), Some("platform"));
    }

    #[tokio::test]
    async fn test_matching_deployment_is_unchanged() {
        let cluster = InMemoryCluster::new_arc();
        cluster.seed_deployment(deployment_spec(&key(), "v2")).await;

        let engine = ConvergenceEngine::new(cluster.clone());
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert_eq!(result, Ok(Convergence::Unchanged));
        assert_eq!(cluster.mutations(), 0);
    }

    #[tokio::test]
    async fn test_patch_conflict_is_retryable() {
        let cluster = InMemoryCluster::new_arc();
        cluster.seed_deployment(deployment_spec(&key(), "v1")).await;
        cluster
            .fail_next_patch(webctl_cluster::Error::conflict(
                ResourceKind::Deployment,
                &key(),
                "resource version mismatch",
            ))
            .await;

        let engine = ConvergenceEngine::new(cluster);
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert!(matches!(result, Err(ConvergeError::Retryable { .. })));
    }

    #[tokio::test]
    async fn test_raced_delete_is_retryable() {
        let cluster = InMemoryCluster::new_arc();
        // Create reports the resource exists, but it is gone by the time
        // the live copy is fetched.
        cluster
            .fail_next_create(webctl_cluster::Error::already_exists(
                ResourceKind::Deployment,
                &key(),
            ))
            .await;

        let engine = ConvergenceEngine::new(cluster);
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert!(matches!(result, Err(ConvergeError::Retryable { .. })));
    }

    #[tokio::test]
    async fn test_port_collision_is_converged() {
        let cluster = InMemoryCluster::new_arc();
        cluster
            .claim_node_port(31000, ObjectKey::new("other", "tenant"))
            .await;

        let engine = ConvergenceEngine::new(cluster.clone());
        let result = engine.ensure(Resource::Service(service_spec(&key()))).await;

        assert_eq!(result, Ok(Convergence::Unchanged));
        assert!(cluster.service(&key()).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_create_is_fatal() {
        let cluster = InMemoryCluster::new_arc();
        cluster
            .fail_next_create(webctl_cluster::Error::invalid(
                ResourceKind::Deployment,
                &key(),
                "exceeded quota",
            ))
            .await;

        let engine = ConvergenceEngine::new(cluster);
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        assert!(matches!(result, Err(ConvergeError::Fatal { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure_on_create_is_retryable() {
        let cluster = InMemoryCluster::new_arc();
        cluster
            .fail_next_create(webctl_cluster::Error::Internal(
                "transport reset by peer".to_string(),
            ))
            .await;

        let engine = ConvergenceEngine::new(cluster.clone());
        let result = engine
            .ensure(Resource::Deployment(deployment_spec(&key(), "v2")))
            .await;

        // Not structural: the next pass may well succeed.
        assert!(matches!(result, Err(ConvergeError::Retryable { .. })));
        assert!(cluster.deployment(&key()).await.is_none());
    }
}
