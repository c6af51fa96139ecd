//! Reconciler core.
//!
//! One pass for one object identity: fetch the Website, derive the target
//! resources, converge each in turn, classify the aggregate outcome. The
//! pass is level-triggered and idempotent - it recomputes everything from
//! the current cluster state, so duplicate or spurious triggers are
//! harmless.

use std::sync::Arc;

use tracing::{debug, info, warn};
use webctl_cluster::{ClusterClient, ObjectKey, Resource};

use crate::convergence::ConvergenceEngine;
use crate::outcome::{ConvergeError, ReconcileOutcome};
use crate::shutdown::ShutdownSignal;
use crate::template::{deployment_spec, service_spec};

/// Runs reconciliation passes for Website objects.
pub struct Reconciler {
    client: Arc<dyn ClusterClient>,
    engine: ConvergenceEngine,
}

impl Reconciler {
    /// Create a new reconciler sharing the given cluster client.
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        let engine = ConvergenceEngine::new(client.clone());
        Self { client, engine }
    }

    /// Run one reconciliation pass for the given identity.
    ///
    /// Resources are converged sequentially. A fatal failure stops the
    /// pass immediately; a retryable one is remembered and the remaining
    /// resources are still attempted, since convergence of each resource
    /// is independent and idempotent. Nothing converged earlier is rolled
    /// back on failure - a later pass completes the rest.
    pub async fn reconcile(&self, key: &ObjectKey, shutdown: &ShutdownSignal) -> ReconcileOutcome {
        let website = match self.client.get_website(key).await {
            Ok(website) => website,
            Err(error) if error.is_not_found() => {
                // Deletion signal. Managed resources are not cleaned up;
                // documented limitation of this controller.
                info!(key = %key, "website no longer exists, nothing to converge");
                return ReconcileOutcome::Converged;
            }
            Err(error) => {
                return ReconcileOutcome::retryable(format!("fetching website '{key}': {error}"))
            }
        };

        info!(key = %key, image_tag = %website.spec.image_tag, "reconciling website");

        let targets = [
            Resource::Deployment(deployment_spec(key, &website.spec.image_tag)),
            Resource::Service(service_spec(key)),
        ];

        let mut retry_reason: Option<String> = None;

        for target in targets {
            if shutdown.is_shutdown() {
                return ReconcileOutcome::retryable("shutdown observed mid-pass");
            }

            let kind = target.kind();
            match self.engine.ensure(target).await {
                Ok(convergence) => {
                    debug!(key = %key, %kind, convergence = ?convergence, "resource converged");
                }
                Err(ConvergeError::Retryable { reason }) => {
                    warn!(key = %key, %kind, %reason, "resource needs another pass");
                    retry_reason = Some(reason);
                }
                Err(ConvergeError::Fatal { reason }) => {
                    // Fail fast: the remaining resources are not attempted
                    // this pass; a retriggered pass re-attempts all of them.
                    return ReconcileOutcome::Fatal { reason };
                }
            }
        }

        match retry_reason {
            Some(reason) => ReconcileOutcome::Retryable { reason },
            None => ReconcileOutcome::Converged,
        }
    }
}
