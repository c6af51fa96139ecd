//! Managed resource shapes.
//!
//! These are the in-memory specifications of the resources the controller
//! keeps converged for each Website: one workload deployment and one
//! node-reachable service. They are derived fresh on every pass and never
//! persisted; the label maps use `BTreeMap` so that equal inputs always
//! serialize to identical bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ObjectKey;

/// Kind of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Workload deployment.
    Deployment,
    /// Network-exposing service.
    Service,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deployment => write!(f, "deployment"),
            Self::Service => write!(f, "service"),
        }
    }
}

/// Specification of the workload deployment for one Website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResource {
    /// Identity, derived from the Website identity.
    pub key: ObjectKey,
    /// Ownership label set stamped on the resource.
    pub labels: BTreeMap<String, String>,
    /// Label selector for the pods this deployment manages.
    pub selector: BTreeMap<String, String>,
    /// Number of replicas.
    pub replicas: i32,
    /// Name of the single container.
    pub container_name: String,
    /// Full container image reference (`<repository>:<tag>`).
    pub image: String,
    /// Port exposed by the container.
    pub container_port: u16,
}

/// Specification of the node-reachable service for one Website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResource {
    /// Identity, derived from the Website identity.
    pub key: ObjectKey,
    /// Ownership label set stamped on the resource.
    pub labels: BTreeMap<String, String>,
    /// Selector linking the service to the deployment's pods.
    pub selector: BTreeMap<String, String>,
    /// Service port.
    pub port: u16,
    /// Fixed externally reachable node port.
    pub node_port: u16,
}

/// A managed resource of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    /// Workload deployment.
    Deployment(DeploymentResource),
    /// Network-exposing service.
    Service(ServiceResource),
}

impl Resource {
    /// Get the identity of this resource.
    pub fn key(&self) -> &ObjectKey {
        match self {
            Self::Deployment(d) => &d.key,
            Self::Service(s) => &s.key,
        }
    }

    /// Get the kind of this resource.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::Service(_) => ResourceKind::Service,
        }
    }
}

/// A field-scoped partial update.
///
/// The controller owns exactly one field on the resources it manages; this
/// type is the complete enumeration of what a patch may touch. Anything a
/// patch cannot express, the controller cannot clobber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPatch {
    /// Replace the container image reference on a deployment.
    ContainerImage(String),
}
