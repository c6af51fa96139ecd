//! Resource template builders.
//!
//! Pure functions mapping a Website to the exact specification of each
//! managed resource. All of this operator's business policy lives here:
//! the image repository, the replica count, and the port wiring. The rest
//! of the controller is generic plumbing.
//!
//! Determinism matters: the same (identity, imageTag) input must always
//! produce byte-identical specs, since the convergence engine relies on
//! value equality to decide whether anything needs to change.

use std::collections::BTreeMap;

use webctl_cluster::{DeploymentResource, ObjectKey, ServiceResource};

/// Image repository every Website deployment pulls from.
pub const IMAGE_REPOSITORY: &str = "abangser/todo-local-storage";

/// Replicas per deployment.
pub const REPLICAS: i32 = 2;

/// Name of the single container in each deployment.
pub const CONTAINER_NAME: &str = "nginx";

/// Port exposed by the container.
pub const CONTAINER_PORT: u16 = 80;

/// Service port.
pub const SERVICE_PORT: u16 = 80;

/// Fixed externally reachable node port.
pub const NODE_PORT: u16 = 31000;

/// Build the ownership label set for a Website name.
///
/// Stamped on every managed resource and used as the sole selector
/// linking resources back to their Website.
pub fn resource_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("website".to_string(), name.to_string()),
        ("type".to_string(), "Website".to_string()),
    ])
}

/// Build the full container image reference for an image tag.
pub fn image_reference(image_tag: &str) -> String {
    format!("{IMAGE_REPOSITORY}:{image_tag}")
}

/// Build the deployment specification for a Website.
pub fn deployment_spec(key: &ObjectKey, image_tag: &str) -> DeploymentResource {
    DeploymentResource {
        key: key.clone(),
        labels: resource_labels(&key.name),
        selector: resource_labels(&key.name),
        replicas: REPLICAS,
        container_name: CONTAINER_NAME.to_string(),
        image: image_reference(image_tag),
        container_port: CONTAINER_PORT,
    }
}

/// Build the service specification for a Website.
pub fn service_spec(key: &ObjectKey) -> ServiceResource {
    ServiceResource {
        key: key.clone(),
        labels: resource_labels(&key.name),
        selector: resource_labels(&key.name),
        port: SERVICE_PORT,
        node_port: NODE_PORT,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_deployment_spec_is_deterministic() {
        let key = ObjectKey::new("default", "blog");
        let first = deployment_spec(&key, "v2");
        let second = deployment_spec(&key, "v2");

        assert_eq!(first, second);

        // Byte-for-byte, not just structurally equal.
        let first_bytes = serde_json::to_vec(&first).unwrap();
        let second_bytes = serde_json::to_vec(&second).unwrap();
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_service_spec_is_deterministic() {
        let key = ObjectKey::new("default", "blog");
        assert_eq!(service_spec(&key), service_spec(&key));
    }

    #[test]
    fn test_deployment_policy_fields() {
        let key = ObjectKey::new("default", "blog");
        let spec = deployment_spec(&key, "v2");

        assert_eq!(spec.replicas, 2);
        assert_eq!(spec.image, "abangser/todo-local-storage:v2");
        assert_eq!(spec.container_name, "nginx");
        assert_eq!(spec.container_port, 80);
    }

    #[test]
    fn test_service_policy_fields() {
        let key = ObjectKey::new("default", "blog");
        let spec = service_spec(&key);

        assert_eq!(spec.port, 80);
        assert_eq!(spec.node_port, 31000);
        assert_eq!(spec.selector, resource_labels("blog"));
    }

    #[test]
    fn test_ownership_labels() {
        let labels = resource_labels("blog");
        assert_eq!(labels.get("website").map(String::as_str), Some("blog"));
        assert_eq!(labels.get("type").map(String::as_str), Some("Website"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_empty_image_tag_builds() {
        // Empty string matches the upstream schema pattern; must not break.
        let key = ObjectKey::new("default", "blog");
        let spec = deployment_spec(&key, "");
        assert_eq!(spec.image, "abangser/todo-local-storage:");
    }
}
