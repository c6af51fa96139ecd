//! Cluster-facing data model and client boundary for the Website operator.
//!
//! This crate owns everything that crosses the cluster boundary:
//!
//! - **Identity**: [`ObjectKey`], the (namespace, name) pair every object
//!   is addressed by.
//! - **Desired state**: [`Website`], the user-authored declaration.
//! - **Managed resources**: [`Resource`] and the per-kind specs the
//!   controller keeps converged.
//! - **Errors**: the classified taxonomy ([`Error`]) every cluster call
//!   resolves into before the controller sees it.
//! - **Client**: the [`ClusterClient`] trait, plus [`InMemoryCluster`]
//!   for tests and local runs.

pub mod client;
pub mod error;
pub mod memory;
pub mod resource;
pub mod types;

// Re-export main types
pub use client::ClusterClient;
pub use error::{Error, Result};
pub use memory::InMemoryCluster;
pub use resource::{DeploymentResource, FieldPatch, Resource, ResourceKind, ServiceResource};
pub use types::{ObjectKey, Website, WebsiteSpec};
