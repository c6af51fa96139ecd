//! Level-triggered reconciliation core for Website objects.
//!
//! This crate implements the operator control loop:
//!
//! - **Desired state**: a user-authored `Website` object declaring an
//!   image tag.
//! - **Targets**: pure template builders derive the deployment and
//!   service specs that should exist for it.
//! - **Convergence**: each live resource is created or minimally patched
//!   toward its target; fields this operator does not own are never
//!   touched.
//! - **Dispatch**: a key-partitioned work queue collapses duplicate
//!   notifications and retries transient failures with backoff.
//!
//! Every pass recomputes full desired state from scratch, so re-delivered
//! or spurious notifications are harmless. Deleting a Website stops
//! reconciliation but does not garbage-collect the resources it created;
//! that is a documented limitation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use webctl_cluster::InMemoryCluster;
//! use webctl_controller::{Dispatcher, DispatcherConfig, Reconciler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cluster = InMemoryCluster::new_arc();
//!     let reconciler = Arc::new(Reconciler::new(cluster));
//!     let dispatcher = Arc::new(Dispatcher::new(reconciler, DispatcherConfig::default()));
//!
//!     let workers = dispatcher.run().await;
//!     // dispatcher.drive(watcher_stream).await;
//!     dispatcher.signal_shutdown();
//!     for worker in workers {
//!         let _ = worker.await;
//!     }
//! }
//! ```

pub mod convergence;
pub mod dispatcher;
pub mod outcome;
pub mod reconciler;
pub mod shutdown;
pub mod template;

// Re-export main types
pub use convergence::ConvergenceEngine;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use outcome::{Convergence, ConvergeError, ReconcileOutcome};
pub use reconciler::Reconciler;
pub use shutdown::{Shutdown, ShutdownSignal};
