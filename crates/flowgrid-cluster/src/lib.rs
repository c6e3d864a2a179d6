//! flowgrid-cluster — deployment orchestration for FlowGrid networks.
//!
//! Converts a built `NetworkContext` into a running set of component
//! instances against a process-supervisor collaborator, and reverses
//! that mapping on demand. Lifecycle transitions are idempotent and
//! race-free per network name.
//!
//! # Architecture
//!
//! ```text
//! ClusterManager (trait)
//!   ├── LocalClusterManager — one supervisor, single process
//!   └── RemoteClusterManager — ClusterNode set, round-robin placement
//!        │
//!        ├── LifecycleTokens (one in-flight op per network name)
//!        ├── VersionHistory (bump on redeploy with changed config)
//!        └── Supervisor (collaborator seam)
//!            ├── start(InstanceSpec) → InstanceHandle
//!            └── stop(InstanceHandle)
//! ```
//!
//! Deploy failures roll back every already-started instance before the
//! call resolves; undeploy failures keep the not-yet-stopped instances
//! tracked so a retry targets only what is left.

pub mod error;
pub mod local;
pub mod manager;
pub mod remote;
pub mod supervisor;
pub mod wiring;

pub use error::{ClusterError, ClusterResult};
pub use local::LocalClusterManager;
pub use manager::ClusterManager;
pub use remote::{ClusterNode, RemoteClusterManager};
pub use supervisor::{InputPortSpec, InstanceHandle, InstanceSpec, OutputPortSpec, Supervisor};
pub use wiring::instance_specs;
