//! Process-supervisor collaborator seam.
//!
//! The orchestrator treats unit packaging and launch mechanics as
//! opaque: it hands the supervisor a fully resolved [`InstanceSpec`]
//! and receives an [`InstanceHandle`] back. Supervisor failures surface
//! as `anyhow::Error` and are wrapped into
//! [`crate::error::ClusterError::Deployment`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use flowgrid_topology::{InputConnectionContext, OutputConnectionContext};

/// Handle to one running component instance, issued by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    /// Supervisor-assigned instance id.
    pub id: String,
    pub network: String,
    pub component: String,
    /// Instance number within the component (1-based).
    pub instance: u32,
}

/// Inbound wiring for one port of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPortSpec {
    pub port: String,
    pub connections: Vec<InputConnectionContext>,
}

/// Outbound wiring for one port of one instance. Each connection
/// context carries its own selector configuration; the orchestrator
/// has already instantiated every one of them through the registry, so
/// the runtime unit can restore them without re-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPortSpec {
    pub port: String,
    pub connections: Vec<OutputConnectionContext>,
}

/// Everything the supervisor needs to start one component instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub network: String,
    pub component: String,
    /// Deployable unit identifier.
    pub identifier: String,
    /// Instance number within the component (1-based).
    pub instance: u32,
    /// Free-form configuration passed to the instance.
    pub config: Value,
    pub worker: bool,
    pub multi_threaded: bool,
    pub resources: BTreeSet<String>,
    pub inputs: Vec<InputPortSpec>,
    pub outputs: Vec<OutputPortSpec>,
}

/// Starts and stops component instances. Both operations are
/// asynchronous with single-completion semantics; remote
/// implementations hide their network round trips behind this seam.
#[async_trait]
pub trait Supervisor: Send + Sync {
    async fn start(&self, spec: &InstanceSpec) -> anyhow::Result<InstanceHandle>;

    async fn stop(&self, handle: &InstanceHandle) -> anyhow::Result<()>;
}
