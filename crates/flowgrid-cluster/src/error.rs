//! Orchestrator error types.

use thiserror::Error;

/// Errors that can occur during network lifecycle operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No deployment is tracked under the given network name.
    #[error("network not found: {0}")]
    NotFound(String),

    /// A lifecycle operation is already in flight for the network, or
    /// the network is already deployed.
    #[error("conflicting lifecycle operation on network: {0}")]
    Conflict(String),

    /// The configuration graph failed to build into a context.
    #[error("topology error: {0}")]
    Topology(#[from] flowgrid_topology::TopologyError),

    /// A connection's selector configuration could not be instantiated.
    #[error("selector error: {0}")]
    Selector(#[from] flowgrid_select::SelectError),

    /// An instance start/stop failure reported by the supervisor
    /// collaborator.
    #[error("deployment failed: {0}")]
    Deployment(#[from] anyhow::Error),
}

pub type ClusterResult<T> = Result<T, ClusterError>;
