//! Topology error types.

use thiserror::Error;

/// Errors that can occur while building or querying a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// A lookup against a name that does not exist in the built tree.
    #[error("component not found: {0}")]
    NotFound(String),

    /// The staged configuration graph is malformed or incomplete.
    #[error("invalid topology: {0}")]
    Validation(String),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
