//! flowgrid-topology — network topology model for FlowGrid.
//!
//! Translates a mutable network/component/connection configuration graph
//! into an immutable, internally consistent context tree, and supports
//! round-trip building (context → builder → context) for redeployment
//! with incremental edits.
//!
//! # Architecture
//!
//! ```text
//! NetworkConfig (mutable staging)
//!   ├── ComponentConfig (identifier, instances, declared ports, flags)
//!   └── ConnectionInfo (SourceInfo → TargetInfo + SelectorConfig)
//!        │
//!        ▼ NetworkContextBuilder::build() — validate + freeze
//! NetworkContext (immutable, versioned)
//!   └── ComponentContext
//!       ├── InputInfo  → InputPortInfo  → InputConnectionContext
//!       └── OutputInfo → OutputPortInfo → OutputConnectionContext
//! ```
//!
//! Addresses are deterministic strings of the form
//! `network.component.port[.instance]`; the built tree serializes to the
//! JSON document exchanged with remote cluster nodes.

pub mod builder;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;

pub use builder::NetworkContextBuilder;
pub use config::{ComponentConfig, ConnectionSource, ConnectionTargets, NetworkConfig};
pub use connection::{
    ConnectionInfo, GROUPING_BROADCAST, GROUPING_FIELDS, GROUPING_RANDOM, GROUPING_ROUND_ROBIN,
    SelectorConfig, SourceInfo, TargetInfo, endpoint_address,
};
pub use context::{
    ComponentContext, InputConnectionContext, InputInfo, InputPortInfo, NetworkContext,
    OutputConnectionContext, OutputInfo, OutputPortInfo,
};
pub use error::{TopologyError, TopologyResult};
