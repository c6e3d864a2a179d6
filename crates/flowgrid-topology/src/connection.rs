//! Connection descriptors — source/target endpoints, selector
//! configuration, and deterministic address derivation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Grouping discriminator for the random selector.
pub const GROUPING_RANDOM: &str = "random";
/// Grouping discriminator for the consistent-hash fields selector.
pub const GROUPING_FIELDS: &str = "fields";
/// Grouping discriminator for the round-robin selector.
pub const GROUPING_ROUND_ROBIN: &str = "round-robin";
/// Grouping discriminator for the broadcast selector.
pub const GROUPING_BROADCAST: &str = "broadcast";

/// Derive the deterministic address of a component port endpoint.
///
/// The form is `network.component.port`, with a trailing `.instance`
/// segment when the endpoint pins a single instance (instances are
/// numbered from 1; 0 means unpinned).
pub fn endpoint_address(network: &str, component: &str, port: &str, instance: u32) -> String {
    if instance == 0 {
        format!("{network}.{component}.{port}")
    } else {
        format!("{network}.{component}.{port}.{instance}")
    }
}

/// The component/port endpoint a connection originates from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub component: String,
    pub port: String,
    /// Pinned instance (1-based). Zero covers all instances.
    #[serde(default)]
    pub instance: u32,
}

impl SourceInfo {
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            instance: 0,
        }
    }

    /// The resolved address of this endpoint within the given network.
    pub fn address(&self, network: &str) -> String {
        endpoint_address(network, &self.component, &self.port, self.instance)
    }
}

/// The component/port endpoint a connection delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub component: String,
    pub port: String,
    /// Pinned instance (1-based). Zero covers all instances.
    #[serde(default)]
    pub instance: u32,
}

impl TargetInfo {
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            instance: 0,
        }
    }

    /// The resolved address of this endpoint within the given network.
    pub fn address(&self, network: &str) -> String {
        endpoint_address(network, &self.component, &self.port, self.instance)
    }
}

/// Selection strategy attached to a connection.
///
/// `grouping` discriminates the strategy; `params` carries any
/// strategy-specific parameters (the fields grouping stores the hashed
/// field name under [`SelectorConfig::FIELD_PARAM`]). This plain
/// key-value form is what gets persisted and shipped to remote nodes,
/// so a redeployed network restores its selection behavior without
/// re-specifying it in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub grouping: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl SelectorConfig {
    /// Parameter key under which the fields grouping stores its field name.
    pub const FIELD_PARAM: &'static str = "field";

    pub fn new(grouping: impl Into<String>) -> Self {
        Self {
            grouping: grouping.into(),
            params: BTreeMap::new(),
        }
    }

    /// Attach a strategy-specific parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Uniform random selection of a single target connection.
    pub fn random() -> Self {
        Self::new(GROUPING_RANDOM)
    }

    /// Consistent-hash selection on the named message field.
    pub fn fields(field: impl Into<String>) -> Self {
        Self::new(GROUPING_FIELDS).with_param(Self::FIELD_PARAM, field)
    }

    /// Cycling selection across target connections.
    pub fn round_robin() -> Self {
        Self::new(GROUPING_ROUND_ROBIN)
    }

    /// Selection of every target connection.
    pub fn broadcast() -> Self {
        Self::new(GROUPING_BROADCAST)
    }

    /// Look up a strategy parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self::round_robin()
    }
}

/// A directed wiring between a source component/port and a target
/// component/port, carrying the selector that decides which target
/// receives each message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub source: SourceInfo,
    pub target: TargetInfo,
    pub selector: SelectorConfig,
}

impl ConnectionInfo {
    pub fn new(source: SourceInfo, target: TargetInfo, selector: SelectorConfig) -> Self {
        Self {
            source,
            target,
            selector,
        }
    }
}
