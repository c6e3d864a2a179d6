//! Immutable context tree — the built, validated form of a network
//! configuration, shared read-only across the orchestrator and the
//! per-instance runtime wiring.
//!
//! Contexts are constructed only by
//! [`crate::builder::NetworkContextBuilder`]; cloning a context yields a
//! structurally equal, independent copy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::builder::NetworkContextBuilder;
use crate::config::NetworkConfig;
use crate::connection::{SelectorConfig, SourceInfo, TargetInfo};
use crate::error::{TopologyError, TopologyResult};

/// Resolved inbound wiring for one connection: the address this input
/// listens on plus the identity of the peer that sends to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConnectionContext {
    pub address: String,
    pub source: SourceInfo,
}

/// Resolved outbound wiring for one connection: the address messages
/// are delivered to, the identity of the receiving peer, and the
/// selector deciding which target instance receives each message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConnectionContext {
    pub address: String,
    pub target: TargetInfo,
    pub selector: SelectorConfig,
}

/// An inbound port and the connections delivering into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPortInfo {
    pub name: String,
    #[serde(default)]
    pub connections: Vec<InputConnectionContext>,
}

/// An outbound port and the connections it dispatches into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPortInfo {
    pub name: String,
    #[serde(default)]
    pub connections: Vec<OutputConnectionContext>,
}

/// A component's inbound ports, keyed by port name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputInfo {
    pub ports: BTreeMap<String, InputPortInfo>,
}

impl InputInfo {
    /// Pre-populate empty port infos for the declared port names.
    pub fn with_ports<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            ports: names
                .into_iter()
                .map(|name| {
                    (
                        name.clone(),
                        InputPortInfo {
                            name: name.clone(),
                            connections: Vec::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn port(&self, name: &str) -> Option<&InputPortInfo> {
        self.ports.get(name)
    }
}

/// A component's outbound ports, keyed by port name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub ports: BTreeMap<String, OutputPortInfo>,
}

impl OutputInfo {
    /// Pre-populate empty port infos for the declared port names.
    pub fn with_ports<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            ports: names
                .into_iter()
                .map(|name| {
                    (
                        name.clone(),
                        OutputPortInfo {
                            name: name.clone(),
                            connections: Vec::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn port(&self, name: &str) -> Option<&OutputPortInfo> {
        self.ports.get(name)
    }
}

/// The built form of one component: a named processing role with its
/// resolved input/output wiring and deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentContext {
    /// Network-unique component name; the basis for derived addresses.
    pub name: String,
    /// Deployable unit identifier handed to the process supervisor.
    pub identifier: String,
    /// Free-form configuration passed to each instance.
    #[serde(default)]
    pub config: Value,
    /// Whether instances run worker-isolated rather than co-located.
    #[serde(default)]
    pub worker: bool,
    /// Whether a worker runs multi-threaded.
    #[serde(default, rename = "multi-threaded")]
    pub multi_threaded: bool,
    /// Opaque resource tags distributed with the component.
    #[serde(default)]
    pub resources: BTreeSet<String>,
    /// Number of instances to start.
    pub instances: u32,
    /// Resolved inbound ports.
    #[serde(default)]
    pub input: InputInfo,
    /// Resolved outbound ports.
    #[serde(default)]
    pub output: OutputInfo,
    /// Owning network name. A lookup relation, not a lifetime
    /// dependency; stamped by the builder and absent from the wire form.
    #[serde(skip)]
    pub network: String,
}

/// The immutable, versioned representation of a deployed network's
/// complete structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkContext {
    name: String,
    version: u64,
    config: NetworkConfig,
    #[serde(with = "components_as_list")]
    components: BTreeMap<String, ComponentContext>,
}

impl NetworkContext {
    /// Returns a new network context builder.
    pub fn builder() -> NetworkContextBuilder {
        NetworkContextBuilder::new()
    }

    /// Returns a builder staged with an existing context, for
    /// incremental edits and redeployment.
    pub fn builder_from(context: &NetworkContext) -> NetworkContextBuilder {
        NetworkContextBuilder::from_context(context)
    }

    /// Build a context directly from a configuration graph at version 1.
    pub fn from_config(config: NetworkConfig) -> TopologyResult<Self> {
        Self::builder().set_config(config).build()
    }

    pub(crate) fn assemble(
        name: String,
        version: u64,
        config: NetworkConfig,
        components: BTreeMap<String, ComponentContext>,
    ) -> Self {
        Self {
            name,
            version,
            config,
            components,
        }
    }

    /// The cluster-unique network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context version, bumped on redeploy with changed configuration.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The configuration graph this context was built from.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentContext> {
        self.components.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Non-failing probe for a component name.
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Exact-match component lookup.
    pub fn component(&self, name: &str) -> TopologyResult<&ComponentContext> {
        self.components
            .get(name)
            .ok_or_else(|| TopologyError::NotFound(name.to_string()))
    }

    /// Canonical human-readable dump, pretty or compact. Diagnostics
    /// only; does not affect equality or identity.
    pub fn to_string_formatted(&self, formatted: bool) -> String {
        let rendered = if formatted {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        rendered.unwrap_or_default()
    }
}

impl fmt::Display for NetworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_formatted(false))
    }
}

/// Components serialize as a `components[]` list on the wire; in memory
/// they are a map keyed by component name.
mod components_as_list {
    use super::ComponentContext;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        components: &BTreeMap<String, ComponentContext>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(components.len()))?;
        for component in components.values() {
            seq.serialize_element(component)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<String, ComponentContext>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let components = Vec::<ComponentContext>::deserialize(deserializer)?;
        Ok(components
            .into_iter()
            .map(|component| (component.name.clone(), component))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentConfig, NetworkConfig};

    fn built_context() -> NetworkContext {
        let mut config = NetworkConfig::new("net");
        config.add_component(ComponentConfig::new("a", "unit:a").output_port("out"));
        config.add_component(
            ComponentConfig::new("b", "unit:b")
                .instances(2)
                .input_port("in"),
        );
        config.connect("a", "out").to("b", "in");
        NetworkContext::from_config(config).unwrap()
    }

    #[test]
    fn component_lookup_and_probe() {
        let context = built_context();
        assert_eq!(context.component_count(), 2);
        assert!(context.has_component("a"));
        assert!(!context.has_component("missing"));
        assert_eq!(context.component("b").unwrap().instances, 2);
        assert!(matches!(
            context.component("missing"),
            Err(TopologyError::NotFound(_))
        ));
    }

    #[test]
    fn clone_is_structurally_equal_and_independent() {
        let context = built_context();
        let copy = context.clone();
        assert_eq!(context, copy);
        drop(context);
        assert!(copy.has_component("a"));
    }

    #[test]
    fn formatted_dump_is_pretty_compact_is_not() {
        let context = built_context();
        let pretty = context.to_string_formatted(true);
        let compact = context.to_string_formatted(false);
        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
        // Same document either way.
        let a: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        let b: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wire_form_uses_component_list_and_renamed_flags() {
        let context = built_context();
        let doc: serde_json::Value =
            serde_json::from_str(&context.to_string_formatted(false)).unwrap();
        assert_eq!(doc["name"], "net");
        assert_eq!(doc["version"], 1);
        let components = doc["components"].as_array().unwrap();
        assert_eq!(components.len(), 2);
        assert!(components[0].get("multi-threaded").is_some());
        assert!(components[0].get("identifier").is_some());
    }

    #[test]
    fn backreference_names_owning_network() {
        let context = built_context();
        for component in context.components() {
            assert_eq!(component.network, "net");
        }
    }
}
