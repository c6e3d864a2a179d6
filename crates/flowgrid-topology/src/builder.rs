//! Network context builder — stages components mutably, validates the
//! configuration graph, and freezes it into an immutable
//! [`NetworkContext`].
//!
//! The builder never exposes its staging area; every mutation happens
//! before `build()`, and a failed build produces no context.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::NetworkConfig;
use crate::context::{
    ComponentContext, InputConnectionContext, InputInfo, NetworkContext, OutputConnectionContext,
    OutputInfo,
};
use crate::error::{TopologyError, TopologyResult};

/// Builder for [`NetworkContext`] instances.
///
/// Obtained from [`NetworkContext::builder`] (empty) or
/// [`NetworkContext::builder_from`] (staged with an existing context for
/// round-trip editing). When no components are staged explicitly,
/// `build()` derives them from the attached configuration graph.
pub struct NetworkContextBuilder {
    name: Option<String>,
    version: u64,
    config: NetworkConfig,
    components: Vec<ComponentContext>,
}

impl NetworkContextBuilder {
    pub(crate) fn new() -> Self {
        Self {
            name: None,
            version: 1,
            config: NetworkConfig::new(""),
            components: Vec::new(),
        }
    }

    pub(crate) fn from_context(context: &NetworkContext) -> Self {
        Self {
            name: Some(context.name().to_string()),
            version: context.version(),
            config: context.config().clone(),
            components: context.components().cloned().collect(),
        }
    }

    /// Set the cluster-unique network name. Defaults to the
    /// configuration graph's name when unset.
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the context version.
    pub fn set_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Attach the originating configuration graph.
    pub fn set_config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    /// Stage a pre-built component context.
    pub fn add_component(mut self, component: ComponentContext) -> Self {
        self.components.push(component);
        self
    }

    /// Remove a staged component by name.
    pub fn remove_component(mut self, name: &str) -> Self {
        self.components.retain(|component| component.name != name);
        self
    }

    /// Replace the staged component set.
    pub fn set_components(mut self, components: Vec<ComponentContext>) -> Self {
        self.components = components;
        self
    }

    /// Validate the staged graph and freeze it into an immutable context.
    pub fn build(self) -> TopologyResult<NetworkContext> {
        let name = match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ if !self.config.name().is_empty() => self.config.name().to_string(),
            _ => {
                return Err(TopologyError::Validation(
                    "network name is required".to_string(),
                ));
            }
        };

        let staged = if self.components.is_empty() {
            derive_components(&name, &self.config)
        } else {
            self.components
        };

        let mut components: BTreeMap<String, ComponentContext> = BTreeMap::new();
        for mut component in staged {
            component.network = name.clone();
            let key = component.name.clone();
            if components.insert(key.clone(), component).is_some() {
                return Err(TopologyError::Validation(format!(
                    "duplicate component name: {key}"
                )));
            }
        }

        for component in components.values() {
            if component.identifier.is_empty() {
                return Err(TopologyError::Validation(format!(
                    "component {} is missing an identifier",
                    component.name
                )));
            }
            if component.instances == 0 {
                return Err(TopologyError::Validation(format!(
                    "component {} must have at least one instance",
                    component.name
                )));
            }
        }

        let mut address_pairs = BTreeSet::new();
        for connection in self.config.connections() {
            let source = components.get(&connection.source.component).ok_or_else(|| {
                TopologyError::Validation(format!(
                    "connection references unknown source component: {}",
                    connection.source.component
                ))
            })?;
            if source.output.port(&connection.source.port).is_none() {
                return Err(TopologyError::Validation(format!(
                    "component {} has no output port {}",
                    source.name, connection.source.port
                )));
            }
            if connection.source.instance > source.instances {
                return Err(TopologyError::Validation(format!(
                    "connection pins instance {} of component {}, which has {} instances",
                    connection.source.instance, source.name, source.instances
                )));
            }

            let target = components.get(&connection.target.component).ok_or_else(|| {
                TopologyError::Validation(format!(
                    "connection references unknown target component: {}",
                    connection.target.component
                ))
            })?;
            if target.input.port(&connection.target.port).is_none() {
                return Err(TopologyError::Validation(format!(
                    "component {} has no input port {}",
                    target.name, connection.target.port
                )));
            }
            if connection.target.instance > target.instances {
                return Err(TopologyError::Validation(format!(
                    "connection pins instance {} of component {}, which has {} instances",
                    connection.target.instance, target.name, target.instances
                )));
            }

            let pair = (
                connection.source.address(&name),
                connection.target.address(&name),
            );
            if !address_pairs.insert(pair.clone()) {
                return Err(TopologyError::Validation(format!(
                    "ambiguous connection address pair: {} -> {}",
                    pair.0, pair.1
                )));
            }
        }

        debug!(
            network = %name,
            version = self.version,
            components = components.len(),
            connections = self.config.connections().len(),
            "network context built"
        );

        Ok(NetworkContext::assemble(
            name,
            self.version,
            self.config,
            components,
        ))
    }
}

/// Derive component contexts from the configuration graph: one context
/// per component config, with declared ports resolved into connection
/// contexts carrying the deterministic addresses.
///
/// Connections referencing unknown components or undeclared ports are
/// left unresolved here; `build()` rejects them afterwards.
fn derive_components(network: &str, config: &NetworkConfig) -> Vec<ComponentContext> {
    let mut components: BTreeMap<String, ComponentContext> = config
        .components()
        .map(|component| {
            (
                component.name().to_string(),
                ComponentContext {
                    name: component.name().to_string(),
                    identifier: component.identifier().to_string(),
                    config: component.config().clone(),
                    worker: component.is_worker(),
                    multi_threaded: component.is_multi_threaded(),
                    resources: component.resources().clone(),
                    instances: component.instance_count(),
                    input: InputInfo::with_ports(component.input_ports()),
                    output: OutputInfo::with_ports(component.output_ports()),
                    network: network.to_string(),
                },
            )
        })
        .collect();

    for connection in config.connections() {
        let target_address = connection.target.address(network);

        if let Some(source) = components.get_mut(&connection.source.component)
            && let Some(port) = source.output.ports.get_mut(&connection.source.port)
        {
            port.connections.push(OutputConnectionContext {
                address: target_address.clone(),
                target: connection.target.clone(),
                selector: connection.selector.clone(),
            });
        }

        if let Some(target) = components.get_mut(&connection.target.component)
            && let Some(port) = target.input.ports.get_mut(&connection.target.port)
        {
            port.connections.push(InputConnectionContext {
                address: target_address,
                source: connection.source.clone(),
            });
        }
    }

    components.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentConfig;
    use crate::connection::SelectorConfig;

    fn pipeline_config() -> NetworkConfig {
        let mut config = NetworkConfig::new("pipeline");
        config.add_component(ComponentConfig::new("a", "unit:a").output_port("out"));
        config.add_component(
            ComponentConfig::new("b", "unit:b")
                .instances(2)
                .input_port("in"),
        );
        config
            .connect("a", "out")
            .selector(SelectorConfig::fields("user"))
            .to("b", "in");
        config
    }

    #[test]
    fn build_resolves_ports_and_addresses() {
        let context = NetworkContext::from_config(pipeline_config()).unwrap();

        let a = context.component("a").unwrap();
        let out = a.output.port("out").unwrap();
        assert_eq!(out.connections.len(), 1);
        assert_eq!(out.connections[0].address, "pipeline.b.in");
        assert_eq!(out.connections[0].target.component, "b");
        assert_eq!(out.connections[0].selector, SelectorConfig::fields("user"));

        let b = context.component("b").unwrap();
        let input = b.input.port("in").unwrap();
        assert_eq!(input.connections.len(), 1);
        assert_eq!(input.connections[0].address, "pipeline.b.in");
        assert_eq!(input.connections[0].source.component, "a");
    }

    #[test]
    fn unknown_target_component_fails_validation() {
        let mut config = pipeline_config();
        config.connect("a", "out").to("ghost", "in");
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn undeclared_port_fails_validation() {
        let mut config = pipeline_config();
        config.connect("a", "missing-port").to("b", "in");
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn missing_identifier_fails_validation() {
        let mut config = NetworkConfig::new("net");
        config.add_component(ComponentConfig::new("a", ""));
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn zero_instances_fails_validation() {
        let mut config = NetworkConfig::new("net");
        config.add_component(ComponentConfig::new("a", "unit:a").instances(0));
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn duplicate_staged_component_fails_validation() {
        let context = NetworkContext::from_config(pipeline_config()).unwrap();
        let duplicate = context.component("a").unwrap().clone();
        let err = NetworkContext::builder_from(&context)
            .add_component(duplicate)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn ambiguous_address_pair_fails_validation() {
        let mut config = pipeline_config();
        config.connect("a", "out").to("b", "in");
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn instance_pin_beyond_count_fails_validation() {
        let mut config = pipeline_config();
        config.connect("a", "out").to_instance("b", "in", 3);
        let err = NetworkContext::from_config(config).unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn missing_network_name_fails_validation() {
        let err = NetworkContext::builder().build().unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn removing_a_referenced_component_fails_validation() {
        let context = NetworkContext::from_config(pipeline_config()).unwrap();
        let err = NetworkContext::builder_from(&context)
            .remove_component("b")
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyError::Validation(_)));
    }

    #[test]
    fn round_trip_law() {
        let original = NetworkContext::from_config(pipeline_config()).unwrap();

        let wire = serde_json::to_string(&original).unwrap();
        let decoded: NetworkContext = serde_json::from_str(&wire).unwrap();
        let rebuilt = NetworkContext::builder_from(&decoded).build().unwrap();

        assert_eq!(original, rebuilt);
    }

    #[test]
    fn builder_preserves_version_across_round_trip() {
        let context = NetworkContext::builder()
            .set_config(pipeline_config())
            .set_version(4)
            .build()
            .unwrap();
        let rebuilt = NetworkContext::builder_from(&context).build().unwrap();
        assert_eq!(rebuilt.version(), 4);
    }
}
