//! Runtime wiring derivation — from a built context to per-instance
//! start specs.
//!
//! Every outbound connection's selector is instantiated through the
//! registry here, so a deployment with an unknown grouping or an
//! incomplete selector configuration fails before any instance starts.

use flowgrid_select::SelectorRegistry;
use flowgrid_topology::NetworkContext;
use tracing::debug;

use crate::error::ClusterResult;
use crate::supervisor::{InputPortSpec, InstanceSpec, OutputPortSpec};

/// Derive one start spec per component instance, with the resolved
/// addresses and selector configurations from the context.
pub fn instance_specs(
    context: &NetworkContext,
    registry: &SelectorRegistry,
) -> ClusterResult<Vec<InstanceSpec>> {
    let mut specs = Vec::new();

    for component in context.components() {
        for port in component.output.ports.values() {
            for connection in &port.connections {
                registry.instantiate(&connection.selector)?;
            }
        }

        let inputs: Vec<InputPortSpec> = component
            .input
            .ports
            .values()
            .map(|port| InputPortSpec {
                port: port.name.clone(),
                connections: port.connections.clone(),
            })
            .collect();
        let outputs: Vec<OutputPortSpec> = component
            .output
            .ports
            .values()
            .map(|port| OutputPortSpec {
                port: port.name.clone(),
                connections: port.connections.clone(),
            })
            .collect();

        for instance in 1..=component.instances {
            specs.push(InstanceSpec {
                network: context.name().to_string(),
                component: component.name.clone(),
                identifier: component.identifier.clone(),
                instance,
                config: component.config.clone(),
                worker: component.worker,
                multi_threaded: component.multi_threaded,
                resources: component.resources.clone(),
                inputs: inputs.clone(),
                outputs: outputs.clone(),
            });
        }
    }

    debug!(
        network = %context.name(),
        instances = specs.len(),
        "instance specs derived"
    );
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use flowgrid_topology::{ComponentConfig, NetworkConfig, SelectorConfig};

    fn pipeline_context() -> NetworkContext {
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
        NetworkContext::from_config(config).unwrap()
    }

    #[test]
    fn one_spec_per_instance() {
        let context = pipeline_context();
        let specs = instance_specs(&context, &SelectorRegistry::new()).unwrap();

        assert_eq!(specs.len(), 3);
        let b_instances: Vec<u32> = specs
            .iter()
            .filter(|spec| spec.component == "b")
            .map(|spec| spec.instance)
            .collect();
        assert_eq!(b_instances, vec![1, 2]);
    }

    #[test]
    fn specs_carry_resolved_wiring() {
        let context = pipeline_context();
        let specs = instance_specs(&context, &SelectorRegistry::new()).unwrap();

        let a = specs.iter().find(|spec| spec.component == "a").unwrap();
        assert_eq!(a.identifier, "unit:a");
        assert_eq!(a.outputs.len(), 1);
        assert_eq!(a.outputs[0].connections[0].address, "pipeline.b.in");
        assert_eq!(
            a.outputs[0].connections[0].selector,
            SelectorConfig::fields("user")
        );

        let b = specs.iter().find(|spec| spec.component == "b").unwrap();
        assert_eq!(b.inputs.len(), 1);
        assert_eq!(b.inputs[0].connections[0].source.component, "a");
    }

    #[test]
    fn unknown_grouping_fails_derivation() {
        let mut config = NetworkConfig::new("net");
        config.add_component(ComponentConfig::new("a", "unit:a").output_port("out"));
        config.add_component(ComponentConfig::new("b", "unit:b").input_port("in"));
        config
            .connect("a", "out")
            .selector(SelectorConfig::new("stickiness"))
            .to("b", "in");
        let context = NetworkContext::from_config(config).unwrap();

        let err = instance_specs(&context, &SelectorRegistry::new()).unwrap_err();
        assert!(matches!(err, ClusterError::Selector(_)));
    }
}
