//! Mutable network configuration — the staging graph an operator builds
//! incrementally before snapshotting it into an immutable context tree.
//!
//! Nothing here is validated eagerly: component and connection edits
//! mutate only the staging area, and every invariant is checked when the
//! configuration is frozen by [`crate::builder::NetworkContextBuilder`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::{ConnectionInfo, SelectorConfig, SourceInfo, TargetInfo};

/// Configuration for one processing component of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    name: String,
    /// Deployable unit identifier. Required for all components.
    identifier: String,
    /// Free-form configuration passed to each instance.
    #[serde(default)]
    config: Value,
    /// Whether instances run worker-isolated rather than co-located.
    #[serde(default)]
    worker: bool,
    /// Whether a worker runs multi-threaded. Only meaningful with `worker`.
    #[serde(default, rename = "multi-threaded")]
    multi_threaded: bool,
    /// Opaque resource tags distributed with the component when clustering.
    #[serde(default)]
    resources: BTreeSet<String>,
    /// Number of instances to start.
    instances: u32,
    /// Declared inbound port names.
    #[serde(default)]
    input_ports: BTreeSet<String>,
    /// Declared outbound port names.
    #[serde(default)]
    output_ports: BTreeSet<String>,
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            config: Value::Null,
            worker: false,
            multi_threaded: false,
            resources: BTreeSet::new(),
            instances: 1,
            input_ports: BTreeSet::new(),
            output_ports: BTreeSet::new(),
        }
    }

    // ── Fluent staging ─────────────────────────────────────────────

    /// Set the free-form instance configuration.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Mark the component worker-isolated.
    pub fn worker(mut self, worker: bool) -> Self {
        self.worker = worker;
        self
    }

    /// Mark a worker component multi-threaded.
    pub fn multi_threaded(mut self, multi_threaded: bool) -> Self {
        self.multi_threaded = multi_threaded;
        self
    }

    /// Set the instance count.
    pub fn instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }

    /// Declare an inbound port.
    pub fn input_port(mut self, port: impl Into<String>) -> Self {
        self.input_ports.insert(port.into());
        self
    }

    /// Declare an outbound port.
    pub fn output_port(mut self, port: impl Into<String>) -> Self {
        self.output_ports.insert(port.into());
        self
    }

    /// Attach a resource tag.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.insert(resource.into());
        self
    }

    // ── In-place edits ─────────────────────────────────────────────

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    pub fn set_config(&mut self, config: Value) {
        self.config = config;
    }

    pub fn set_instances(&mut self, instances: u32) {
        self.instances = instances;
    }

    pub fn add_resource(&mut self, resource: impl Into<String>) {
        self.resources.insert(resource.into());
    }

    pub fn remove_resource(&mut self, resource: &str) -> bool {
        self.resources.remove(resource)
    }

    pub fn set_resources(&mut self, resources: impl IntoIterator<Item = String>) {
        self.resources = resources.into_iter().collect();
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn is_worker(&self) -> bool {
        self.worker
    }

    pub fn is_multi_threaded(&self) -> bool {
        self.multi_threaded
    }

    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    pub fn instance_count(&self) -> u32 {
        self.instances
    }

    pub fn input_ports(&self) -> &BTreeSet<String> {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &BTreeSet<String> {
        &self.output_ports
    }
}

/// A named graph of components and connections — the deployable unit of
/// topology, staged mutably and frozen by `build()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    name: String,
    /// Reliability-collaborator count. Carried as configuration only;
    /// the core never acts on it.
    #[serde(default)]
    auditors: u32,
    #[serde(default)]
    components: BTreeMap<String, ComponentConfig>,
    #[serde(default)]
    connections: Vec<ConnectionInfo>,
}

impl NetworkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auditors: 0,
            components: BTreeMap::new(),
            connections: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the auditor count for the external reliability collaborator.
    pub fn set_auditors(&mut self, auditors: u32) {
        self.auditors = auditors;
    }

    pub fn auditors(&self) -> u32 {
        self.auditors
    }

    /// Stage a component, replacing any existing component of the same
    /// name. Returns a mutable handle for further edits.
    pub fn add_component(&mut self, component: ComponentConfig) -> &mut ComponentConfig {
        use std::collections::btree_map::Entry;
        match self.components.entry(component.name.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(component);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(component),
        }
    }

    /// Remove a staged component. Connections referencing it are kept;
    /// they fail validation at build time.
    pub fn remove_component(&mut self, name: &str) -> bool {
        self.components.remove(name).is_some()
    }

    pub fn component(&self, name: &str) -> Option<&ComponentConfig> {
        self.components.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentConfig> {
        self.components.get_mut(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentConfig> {
        self.components.values()
    }

    pub fn connections(&self) -> &[ConnectionInfo] {
        &self.connections
    }

    /// Begin wiring an outbound port. The returned source stage selects
    /// the selector and instance pin; its target stage fans out to one
    /// or more target components.
    pub fn connect(&mut self, component: impl Into<String>, port: impl Into<String>) -> ConnectionSource<'_> {
        ConnectionSource {
            network: self,
            source: SourceInfo::new(component, port),
            selector: SelectorConfig::default(),
        }
    }
}

/// Source stage of the connection protocol: the outbound endpoint plus
/// the selector every fanned-out target inherits.
pub struct ConnectionSource<'a> {
    network: &'a mut NetworkConfig,
    source: SourceInfo,
    selector: SelectorConfig,
}

impl<'a> ConnectionSource<'a> {
    /// Pin the source to a single instance (1-based).
    pub fn instance(mut self, instance: u32) -> Self {
        self.source.instance = instance;
        self
    }

    /// Set the selector inherited by every target of this source.
    pub fn selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    /// Wire the first target and move to the fan-out stage.
    pub fn to(self, component: impl Into<String>, port: impl Into<String>) -> ConnectionTargets<'a> {
        ConnectionTargets {
            network: self.network,
            source: self.source,
            selector: self.selector,
        }
        .to(component, port)
    }

    /// Wire the first target to a pinned instance (1-based) and move to
    /// the fan-out stage.
    pub fn to_instance(
        self,
        component: impl Into<String>,
        port: impl Into<String>,
        instance: u32,
    ) -> ConnectionTargets<'a> {
        ConnectionTargets {
            network: self.network,
            source: self.source,
            selector: self.selector,
        }
        .to_instance(component, port, instance)
    }
}

/// Target stage of the connection protocol. Each `to` call materializes
/// an independent connection sharing the source identity and inheriting
/// the source's selector unless a target-specific override is supplied.
pub struct ConnectionTargets<'a> {
    network: &'a mut NetworkConfig,
    source: SourceInfo,
    selector: SelectorConfig,
}

impl ConnectionTargets<'_> {
    fn push(&mut self, target: TargetInfo, selector: SelectorConfig) {
        self.network
            .connections
            .push(ConnectionInfo::new(self.source.clone(), target, selector));
    }

    /// Fan out to another target, inheriting the source's selector.
    pub fn to(mut self, component: impl Into<String>, port: impl Into<String>) -> Self {
        self.push(TargetInfo::new(component, port), self.selector.clone());
        self
    }

    /// Fan out to a pinned target instance (1-based).
    pub fn to_instance(
        mut self,
        component: impl Into<String>,
        port: impl Into<String>,
        instance: u32,
    ) -> Self {
        let mut target = TargetInfo::new(component, port);
        target.instance = instance;
        self.push(target, self.selector.clone());
        self
    }

    /// Fan out to another target with a target-specific selector override.
    pub fn to_with(
        mut self,
        component: impl Into<String>,
        port: impl Into<String>,
        selector: SelectorConfig,
    ) -> Self {
        self.push(TargetInfo::new(component, port), selector);
        self
    }
}
