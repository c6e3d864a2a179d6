//! Remote cluster manager — deploys a network's instances across a set
//! of named nodes.
//!
//! Each node's supervisor hides the network round trips to that node.
//! A node may succeed starting its local share while another node
//! fails; the manager still reports one aggregate result and rolls
//! back every node that did succeed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use flowgrid_select::SelectorRegistry;
use flowgrid_topology::{NetworkConfig, NetworkContext};

use crate::error::{ClusterError, ClusterResult};
use crate::manager::{
    ClusterManager, Deployment, LifecycleTokens, TrackedInstance, VersionHistory, start_instances,
    stop_instances,
};
use crate::supervisor::Supervisor;
use crate::wiring::instance_specs;

/// A cluster node: a name plus the supervisor seam through which the
/// node starts and stops its share of instances.
#[derive(Clone)]
pub struct ClusterNode {
    name: String,
    supervisor: Arc<dyn Supervisor>,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>, supervisor: Arc<dyn Supervisor>) -> Self {
        Self {
            name: name.into(),
            supervisor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Manages network lifecycles across a fixed set of cluster nodes,
/// assigning instances round-robin and applying the same exactly-once
/// result and rollback guarantees as the local manager.
pub struct RemoteClusterManager {
    nodes: Vec<ClusterNode>,
    registry: Arc<SelectorRegistry>,
    deployments: Arc<RwLock<HashMap<String, Deployment>>>,
    tokens: Arc<LifecycleTokens>,
    history: VersionHistory,
}

impl RemoteClusterManager {
    pub fn new(nodes: Vec<ClusterNode>) -> Self {
        Self {
            nodes,
            registry: Arc::new(SelectorRegistry::new()),
            deployments: Arc::new(RwLock::new(HashMap::new())),
            tokens: LifecycleTokens::new(),
            history: VersionHistory::default(),
        }
    }

    /// Replace the selector registry used to validate outbound wiring.
    pub fn with_registry(mut self, registry: SelectorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a deployment is currently tracked under the name.
    pub async fn is_deployed(&self, network: &str) -> bool {
        self.deployments.read().await.contains_key(network)
    }

    /// The built context of a tracked deployment.
    pub async fn context(&self, network: &str) -> Option<NetworkContext> {
        self.deployments
            .read()
            .await
            .get(network)
            .map(|deployment| deployment.context.clone())
    }

    /// Node name → tracked instance count, for a deployment.
    pub async fn placement(&self, network: &str) -> Option<HashMap<String, usize>> {
        let deployments = self.deployments.read().await;
        let deployment = deployments.get(network)?;
        let mut placement: HashMap<String, usize> = HashMap::new();
        for tracked in &deployment.instances {
            let node = tracked.node.clone().unwrap_or_default();
            *placement.entry(node).or_default() += 1;
        }
        Some(placement)
    }

    fn supervisor_for(&self, tracked: &TrackedInstance) -> Option<Arc<dyn Supervisor>> {
        let node = tracked.node.as_deref()?;
        self.nodes
            .iter()
            .find(|candidate| candidate.name == node)
            .map(|candidate| Arc::clone(&candidate.supervisor))
    }
}

#[async_trait]
impl ClusterManager for RemoteClusterManager {
    async fn deploy_network(&self, config: NetworkConfig) -> ClusterResult<NetworkContext> {
        let network = config.name().to_string();
        let _token = self.tokens.acquire(&network)?;

        if self.nodes.is_empty() {
            return Err(ClusterError::Deployment(anyhow::anyhow!(
                "no cluster nodes available"
            )));
        }
        if self.deployments.read().await.contains_key(&network) {
            return Err(ClusterError::Conflict(network));
        }

        let version = self.history.next_version(&config);
        let context = NetworkContext::builder()
            .set_config(config)
            .set_version(version)
            .build()?;
        let specs = instance_specs(&context, &self.registry)?;

        let instances = start_instances(&network, &specs, |index| {
            let node = &self.nodes[index % self.nodes.len()];
            (Some(node.name.clone()), Arc::clone(&node.supervisor))
        })
        .await?;

        self.history.record(context.config(), version);
        self.deployments.write().await.insert(
            network.clone(),
            Deployment {
                context: context.clone(),
                instances,
            },
        );

        info!(
            %network,
            version,
            instances = specs.len(),
            nodes = self.nodes.len(),
            "network deployed across cluster"
        );
        Ok(context)
    }

    async fn undeploy_network(&self, network: &str) -> ClusterResult<()> {
        let _token = self.tokens.acquire(network)?;

        let deployment = self
            .deployments
            .write()
            .await
            .remove(network)
            .ok_or_else(|| ClusterError::NotFound(network.to_string()))?;
        let context = deployment.context.clone();

        match stop_instances(network, deployment.instances, |tracked| {
            self.supervisor_for(tracked)
        })
        .await
        {
            Ok(()) => {
                info!(%network, "network undeployed from cluster");
                Ok(())
            }
            Err((remaining, error)) => {
                warn!(
                    %network,
                    remaining = remaining.len(),
                    "cluster teardown failed, re-tracking remaining instances"
                );
                self.deployments.write().await.insert(
                    network.to_string(),
                    Deployment {
                        context,
                        instances: remaining,
                    },
                );
                Err(ClusterError::Deployment(error))
            }
        }
    }
}
