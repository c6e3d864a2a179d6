//! Local cluster manager — deploys every instance through a single
//! in-process supervisor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use flowgrid_select::SelectorRegistry;
use flowgrid_topology::{NetworkConfig, NetworkContext};

use crate::error::{ClusterError, ClusterResult};
use crate::manager::{
    ClusterManager, Deployment, LifecycleTokens, VersionHistory, start_instances, stop_instances,
};
use crate::supervisor::Supervisor;
use crate::wiring::instance_specs;

/// Manages network lifecycles within a single process: one supervisor
/// starts and stops every component instance.
pub struct LocalClusterManager {
    supervisor: Arc<dyn Supervisor>,
    registry: Arc<SelectorRegistry>,
    deployments: Arc<RwLock<HashMap<String, Deployment>>>,
    tokens: Arc<LifecycleTokens>,
    history: VersionHistory,
}

impl LocalClusterManager {
    pub fn new(supervisor: Arc<dyn Supervisor>) -> Self {
        Self {
            supervisor,
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

    /// Whether a deployment is currently tracked under the name.
    pub async fn is_deployed(&self, network: &str) -> bool {
        self.deployments.read().await.contains_key(network)
    }

    /// Names of all tracked deployments.
    pub async fn deployed_networks(&self) -> Vec<String> {
        self.deployments.read().await.keys().cloned().collect()
    }

    /// The built context of a tracked deployment.
    pub async fn context(&self, network: &str) -> Option<NetworkContext> {
        self.deployments
            .read()
            .await
            .get(network)
            .map(|deployment| deployment.context.clone())
    }

    /// Number of tracked instances for a deployment.
    pub async fn instance_count(&self, network: &str) -> Option<usize> {
        self.deployments
            .read()
            .await
            .get(network)
            .map(|deployment| deployment.instances.len())
    }
}

#[async_trait]
impl ClusterManager for LocalClusterManager {
    async fn deploy_network(&self, config: NetworkConfig) -> ClusterResult<NetworkContext> {
        let network = config.name().to_string();
        let _token = self.tokens.acquire(&network)?;

        if self.deployments.read().await.contains_key(&network) {
            return Err(ClusterError::Conflict(network));
        }

        let version = self.history.next_version(&config);
        let context = NetworkContext::builder()
            .set_config(config)
            .set_version(version)
            .build()?;
        let specs = instance_specs(&context, &self.registry)?;

        let supervisor = Arc::clone(&self.supervisor);
        let instances =
            start_instances(&network, &specs, |_| (None, Arc::clone(&supervisor))).await?;

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
            "network deployed"
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

        match stop_instances(network, deployment.instances, |_| {
            Some(Arc::clone(&self.supervisor))
        })
        .await
        {
            Ok(()) => {
                info!(%network, "network undeployed");
                Ok(())
            }
            Err((remaining, error)) => {
                warn!(
                    %network,
                    remaining = remaining.len(),
                    "teardown failed, re-tracking remaining instances"
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
