//! The cluster-manager contract and the shared lifecycle machinery:
//! per-name operation tokens, deployment tracking, version history,
//! and the start/rollback and stop/re-track instance loops used by the
//! local and remote managers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use flowgrid_topology::{NetworkConfig, NetworkContext};

use crate::error::{ClusterError, ClusterResult};
use crate::supervisor::{InstanceHandle, InstanceSpec, Supervisor};

/// Deploys and undeploys networks against a cluster, local or remote.
///
/// Both operations are asynchronous; the returned future resolves
/// exactly once, never synchronously within the call, and carries the
/// single aggregate result of the whole operation.
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// Build the configuration into a context and start one instance
    /// per component instance count, wiring ports with the resolved
    /// addresses. On any instance failure every already-started
    /// instance is stopped before the error is returned, leaving no
    /// partial deployment observable.
    async fn deploy_network(&self, config: NetworkConfig) -> ClusterResult<NetworkContext>;

    /// Stop every tracked instance of the network and clear its state.
    /// Fails with [`ClusterError::NotFound`] when nothing is tracked
    /// under the name. A teardown failure keeps the not-yet-stopped
    /// instances tracked, so the call is safe to repeat.
    async fn undeploy_network(&self, network: &str) -> ClusterResult<()>;
}

/// One running instance tracked by a manager, with the node that hosts
/// it (`None` for local deployments).
#[derive(Debug, Clone)]
pub(crate) struct TrackedInstance {
    pub node: Option<String>,
    pub handle: InstanceHandle,
}

/// Tracked state of one deployed network.
#[derive(Debug, Clone)]
pub(crate) struct Deployment {
    pub context: NetworkContext,
    pub instances: Vec<TrackedInstance>,
}

/// Per-network lifecycle tokens. At most one deploy/undeploy operation
/// may be in flight per name; a second concurrent call is rejected,
/// not queued. The token is released when its guard drops, on success
/// and failure paths alike.
#[derive(Default)]
pub(crate) struct LifecycleTokens {
    in_flight: Mutex<HashSet<String>>,
}

impl LifecycleTokens {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the token for a network name, failing with
    /// [`ClusterError::Conflict`] when an operation is already in
    /// flight.
    pub fn acquire(self: &Arc<Self>, network: &str) -> ClusterResult<LifecycleToken> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(network.to_string()) {
            return Err(ClusterError::Conflict(network.to_string()));
        }
        debug!(%network, "lifecycle token acquired");
        Ok(LifecycleToken {
            tokens: Arc::clone(self),
            network: network.to_string(),
        })
    }
}

/// Guard for an in-flight lifecycle operation.
pub(crate) struct LifecycleToken {
    tokens: Arc<LifecycleTokens>,
    network: String,
}

impl Drop for LifecycleToken {
    fn drop(&mut self) {
        let mut in_flight = self
            .tokens
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.network);
        debug!(network = %self.network, "lifecycle token released");
    }
}

/// Remembers the last built configuration and version per network name,
/// across undeploys: a redeploy with a changed configuration bumps the
/// version, an identical configuration keeps it.
#[derive(Default)]
pub(crate) struct VersionHistory {
    last: Mutex<HashMap<String, (u64, NetworkConfig)>>,
}

impl VersionHistory {
    pub fn next_version(&self, config: &NetworkConfig) -> u64 {
        let last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match last.get(config.name()) {
            None => 1,
            Some((version, previous)) if previous == config => *version,
            Some((version, _)) => version + 1,
        }
    }

    pub fn record(&self, config: &NetworkConfig, version: u64) {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.insert(config.name().to_string(), (version, config.clone()));
    }
}

/// Start every instance spec through its assigned supervisor. On the
/// first failure, all already-started instances are stopped in reverse
/// order and the supervisor error is returned.
pub(crate) async fn start_instances<F>(
    network: &str,
    specs: &[InstanceSpec],
    assign: F,
) -> ClusterResult<Vec<TrackedInstance>>
where
    F: Fn(usize) -> (Option<String>, Arc<dyn Supervisor>),
{
    let mut started: Vec<(Arc<dyn Supervisor>, TrackedInstance)> = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        let (node, supervisor) = assign(index);
        match supervisor.start(spec).await {
            Ok(handle) => {
                debug!(
                    %network,
                    component = %spec.component,
                    instance = spec.instance,
                    node = node.as_deref().unwrap_or("local"),
                    "instance started"
                );
                started.push((supervisor, TrackedInstance { node, handle }));
            }
            Err(error) => {
                warn!(
                    %network,
                    component = %spec.component,
                    instance = spec.instance,
                    %error,
                    started = started.len(),
                    "instance start failed, rolling back"
                );
                for (supervisor, tracked) in started.iter().rev() {
                    if let Err(stop_error) = supervisor.stop(&tracked.handle).await {
                        warn!(
                            %network,
                            component = %tracked.handle.component,
                            %stop_error,
                            "rollback stop failed"
                        );
                    }
                }
                return Err(ClusterError::Deployment(error));
            }
        }
    }

    Ok(started.into_iter().map(|(_, tracked)| tracked).collect())
}

/// Stop every tracked instance through its resolved supervisor.
/// Instances that fail to stop (or whose node cannot be resolved) are
/// returned so the caller can keep them tracked for a retry.
pub(crate) async fn stop_instances<F>(
    network: &str,
    instances: Vec<TrackedInstance>,
    resolve: F,
) -> Result<(), (Vec<TrackedInstance>, anyhow::Error)>
where
    F: Fn(&TrackedInstance) -> Option<Arc<dyn Supervisor>>,
{
    let mut remaining = Vec::new();
    let mut failures = 0usize;

    for tracked in instances {
        let Some(supervisor) = resolve(&tracked) else {
            warn!(
                %network,
                node = tracked.node.as_deref().unwrap_or("local"),
                "no supervisor for instance node, keeping it tracked"
            );
            failures += 1;
            remaining.push(tracked);
            continue;
        };
        match supervisor.stop(&tracked.handle).await {
            Ok(()) => {
                debug!(
                    %network,
                    component = %tracked.handle.component,
                    instance = tracked.handle.instance,
                    "instance stopped"
                );
            }
            Err(error) => {
                warn!(
                    %network,
                    component = %tracked.handle.component,
                    instance = tracked.handle.instance,
                    %error,
                    "instance stop failed"
                );
                failures += 1;
                remaining.push(tracked);
            }
        }
    }

    if remaining.is_empty() {
        Ok(())
    } else {
        let count = remaining.len();
        Err((
            remaining,
            anyhow::anyhow!("failed to stop {count} of the network's instances ({failures} errors)"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_topology::ComponentConfig;

    #[test]
    fn token_rejects_second_acquire_and_releases_on_drop() {
        let tokens = LifecycleTokens::new();

        let first = tokens.acquire("net").unwrap();
        assert!(matches!(
            tokens.acquire("net"),
            Err(ClusterError::Conflict(_))
        ));

        // Tokens for other names are independent.
        let _other = tokens.acquire("other").unwrap();

        drop(first);
        let _second = tokens.acquire("net").unwrap();
    }

    #[test]
    fn version_history_bumps_only_on_changed_config() {
        let history = VersionHistory::default();

        let mut config = NetworkConfig::new("net");
        config.add_component(ComponentConfig::new("a", "unit:a"));
        assert_eq!(history.next_version(&config), 1);
        history.record(&config, 1);

        // Identical configuration keeps the version.
        assert_eq!(history.next_version(&config), 1);

        config
            .component_mut("a")
            .unwrap()
            .set_config(serde_json::json!({"limit": 10}));
        assert_eq!(history.next_version(&config), 2);
        history.record(&config, 2);
        assert_eq!(history.next_version(&config), 2);
    }
}
