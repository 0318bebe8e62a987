//! Setup and teardown of a Heketi cluster backed by loop devices.
//!
//! Setup allocates file-backed loop devices on every host first and only
//! then registers nodes and devices with Heketi, so a host that cannot
//! allocate stops the run before the service is touched. Teardown walks the
//! cluster from volumes down to nodes, releasing each device's loop device
//! on every storage host right after Heketi forgets it.
//!
//! Both workflows abort on the first failure.

use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::{Action, Config};
use crate::heketi::{
    ClusterInfo, ClusterList, DeviceAddRequest, HeketiError, Hostnames, HttpTransport, JobPoller,
    Method, NodeAddRequest, NodeInfo,
};
use crate::remote::{CommandRunner, RemoteExecutor};
use crate::report::{self, SharedReporter};

mod error;
mod loop_device;

pub use error::ProvisionError;
pub use loop_device::{
    LoopAllocation, backing_file_command, backing_file_prefix, create_command, detach_command,
    remove_command,
};

/// Failure zone assigned to every node added by setup.
pub const NODE_ZONE: u32 = 1;

/// Result of a successful setup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetupSummary {
    /// Cluster the nodes joined.
    pub cluster: String,
    /// Whether the cluster was created by this run.
    pub created_cluster: bool,
    /// Loop devices created per host.
    pub allocation: LoopAllocation,
    /// Identifiers of the nodes added, in host order.
    pub nodes: Vec<String>,
    /// Number of devices registered.
    pub devices: usize,
}

/// Result of a successful teardown.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TeardownSummary {
    /// Cluster that was deleted.
    pub cluster: String,
    /// Volumes deleted.
    pub volumes: usize,
    /// Devices deleted.
    pub devices: usize,
    /// Loop devices detached across all storage hosts.
    pub loop_devices: usize,
    /// Nodes deleted.
    pub nodes: usize,
}

/// Outcome of [`Provisioner::run`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Setup completed.
    Setup(SetupSummary),
    /// Teardown completed.
    Teardown(TeardownSummary),
}

/// Drives setup and teardown through a job poller and a remote executor.
#[derive(Debug)]
pub struct Provisioner<T, R: CommandRunner> {
    poller: JobPoller<T>,
    executor: RemoteExecutor<R>,
    cancel: CancelToken,
    reporter: SharedReporter,
}

impl<T, R> Provisioner<T, R>
where
    T: HttpTransport,
    R: CommandRunner,
{
    /// Creates a provisioner that reports nothing and is never cancelled.
    #[must_use]
    pub fn new(poller: JobPoller<T>, executor: RemoteExecutor<R>) -> Self {
        Self {
            poller,
            executor,
            cancel: CancelToken::new(),
            reporter: report::silent(),
        }
    }

    /// Checks `cancel` before every host command.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replaces the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Lists the clusters known to the service and runs the configured
    /// action against them.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when listing or the selected workflow
    /// fails.
    pub async fn run(&self, config: &Config) -> Result<Outcome, ProvisionError> {
        let clusters = self.list_clusters().await?;
        match config.action {
            Action::Setup => self.setup(&clusters, config).await.map(Outcome::Setup),
            Action::Teardown => self
                .teardown(&clusters, config)
                .await
                .map(Outcome::Teardown),
        }
    }

    /// Returns the identifiers of every cluster known to the service.
    ///
    /// # Errors
    ///
    /// Returns [`HeketiError`] when the request fails or the body cannot be
    /// decoded.
    pub async fn list_clusters(&self) -> Result<Vec<String>, HeketiError> {
        let response = self
            .poller
            .client()
            .checked(Method::Get, "clusters", None)
            .await?;
        let list: ClusterList = response.json("cluster list")?;
        Ok(list.clusters)
    }

    /// Creates loop devices on every host and registers them with Heketi.
    ///
    /// `clusters` is the catalog returned by [`Provisioner::list_clusters`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::DuplicateHost`] before anything runs when a
    /// host is listed twice, [`ProvisionError::ClusterNotFound`] when a
    /// UUID-shaped cluster id is not in the catalog, [`ProvisionError::UnexpectedOutput`] when
    /// loop device creation prints no device, and propagates host command
    /// and Heketi failures.
    pub async fn setup(
        &self,
        clusters: &[String],
        config: &Config,
    ) -> Result<SetupSummary, ProvisionError> {
        if let Some(host) = config.repeated_host() {
            return Err(ProvisionError::DuplicateHost {
                host: host.to_owned(),
            });
        }
        let size = config.size.as_deref().unwrap_or_default();
        let (cluster, created_cluster) = self
            .resolve_cluster(clusters, config.cluster.as_deref())
            .await?;
        self.reporter.report(&format!("Using cluster {cluster}"));

        let allocation = self.allocate(&cluster, size, config)?;

        let mut nodes = Vec::with_capacity(config.hosts.len());
        let mut devices = 0;
        for host in &config.hosts {
            let node = self.add_node(&cluster, host).await?;
            for device in allocation.devices(host) {
                self.add_device(&node.id, device).await?;
                devices += 1;
            }
            nodes.push(node.id);
        }

        Ok(SetupSummary {
            cluster,
            created_cluster,
            allocation,
            nodes,
            devices,
        })
    }

    /// Deletes every volume, device and node of the configured cluster,
    /// releasing loop devices on the storage hosts, then deletes the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ClusterNotFound`] when the configured
    /// cluster is unset or not in `clusters`, and propagates host command
    /// and Heketi failures.
    pub async fn teardown(
        &self,
        clusters: &[String],
        config: &Config,
    ) -> Result<TeardownSummary, ProvisionError> {
        let cluster_id = config
            .cluster
            .as_deref()
            .filter(|id| clusters.iter().any(|known| known == id))
            .ok_or_else(|| ProvisionError::ClusterNotFound {
                cluster: config.cluster.clone().unwrap_or_default(),
            })?;

        let client = self.poller.client();
        let cluster_path = format!("clusters/{cluster_id}");
        let cluster: ClusterInfo = client
            .checked(Method::Get, &cluster_path, None)
            .await?
            .json("cluster")?;

        let mut summary = TeardownSummary {
            cluster: cluster_id.to_owned(),
            ..TeardownSummary::default()
        };

        for volume in &cluster.volumes {
            self.poller.delete(&format!("volumes/{volume}")).await?;
            summary.volumes += 1;
        }

        for node_id in &cluster.nodes {
            let node: NodeInfo = client
                .checked(Method::Get, &format!("nodes/{node_id}"), None)
                .await?
                .json("node")?;
            for device in &node.devices {
                self.poller.delete(&format!("devices/{}", device.id)).await?;
                summary.devices += 1;
                for host in &node.hostnames.storage {
                    self.release(host, &device.name)?;
                    summary.loop_devices += 1;
                }
            }
            self.poller.delete(&format!("nodes/{node_id}")).await?;
            summary.nodes += 1;
        }

        client.checked(Method::Delete, &cluster_path, None).await?;
        Ok(summary)
    }

    async fn resolve_cluster(
        &self,
        clusters: &[String],
        requested: Option<&str>,
    ) -> Result<(String, bool), ProvisionError> {
        if let Some(id) = requested {
            if clusters.iter().any(|known| known == id) {
                return Ok((id.to_owned(), false));
            }
            if is_uuid_shaped(id) {
                return Err(ProvisionError::ClusterNotFound {
                    cluster: id.to_owned(),
                });
            }
        }

        let created: ClusterInfo = self
            .poller
            .client()
            .checked(Method::Post, "clusters", None)
            .await?
            .json("created cluster")?;
        Ok((created.id, true))
    }

    fn allocate(
        &self,
        cluster: &str,
        size: &str,
        config: &Config,
    ) -> Result<LoopAllocation, ProvisionError> {
        let command = create_command(cluster, size);
        let expected = usize::try_from(config.devices).unwrap_or(usize::MAX);
        let mut allocation = LoopAllocation::new();
        for host in &config.hosts {
            for _ in 0..config.devices {
                self.ensure_active()?;
                let output = self.executor.execute(host, &command)?;
                let device = output.stdout.trim();
                if device.is_empty() {
                    return Err(ProvisionError::UnexpectedOutput {
                        host: host.clone(),
                        message: String::from("losetup printed no loop device"),
                    });
                }
                allocation.push(host, device.to_owned());
            }

            let actual = allocation.devices(host).len();
            if actual != expected {
                return Err(ProvisionError::IncompleteAllocation {
                    host: host.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(allocation)
    }

    async fn add_node(&self, cluster: &str, host: &str) -> Result<NodeInfo, ProvisionError> {
        let request = NodeAddRequest {
            zone: NODE_ZONE,
            hostnames: Hostnames::single(host),
            cluster: cluster.to_owned(),
        };
        let node = self.poller.post("nodes", &request).await?.json("node")?;
        Ok(node)
    }

    async fn add_device(&self, node: &str, device: &str) -> Result<(), ProvisionError> {
        let request = DeviceAddRequest {
            node: node.to_owned(),
            name: device.to_owned(),
        };
        self.poller.post("devices", &request).await?;
        Ok(())
    }

    fn release(&self, host: &str, device: &str) -> Result<(), ProvisionError> {
        self.ensure_active()?;
        let output = self.executor.execute(host, &backing_file_command(device))?;
        let backing_file = output.stdout.trim().to_owned();

        self.ensure_active()?;
        self.executor.execute(host, &detach_command(device))?;

        // Heketi has already dropped the device, so detach even without a file to remove.
        if backing_file.is_empty() {
            return Err(ProvisionError::UnexpectedOutput {
                host: host.to_owned(),
                message: format!("no backing file reported for {device}"),
            });
        }
        self.ensure_active()?;
        self.executor.execute(host, &remove_command(&backing_file))?;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), ProvisionError> {
        if self.cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        Ok(())
    }
}

/// Returns `true` when `id` reads as 8-4-4-4-12 hex groups, where each
/// hyphen between groups is optional.
#[must_use]
pub fn is_uuid_shaped(id: &str) -> bool {
    let mut compact = String::with_capacity(32);
    let mut rest = id;
    for (index, width) in [8, 4, 4, 4, 12].into_iter().enumerate() {
        if index > 0 {
            rest = rest.strip_prefix('-').unwrap_or(rest);
        }
        let Some((group, tail)) = rest.split_at_checked(width) else {
            return false;
        };
        compact.push_str(group);
        rest = tail;
    }
    rest.is_empty() && Uuid::try_parse(&compact).is_ok()
}

#[cfg(test)]
mod tests;
