//! Request and response payloads for the Heketi REST API.
//!
//! Only the fields this tool reads or writes are modelled; unknown fields in
//! responses are ignored.

use serde::{Deserialize, Serialize};

/// Body of `GET clusters`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterList {
    /// Identifiers of every cluster known to the service.
    #[serde(default)]
    pub clusters: Vec<String>,
}

/// Body of `GET clusters/{id}` and `POST clusters`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterInfo {
    /// Cluster identifier.
    pub id: String,
    /// Identifiers of nodes in the cluster.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Identifiers of volumes in the cluster.
    #[serde(default)]
    pub volumes: Vec<String>,
}

/// Management and storage host names of a node.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hostnames {
    /// Names used to reach the node's management daemon.
    #[serde(default)]
    pub manage: Vec<String>,
    /// Names used for storage traffic.
    #[serde(default)]
    pub storage: Vec<String>,
}

impl Hostnames {
    /// Uses `host` for both roles.
    #[must_use]
    pub fn single(host: &str) -> Self {
        Self {
            manage: vec![host.to_owned()],
            storage: vec![host.to_owned()],
        }
    }
}

/// Device summary embedded in [`NodeInfo`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeviceInfo {
    /// Device identifier.
    pub id: String,
    /// Block device path on the node, for example `/dev/loop0`.
    pub name: String,
}

/// Body of `GET nodes/{id}` and the result of an async `POST nodes`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeInfo {
    /// Node identifier.
    pub id: String,
    /// Cluster the node belongs to.
    #[serde(default)]
    pub cluster: String,
    /// Host names of the node.
    #[serde(default)]
    pub hostnames: Hostnames,
    /// Devices registered on the node.
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

/// Body of `POST nodes`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeAddRequest {
    /// Failure zone.
    pub zone: u32,
    /// Host names of the new node.
    pub hostnames: Hostnames,
    /// Cluster to join.
    pub cluster: String,
}

/// Body of `POST devices`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeviceAddRequest {
    /// Node that owns the device.
    pub node: String,
    /// Block device path on the node.
    pub name: String,
}
