//! Errors raised by the setup and teardown workflows.

use thiserror::Error;

use crate::heketi::HeketiError;
use crate::remote::ExecError;

/// Errors surfaced while provisioning or decommissioning a cluster.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Raised when the selected cluster is not known to the service.
    #[error("Cluster {cluster} not found on Heketi server.")]
    ClusterNotFound {
        /// Cluster identifier that was looked up; empty when none was given.
        cluster: String,
    },
    /// Raised when a host command succeeds but prints nothing usable.
    #[error("unexpected output from {host}: {message}")]
    UnexpectedOutput {
        /// Host that ran the command.
        host: String,
        /// What was expected.
        message: String,
    },
    /// Raised when the same host is listed more than once.
    #[error("host {host} is listed more than once")]
    DuplicateHost {
        /// Repeated host name.
        host: String,
    },
    /// Raised when a host ends up with fewer loop devices than requested.
    #[error("host {host} has {actual} loop devices, expected {expected}")]
    IncompleteAllocation {
        /// Host whose allocation is short.
        host: String,
        /// Devices requested per host.
        expected: usize,
        /// Devices actually created.
        actual: usize,
    },
    /// Raised when the workflow is interrupted before a host command.
    #[error("provisioning cancelled")]
    Cancelled,
    /// Raised when a host command fails.
    #[error(transparent)]
    Remote(#[from] ExecError),
    /// Raised when a Heketi call fails.
    #[error(transparent)]
    Heketi(#[from] HeketiError),
}
