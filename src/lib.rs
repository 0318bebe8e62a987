//! Core library for the `heketi-setup` tool.
//!
//! The crate prepares file-backed loop devices on a set of hosts and
//! registers them with a Heketi GlusterFS management service, or reverses
//! that work on teardown. Host commands run through a local shell or SSH;
//! Heketi calls carry a per-request signed token and long-running operations
//! follow the service's async job protocol.

pub mod cancel;
pub mod config;
pub mod heketi;
pub mod provision;
pub mod remote;
pub mod report;
pub mod test_support;

pub use cancel::CancelToken;
pub use config::{Action, Config, ConfigBuilder, ConfigError, ToolConfig};
pub use heketi::{
    CallLog, HeketiError, HttpTransport, JobPoller, PollPolicy, RecordingTransport,
    ReqwestTransport, SignedClient, TokenSigner,
};
pub use provision::{
    LoopAllocation, Outcome, ProvisionError, Provisioner, SetupSummary, TeardownSummary,
};
pub use remote::{
    CommandOutput, CommandRunner, ExecError, ProcessCommandRunner, RemoteExecutor, RemoteOutput,
    ShellSettings,
};
pub use report::{Reporter, SharedReporter, SilentReporter, TracingReporter};
