//! Client for the Heketi GlusterFS management service.
//!
//! Layers, leaf first: an [`HttpTransport`] performs raw exchanges, the
//! [`SignedClient`] resolves paths against the service URL and attaches a
//! per-request JWT, and the [`JobPoller`] drives the async job protocol on
//! top of the client.

mod client;
mod error;
mod poll;
mod recording;
pub mod token;
mod transport;
mod types;

pub use client::{DEFAULT_SERVICE_URL, SignedClient, normalize_path};
pub use error::HeketiError;
pub use poll::{DEFAULT_RETRY_INTERVAL, JobPoller, PollPolicy, QueueStep, classify};
pub use recording::{CallLog, CallRecord, RecordingTransport};
pub use token::{TokenError, TokenSigner};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError,
    TransportFuture,
};
pub use types::{
    ClusterInfo, ClusterList, DeviceAddRequest, DeviceInfo, Hostnames, NodeAddRequest, NodeInfo,
};

#[cfg(test)]
mod tests;
