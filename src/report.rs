//! Human-readable progress reporting.
//!
//! Components receive a [`Reporter`] at construction rather than consulting a
//! global verbosity switch. The default [`SilentReporter`] discards every
//! message; the binary swaps in [`TracingReporter`] when `--verbose` is set.

use std::fmt::Debug;
use std::sync::Arc;

/// Sink for progress messages emitted while provisioning.
pub trait Reporter: Debug {
    /// Records a single message.
    fn report(&self, message: &str);
}

/// Shared handle to a reporter, cloned into each component.
pub type SharedReporter = Arc<dyn Reporter + Send + Sync>;

/// Reporter that drops all messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _message: &str) {}
}

/// Reporter that forwards messages as `tracing` events at `INFO` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, message: &str) {
        tracing::info!(target: "heketi_setup", "{message}");
    }
}

/// Returns a shared [`SilentReporter`].
#[must_use]
pub fn silent() -> SharedReporter {
    Arc::new(SilentReporter)
}
