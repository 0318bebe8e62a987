//! Unit tests for the Heketi client layers.

mod poll;

use std::time::Duration;

use crate::heketi::{JobPoller, PollPolicy, SignedClient};
use crate::test_support::ScriptedTransport;

pub(super) const BASE_URL: &str = "http://heketi.test:8080";

pub(super) fn client(transport: &ScriptedTransport) -> SignedClient<ScriptedTransport> {
    SignedClient::new(BASE_URL, transport.clone())
}

pub(super) fn poller(transport: &ScriptedTransport) -> JobPoller<ScriptedTransport> {
    JobPoller::new(client(transport)).with_policy(PollPolicy {
        interval: Duration::ZERO,
        max_wait: None,
    })
}
