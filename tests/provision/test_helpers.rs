//! Shared fixtures and helpers for provisioning BDD scenarios.

use std::time::Duration;

use heketi_setup::config::{Action, Config};
use heketi_setup::heketi::{JobPoller, PollPolicy, SignedClient};
use heketi_setup::remote::{RemoteExecutor, ShellSettings};
use heketi_setup::test_support::{ScriptedRunner, ScriptedTransport};
use heketi_setup::{Outcome, Provisioner};
use rstest::fixture;

pub const BASE_URL: &str = "http://heketi.test:8080";

#[derive(Clone, Debug)]
pub enum ProvisionResult {
    Success(Outcome),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct ProvisionContext {
    pub transport: ScriptedTransport,
    pub runner: ScriptedRunner,
    pub config: Option<Config>,
    pub outcome: Option<ProvisionResult>,
}

impl ProvisionContext {
    pub fn provisioner(&self) -> Provisioner<ScriptedTransport, ScriptedRunner> {
        let client = SignedClient::new(BASE_URL, self.transport.clone());
        let poller = JobPoller::new(client).with_policy(PollPolicy {
            interval: Duration::ZERO,
            max_wait: Some(Duration::from_secs(5)),
        });
        let executor = RemoteExecutor::new(
            ShellSettings {
                root: true,
                ..ShellSettings::default()
            },
            self.runner.clone(),
        );
        Provisioner::new(poller, executor)
    }

    /// Counts requests with `method` whose URL ends in `path`.
    pub fn count_requests(&self, method: &str, path: &str) -> usize {
        self.transport
            .requests()
            .iter()
            .filter(|request| request.method.as_str() == method && request.url.ends_with(path))
            .count()
    }
}

#[fixture]
pub fn provision_context() -> ProvisionContext {
    ProvisionContext {
        transport: ScriptedTransport::new(),
        runner: ScriptedRunner::new(),
        config: None,
        outcome: None,
    }
}

pub fn host_names(count: u32) -> Vec<String> {
    (1..=count).map(|index| format!("node{index}")).collect()
}

pub fn setup_config(cluster: Option<&str>, hosts: u32, devices: u32) -> Config {
    Config::builder(Action::Setup)
        .cluster(cluster.map(str::to_owned))
        .hosts(host_names(hosts))
        .devices(devices)
        .size(Some(String::from("1G")))
        .build()
        .unwrap_or_else(|err| panic!("setup config should be valid: {err}"))
}

pub fn teardown_config(cluster: &str) -> Config {
    Config::builder(Action::Teardown)
        .cluster(Some(cluster.to_owned()))
        .hosts(host_names(1))
        .build()
        .unwrap_or_else(|err| panic!("teardown config should be valid: {err}"))
}
