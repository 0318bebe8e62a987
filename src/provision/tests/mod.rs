//! Unit tests for the setup and teardown workflows.


use std::time::Duration;

use crate::config::{Action, Config};
use crate::heketi::{JobPoller, Method, PollPolicy, SignedClient};
use crate::provision::Provisioner;
use crate::remote::{RemoteExecutor, ShellSettings};
use crate::test_support::{ScriptedRunner, ScriptedTransport};

const BASE_URL: &str = "http://heketi.test:8080";

/// Scripted collaborators plus the provisioner wired to them.
struct Harness {
    transport: ScriptedTransport,
    runner: ScriptedRunner,
    provisioner: Provisioner<ScriptedTransport, ScriptedRunner>,
}

impl Harness {
    fn new() -> Self {
        let transport = ScriptedTransport::new();
        let runner = ScriptedRunner::new();
        let poller = JobPoller::new(SignedClient::new(BASE_URL, transport.clone())).with_policy(
            PollPolicy {
                interval: Duration::ZERO,
                max_wait: None,
            },
        );
        let executor = RemoteExecutor::new(
            ShellSettings {
                root: true,
                ..ShellSettings::default()
            },
            runner.clone(),
        );
        Self {
            transport,
            runner,
            provisioner: Provisioner::new(poller, executor),
        }
    }

    fn requests(&self) -> Vec<(Method, String)> {
        self.transport
            .requests()
            .into_iter()
            .map(|request| {
                let path = request
                    .url
                    .strip_prefix(BASE_URL)
                    .unwrap_or(&request.url)
                    .to_owned();
                (request.method, path)
            })
            .collect()
    }

    fn commands(&self) -> Vec<(String, String)> {
        self.runner
            .invocations()
            .iter()
            .map(|call| {
                let host = call
                    .args
                    .iter()
                    .rev()
                    .nth(1)
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (host, call.shell_command())
            })
            .collect()
    }
}

fn setup_config(cluster: Option<&str>, hosts: &[&str], devices: u32) -> Config {
    Config::builder(Action::Setup)
        .cluster(cluster.map(str::to_owned))
        .hosts(hosts.iter().map(|host| (*host).to_owned()).collect())
        .devices(devices)
        .size(Some(String::from("10G")))
        .build()
        .expect("valid setup config")
}

fn teardown_config(cluster: &str) -> Config {
    Config::builder(Action::Teardown)
        .cluster(Some(cluster.to_owned()))
        .hosts(vec![String::from("node1")])
        .build()
        .expect("valid teardown config")
}

fn catalog(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_owned()).collect()
}
