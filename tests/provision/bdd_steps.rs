//! BDD step definitions for provisioning behaviour.

use heketi_setup::Outcome;
use rstest_bdd_macros::{given, then, when};
use serde_json::json;
use tokio::runtime::Builder;

use super::test_helpers::{
    ProvisionContext, ProvisionResult, host_names, setup_config, teardown_config,
};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn script_registration(provision_context: &ProvisionContext, hosts: u32, devices: u32) {
    let transport = &provision_context.transport;
    for (index, _) in host_names(hosts).iter().enumerate() {
        let node = format!("n{index}");
        transport.push_async_result(
            &format!("/queue/{node}"),
            &format!("/nodes/{node}"),
            &json!({"id": node}),
        );
        for device in 0..devices {
            transport.push_async_done(&format!("/queue/{node}-{device}"));
        }
    }
}

fn script_allocation(provision_context: &ProvisionContext, hosts: u32, devices: u32) {
    for index in 0..hosts * devices {
        provision_context
            .runner
            .push_stdout(format!("/dev/loop{index}\n"));
    }
}

fn script_node(provision_context: &ProvisionContext) {
    provision_context.transport.push_json(&json!({
        "id": "n1",
        "hostnames": {"manage": ["node1"], "storage": ["node1"]},
        "devices": [
            {"id": "d1", "name": "/dev/loop0"},
            {"id": "d2", "name": "/dev/loop1"}
        ]
    }));
}

#[given("a Heketi catalog containing cluster \"{cluster}\"")]
fn catalog_with_cluster(provision_context: ProvisionContext, cluster: String) -> ProvisionContext {
    provision_context
        .transport
        .push_json(&json!({"clusters": [cluster]}));
    provision_context
}

#[given("an empty Heketi catalog")]
fn empty_catalog(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context
        .transport
        .push_json(&json!({"clusters": []}));
    provision_context
}

#[given("a setup of {hosts:u32} hosts with {devices:u32} devices each on cluster \"{cluster}\"")]
fn setup_on_cluster(
    mut provision_context: ProvisionContext,
    hosts: u32,
    devices: u32,
    cluster: String,
) -> ProvisionContext {
    provision_context.config = Some(setup_config(Some(cluster.as_str()), hosts, devices));
    script_allocation(&provision_context, hosts, devices);
    script_registration(&provision_context, hosts, devices);
    provision_context
}

#[given(
    "a setup of {hosts:u32} hosts with {devices:u32} devices each on a new cluster \"{cluster}\""
)]
fn setup_on_new_cluster(
    mut provision_context: ProvisionContext,
    hosts: u32,
    devices: u32,
    cluster: String,
) -> ProvisionContext {
    provision_context.config = Some(setup_config(None, hosts, devices));
    provision_context
        .transport
        .push_json(&json!({"id": cluster}));
    script_allocation(&provision_context, hosts, devices);
    script_registration(&provision_context, hosts, devices);
    provision_context
}

#[given("cluster \"{cluster}\" holds 1 volume and one node with 2 devices")]
fn cluster_with_volume_and_node(
    mut provision_context: ProvisionContext,
    cluster: String,
) -> ProvisionContext {
    provision_context.config = Some(teardown_config(&cluster));
    let transport = &provision_context.transport;
    transport.push_json(&json!({"id": cluster, "nodes": ["n1"], "volumes": ["v1"]}));
    transport.push_async_done("/queue/v1");
    script_node(&provision_context);
    for device in 0..2 {
        transport.push_async_done(&format!("/queue/d{device}"));
        provision_context
            .runner
            .push_stdout(format!("/LOOP{cluster}-{device}\n"));
        provision_context.runner.push_success();
        provision_context.runner.push_success();
    }
    transport.push_async_done("/queue/n1");
    transport.push_no_content();
    provision_context
}

#[given("cluster \"{cluster}\" holds one node whose first loop device is busy")]
fn cluster_with_busy_device(
    mut provision_context: ProvisionContext,
    cluster: String,
) -> ProvisionContext {
    provision_context.config = Some(teardown_config(&cluster));
    provision_context
        .transport
        .push_json(&json!({"id": cluster, "nodes": ["n1"], "volumes": []}));
    script_node(&provision_context);
    provision_context.transport.push_async_done("/queue/d1");
    provision_context
        .runner
        .push_stdout(format!("/LOOP{cluster}-0\n"));
    provision_context.runner.push_failure(1);
    provision_context
}

#[when("I run the provisioning workflow")]
fn run_workflow(mut provision_context: ProvisionContext) -> ProvisionContext {
    let config = provision_context
        .config
        .clone()
        .unwrap_or_else(|| panic!("test setup requires a configured run"));
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("runtime should build: {err}"));
    let provisioner = provision_context.provisioner();
    provision_context.outcome = Some(match runtime.block_on(provisioner.run(&config)) {
        Ok(outcome) => ProvisionResult::Success(outcome),
        Err(err) => ProvisionResult::Failure(err.to_string()),
    });
    provision_context
}

#[then("the workflow succeeds")]
fn workflow_succeeds(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match provision_context.outcome {
        Some(ProvisionResult::Success(_)) => Ok(()),
        Some(ProvisionResult::Failure(ref message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the workflow fails with \"{fragment}\"")]
fn workflow_fails_with(
    provision_context: &ProvisionContext,
    fragment: String,
) -> Result<(), StepError> {
    let Some(ProvisionResult::Failure(ref message)) = provision_context.outcome else {
        return Err(StepError::Assertion(format!(
            "expected failure, got: {:?}",
            provision_context.outcome
        )));
    };
    if message.contains(&fragment) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected error mentioning {fragment}, got: {message}"
        )))
    }
}

#[then("{count:u32} host commands run")]
fn host_commands_run(provision_context: &ProvisionContext, count: u32) -> Result<(), StepError> {
    let actual = provision_context.runner.invocations().len();
    if actual == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} host commands, got {actual}"
        )))
    }
}

#[then("{nodes:u32} nodes and {devices:u32} devices are registered")]
fn nodes_and_devices_registered(
    provision_context: &ProvisionContext,
    nodes: u32,
    devices: u32,
) -> Result<(), StepError> {
    let Some(ProvisionResult::Success(Outcome::Setup(ref summary))) = provision_context.outcome
    else {
        return Err(StepError::Assertion(format!(
            "expected setup summary, got: {:?}",
            provision_context.outcome
        )));
    };
    let node_posts = provision_context.count_requests("POST", "/nodes");
    let device_posts = provision_context.count_requests("POST", "/devices");
    if summary.nodes.len() == nodes as usize
        && node_posts == nodes as usize
        && summary.devices == devices as usize
        && device_posts == devices as usize
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {nodes} nodes and {devices} devices, got {node_posts} node and \
             {device_posts} device submissions for {summary:?}"
        )))
    }
}

#[then("{count:u32} cluster is created")]
fn clusters_created(provision_context: &ProvisionContext, count: u32) -> Result<(), StepError> {
    let actual = provision_context.count_requests("POST", "/clusters");
    if actual == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} cluster creations, got {actual}"
        )))
    }
}

#[then("cluster \"{cluster}\" is deleted")]
fn cluster_deleted(provision_context: &ProvisionContext, cluster: String) -> Result<(), StepError> {
    match provision_context.count_requests("DELETE", &format!("/clusters/{cluster}")) {
        1 => Ok(()),
        actual => Err(StepError::Assertion(format!(
            "expected one delete of cluster {cluster}, got {actual}"
        ))),
    }
}

#[then("cluster \"{cluster}\" is not deleted")]
fn cluster_not_deleted(
    provision_context: &ProvisionContext,
    cluster: String,
) -> Result<(), StepError> {
    match provision_context.count_requests("DELETE", &format!("/clusters/{cluster}")) {
        0 => Ok(()),
        actual => Err(StepError::Assertion(format!(
            "cluster {cluster} should survive an aborted teardown, got {actual} deletes"
        ))),
    }
}
