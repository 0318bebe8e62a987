//! BDD scenarios for the provisioning workflows.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisionContext, provision_context};

#[scenario(
    path = "tests/features/provision.feature",
    name = "Register loop devices on every host"
)]
fn scenario_register_devices(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Create a cluster when none is selected"
)]
fn scenario_create_cluster(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Reject an unknown UUID-shaped cluster"
)]
fn scenario_reject_unknown_cluster(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Tear down a cluster and reclaim its loop devices"
)]
fn scenario_teardown(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Abort teardown when a loop device cannot be detached"
)]
fn scenario_teardown_abort(provision_context: ProvisionContext) {
    let _ = provision_context;
}
