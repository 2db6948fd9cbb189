//! Test utilities for reconciler tests

use crate::reconciler::{Reconciler, ReconcilerOptions};
use crate::topology::ContainerTree;
use cvp_client::{MockCvpClient, ROOT_CONTAINER_NAME};
use cvp_state::DesiredState;

/// Operations that change CVP
const MUTATING: &[&str] = &[
    "add_configlet",
    "update_configlet",
    "delete_configlet",
    "add_container",
    "delete_container",
    "apply_configlets_to_container",
    "remove_configlets_from_container",
    "apply_configlets_to_device",
    "remove_configlets_from_device",
    "move_device",
    "apply_image_bundle_to_device",
    "remove_image_bundle_from_device",
    "reset_device",
    "delete_device",
    "add_image_bundle",
    "update_image_bundle",
    "delete_image_bundle",
    "upload_image",
    "execute_task",
    "cancel_task",
];

pub fn mock() -> MockCvpClient {
    MockCvpClient::new("https://cvp.test")
}

pub fn reconciler(mock: &MockCvpClient, options: ReconcilerOptions) -> Reconciler {
    Reconciler::new(mock.clone(), options)
}

pub fn dry_run() -> ReconcilerOptions {
    ReconcilerOptions {
        dry_run: true,
        ..Default::default()
    }
}

pub fn state(yaml: &str) -> DesiredState {
    DesiredState::from_yaml_str(yaml).expect("valid desired state")
}

pub fn tree(state: &DesiredState) -> ContainerTree {
    ContainerTree::build(&state.containers, ROOT_CONTAINER_NAME).expect("valid topology")
}

/// Calls that would have changed CVP
pub fn mutating_calls(mock: &MockCvpClient) -> Vec<String> {
    mock.calls()
        .into_iter()
        .filter(|c| {
            let op = c.split(':').next().unwrap_or_default();
            MUTATING.contains(&op)
        })
        .collect()
}
