//! Controller-specific error types.
//!
//! Errors from the CVP client and the state document convert in via `#[from]`;
//! the remaining variants cover what only the reconciler can detect.

use cvp_client::CvpError;
use cvp_state::StateError;
use thiserror::Error;

/// Errors that can occur in the CVP controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// CVP API error
    #[error("CVP error: {0}")]
    Cvp(#[from] CvpError),

    /// Desired-state document error
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Declared container topology is not a tree
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Container referenced but missing in CVP
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Device declared but missing from the inventory
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Configlet referenced but missing in CVP and not declared
    #[error("Configlet not found: {0}")]
    ConfigletNotFound(String),

    /// Image bundle referenced but missing in CVP
    #[error("Image bundle not found: {0}")]
    ImageBundleNotFound(String),

    /// Image referenced by a bundle but not uploaded
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// Tasks did not reach a final state in time
    #[error("Timed out waiting for tasks: {0}")]
    TaskTimeout(String),
}

/// Problems in the declared container hierarchy
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("container {0} cannot be declared: it is the root container")]
    RootDeclared(String),

    #[error("container {0} is its own parent")]
    SelfParent(String),

    #[error("containers form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}
