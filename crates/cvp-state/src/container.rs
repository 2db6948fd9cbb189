//! Declared containers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat map of container name to its declaration
pub type Topology = BTreeMap<String, ContainerSpec>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerSpec {
    /// Parent container; either declared in the same document or already in CVP
    pub parent_container_name: String,

    /// Configlets attached to the container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configlets: Vec<String>,

    /// Devices (by search key) that should live in this container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,

    /// Image bundle attached to the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bundle: Option<String>,
}
