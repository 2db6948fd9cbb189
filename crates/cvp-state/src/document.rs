//! The desired-state document
//!
//! ```yaml
//! state: present
//! containers:
//!   DC1: { parentContainerName: Tenant }
//!   Leafs: { parentContainerName: DC1, configlets: [base] }
//! devices:
//!   - hostname: leaf1
//!     parentContainerName: Leafs
//!     configlets: [leaf1-config]
//! configlets:
//!   base: "hostname x\n"
//! imageBundles:
//!   - name: EOS-4.30
//!     images: [EOS-4.30.1F.swi]
//! tasks: ["42"]
//! ```

use crate::container::Topology;
use crate::device::DeviceSpec;
use crate::error::StateError;
use crate::image_bundle::ImageBundleSpec;
use crate::options::{ResourceState, SearchKey, TaskState};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DesiredState {
    /// Applies to every section unless a device overrides it
    #[serde(default)]
    pub state: ResourceState,

    #[serde(default)]
    pub containers: Topology,

    #[serde(default)]
    pub devices: Vec<DeviceSpec>,

    /// Configlet name to configuration text
    #[serde(default)]
    pub configlets: BTreeMap<String, String>,

    #[serde(default)]
    pub image_bundles: Vec<ImageBundleSpec>,

    /// Task ids; YAML integers are accepted
    #[serde(default, deserialize_with = "task_ids")]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub task_state: TaskState,
}

impl DesiredState {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StateError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Effective state of a device
    pub fn device_state(&self, device: &DeviceSpec) -> ResourceState {
        device.state.unwrap_or(self.state)
    }

    /// Structural checks that need no CVP facts
    ///
    /// Reports every problem found, not just the first.
    pub fn validate(&self, search_key: SearchKey) -> Result<(), StateError> {
        let mut problems = Vec::new();

        for (name, spec) in &self.containers {
            if name.trim().is_empty() {
                problems.push("container with an empty name".to_string());
            }
            if spec.parent_container_name.trim().is_empty() {
                problems.push(format!("container {} has no parentContainerName", name));
            } else if &spec.parent_container_name == name {
                problems.push(format!("container {} is its own parent", name));
            }
            if spec.configlets.iter().any(|c| c.trim().is_empty()) {
                problems.push(format!("container {} lists an empty configlet name", name));
            }
        }

        let mut seen = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            match device.search_value(search_key) {
                None => problems.push(format!("device #{} ({}) has no {}", index, device.label(), search_key)),
                Some(value) => {
                    if !seen.insert(value.to_string()) {
                        problems.push(format!("device {} {} is declared more than once", search_key, value));
                    }
                }
            }
            if device.configlets.iter().any(|c| c.trim().is_empty()) {
                problems.push(format!("device {} lists an empty configlet name", device.label()));
            }
        }

        if self.configlets.keys().any(|name| name.trim().is_empty()) {
            problems.push("configlet with an empty name".to_string());
        }

        let mut bundles = HashSet::new();
        for bundle in &self.image_bundles {
            if bundle.name.trim().is_empty() {
                problems.push("image bundle with an empty name".to_string());
            } else if !bundles.insert(bundle.name.as_str()) {
                problems.push(format!("image bundle {} is declared more than once", bundle.name));
            }
        }

        if self.tasks.iter().any(|t| t.trim().is_empty()) {
            problems.push("empty task id".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(StateError::Invalid(problems.join("; ")))
        }
    }
}

fn task_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TaskId {
        Text(String),
        Number(u64),
    }

    let ids = Vec::<TaskId>::deserialize(deserializer)?;
    Ok(ids
        .into_iter()
        .map(|id| match id {
            TaskId::Text(text) => text,
            TaskId::Number(number) => number.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
containers:
  DC1: { parentContainerName: Tenant }
  Leafs: { parentContainerName: DC1, configlets: [base], devices: [leaf1] }
devices:
  - fqdn: leaf1.example
    hostname: leaf1
    serialNumber: ABC
    parentContainerName: Leafs
    configlets: [leaf1-config]
    imageBundle: EOS-4.30
  - hostname: leaf2
    state: factory_reset
configlets:
  base: "hostname x\n"
imageBundles:
  - name: EOS-4.30
    images: [EOS-4.30.1F.swi]
tasks:
  - "42"
  - 43
"#;

    #[test]
    fn test_parse_sample_document() {
        let state = DesiredState::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(state.state, ResourceState::Present);
        assert_eq!(state.containers.len(), 2);
        assert_eq!(state.containers["Leafs"].parent_container_name, "DC1");
        assert_eq!(state.containers["Leafs"].devices, vec!["leaf1"]);
        assert_eq!(state.devices[0].serial_number.as_deref(), Some("ABC"));
        assert_eq!(state.devices[0].image_bundle.as_deref(), Some("EOS-4.30"));
        assert_eq!(state.device_state(&state.devices[0]), ResourceState::Present);
        assert_eq!(state.device_state(&state.devices[1]), ResourceState::FactoryReset);
        assert_eq!(state.configlets["base"], "hostname x\n");
        assert_eq!(state.tasks, vec!["42", "43"]);
        assert_eq!(state.task_state, TaskState::Executed);
        assert!(state.validate(SearchKey::Hostname).is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(DesiredState::from_yaml_str("  \n").unwrap(), DesiredState::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = DesiredState::from_yaml_str("containerz: {}").unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));

        let err = DesiredState::from_yaml_str("devices:\n  - hostname: a\n    colour: red\n").unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let yaml = r#"
containers:
  Loop: { parentContainerName: Loop }
devices:
  - hostname: leaf1
  - hostname: leaf1
  - fqdn: nohost.example
"#;
        let state = DesiredState::from_yaml_str(yaml).unwrap();
        let err = state.validate(SearchKey::Hostname).unwrap_err().to_string();

        assert!(err.contains("Loop is its own parent"));
        assert!(err.contains("hostname leaf1 is declared more than once"));
        assert!(err.contains("(nohost.example) has no hostname"));
    }

    #[test]
    fn test_validate_uses_search_key() {
        let state = DesiredState::from_yaml_str("devices:\n  - hostname: leaf1\n").unwrap();
        assert!(state.validate(SearchKey::Hostname).is_ok());
        assert!(state.validate(SearchKey::SerialNumber).is_err());
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let err = DesiredState::from_path("/nonexistent/cvp-state.yaml").unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));
    }
}
