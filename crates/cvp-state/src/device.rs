//! Declared devices

use crate::options::{ResourceState, SearchKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_mac_address: Option<String>,

    /// Container the device should be provisioned in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configlets: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bundle: Option<String>,

    /// Overrides the document-level state for this device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ResourceState>,
}

impl DeviceSpec {
    /// Value of the attribute used to find this device in the inventory
    pub fn search_value(&self, key: SearchKey) -> Option<&str> {
        let value = match key {
            SearchKey::Hostname => self.hostname.as_deref(),
            SearchKey::Fqdn => self.fqdn.as_deref(),
            SearchKey::SerialNumber => self.serial_number.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Best human-readable identifier, for logs and results
    pub fn label(&self) -> &str {
        self.hostname
            .as_deref()
            .or(self.fqdn.as_deref())
            .or(self.serial_number.as_deref())
            .or(self.system_mac_address.as_deref())
            .unwrap_or("<unnamed device>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_value_ignores_blank() {
        let device = DeviceSpec {
            fqdn: Some("leaf1.example".to_string()),
            serial_number: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(device.search_value(SearchKey::Fqdn), Some("leaf1.example"));
        assert_eq!(device.search_value(SearchKey::SerialNumber), None);
        assert_eq!(device.search_value(SearchKey::Hostname), None);
        assert_eq!(device.label(), "leaf1.example");
    }
}
