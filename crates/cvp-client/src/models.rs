//! CVP API models
//!
//! These models match the JSON returned by the `/cvpservice` REST endpoints.
//! CVP uses camelCase keys and is inconsistent about optional fields, so
//! most non-identifying fields default when absent.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Name of the CVP root container
pub const ROOT_CONTAINER_NAME: &str = "Tenant";

/// Key of the CVP root container
pub const ROOT_CONTAINER_KEY: &str = "root";

/// Name of the container holding devices not yet provisioned
pub const UNDEFINED_CONTAINER_NAME: &str = "Undefined";

/// Paged list response (`startIndex`/`endIndex` endpoints)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub total: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page from a window of items
    pub fn new(total: u64, data: Vec<T>) -> Self {
        Self { total, data }
    }
}

/// CVP server information (`cvpInfo/getCvpInfo.do`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvpInfo {
    pub version: String,
}

/// Device from the provisioning inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub key: String,
    pub hostname: String,
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub system_mac_address: String,
    #[serde(default)]
    pub parent_container_key: String,
    #[serde(default, rename = "containerName")]
    pub parent_container_name: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub streaming_status: String,
    #[serde(default)]
    pub compliance_code: String,
}

/// Container (provisioning tree node)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub child_container_count: u64,
    #[serde(default)]
    pub child_net_element_count: u64,
}

impl Container {
    /// True for the CVP root container
    pub fn is_root(&self) -> bool {
        self.key == ROOT_CONTAINER_KEY || self.name == ROOT_CONTAINER_NAME
    }
}

/// Configlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Configlet {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub config: String,
    #[serde(default, rename = "type")]
    pub configlet_type: String,
    #[serde(default)]
    pub note: String,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub last_changed: i64,
}

/// Device a configlet is applied to (`getAppliedDevices.do`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDevice {
    #[serde(rename = "hostName")]
    pub hostname: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub ip_address: String,
}

/// EOS software image
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub image_size: String,
    #[serde(default)]
    pub sha512: Option<String>,
}

/// Image bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageBundle {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    /// Image names; list endpoints return these instead of `images`
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default, rename = "isCertifiedImage", deserialize_with = "bool_or_string")]
    pub is_certified: bool,
}

impl ImageBundle {
    /// Names of the images in the bundle, whichever form CVP returned
    pub fn image_names(&self) -> Vec<String> {
        if self.images.is_empty() {
            self.image_ids.clone()
        } else {
            self.images.iter().map(|i| i.name.clone()).collect()
        }
    }
}

/// Device provisioning details (`getNetElementInfoById.do`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetElementInfo {
    #[serde(default)]
    pub bundle_name: Option<String>,
}

/// CVP task (work order)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub work_order_id: String,
    #[serde(default)]
    pub work_order_user_defined_status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "netElementHostName")]
    pub hostname: String,
    /// Milliseconds since the epoch
    #[serde(default, rename = "createdOnInLongFormat")]
    pub created_on: i64,
}

impl Task {
    /// Parsed task status
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_status(&self.work_order_user_defined_status)
    }

    /// Creation time, when CVP reported one
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_on).single().filter(|_| self.created_on > 0)
    }
}

/// Task status as reported in `workOrderUserDefinedStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl TaskStatus {
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "in-progress" | "in progress" | "inprogress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(status.to_string()),
        }
    }

    /// True once the task can no longer change
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Outcome of a provisioning change (`saveTopology.do`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// Pending topology change (`addTempAction.do` payload item)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopologyAction {
    pub info: String,
    pub info_preview: String,
    pub action: String,
    pub node_type: String,
    pub node_id: String,
    pub node_name: String,
    pub to_id: String,
    pub to_name: String,
    pub to_id_type: String,
    pub from_id: String,
    pub from_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_target_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configlet_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configlet_names_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_configlet_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_configlet_names_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_node_name: Option<String>,
    pub child_tasks: Vec<String>,
    pub parent_task: String,
}

/// CVP reports some booleans as `"true"`/`"false"` strings
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}
