//! CVP API client
//!
//! Implements the CloudVision Portal REST API client.
//! Based on the `/cvpservice` endpoint structure: inventory, configlet,
//! provisioning, image and task services.
//!
//! Provisioning changes (containers, configlet attachment, device moves,
//! image bundles, resets) are staged with `addTempAction.do` and committed
//! with `saveTopology.do`, which returns the ids of the tasks CVP created.

use crate::common::HttpClient;
use crate::error::CvpError;
use crate::models::*;
use crate::cvp_trait::CvpClientTrait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const INVENTORY: &str = "/cvpservice/inventory/devices";
const DELETE_DEVICES: &str = "/cvpservice/inventory/deleteDevices.do";
const SEARCH_CONTAINERS: &str = "/cvpservice/inventory/add/searchContainers.do";
const CVP_INFO: &str = "/cvpservice/cvpInfo/getCvpInfo.do";
const CONFIGLETS: &str = "/cvpservice/configlet/getConfiglets.do";
const CONFIGLET_BY_NAME: &str = "/cvpservice/configlet/getConfigletByName.do";
const ADD_CONFIGLET: &str = "/cvpservice/configlet/addConfiglet.do";
const UPDATE_CONFIGLET: &str = "/cvpservice/configlet/updateConfiglet.do";
const DELETE_CONFIGLET: &str = "/cvpservice/configlet/deleteConfiglet.do";
const APPLIED_DEVICES: &str = "/cvpservice/configlet/getAppliedDevices.do";
const CONFIGLETS_BY_DEVICE: &str = "/cvpservice/provisioning/getConfigletsByNetElementId.do";
const CONFIGLETS_BY_CONTAINER: &str = "/cvpservice/provisioning/getConfigletsByContainerId.do";
const NET_ELEMENT_INFO: &str = "/cvpservice/provisioning/getNetElementInfoById.do";
const ADD_TEMP_ACTION: &str = "/cvpservice/provisioning/addTempAction.do?format=topology&queryParam=&nodeId=root";
const SAVE_TOPOLOGY: &str = "/cvpservice/provisioning/v2/saveTopology.do";
const IMAGE_BUNDLES: &str = "/cvpservice/image/getImageBundles.do";
const IMAGES: &str = "/cvpservice/image/getImages.do";
const IMAGE_BUNDLE_BY_NAME: &str = "/cvpservice/image/getImageBundleByName.do";
const SAVE_IMAGE_BUNDLE: &str = "/cvpservice/image/v2/saveImageBundle.do";
const UPDATE_IMAGE_BUNDLE: &str = "/cvpservice/image/v2/updateImageBundle.do";
const DELETE_IMAGE_BUNDLES: &str = "/cvpservice/image/deleteImageBundles.do";
const ADD_IMAGE: &str = "/cvpservice/image/addImage.do";
const TASKS: &str = "/cvpservice/task/getTasks.do";
const TASK_BY_ID: &str = "/cvpservice/task/getTaskById.do";
const EXECUTE_TASK: &str = "/cvpservice/task/executeTask.do";
const CANCEL_TASK: &str = "/cvpservice/task/cancelTask.do";

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigletList {
    #[serde(default)]
    configlet_list: Vec<Configlet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateConfigletResponse {
    #[serde(default)]
    task_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadImageResponse {
    #[serde(default)]
    image_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image_size: String,
}

/// Where a configlet association is applied
struct ConfigletTarget<'a> {
    id: &'a str,
    name: &'a str,
    id_type: &'a str,
    ip_address: Option<&'a str>,
}

/// CVP API client
#[derive(Debug, Clone)]
pub struct CvpClient {
    http: HttpClient,
}

impl CvpClient {
    /// Create a new CVP client
    ///
    /// # Arguments
    /// * `base_url` - CVP base URL (e.g., "https://cvp.example.com")
    /// * `token` - service account token
    pub fn new(base_url: String, token: String) -> Result<Self, CvpError> {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    /// Create a new CVP client with a custom request timeout
    pub fn with_timeout(base_url: String, token: String, timeout: Duration) -> Result<Self, CvpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the token by requesting CVP server information.
    ///
    /// # Returns
    /// * `Ok(CvpInfo)` - Token is valid and CVP is reachable
    /// * `Err(CvpError)` - Token is invalid or CVP is unreachable
    pub async fn validate_session(&self) -> Result<CvpInfo, CvpError> {
        debug!("Validating CVP token and connectivity");
        let info: CvpInfo = self.http.get(CVP_INFO).await?;
        debug!("Connected to CVP {}", info.version);
        Ok(info)
    }

    fn paged(&self, endpoint: &str, start: u64, end: u64) -> String {
        let start = start.to_string();
        let end = end.to_string();
        format!(
            "{}?{}",
            endpoint,
            self.http.build_query_string(&[("queryparam", ""), ("startIndex", &start), ("endIndex", &end)])
        )
    }

    fn with_query(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        format!("{}?{}", endpoint, self.http.build_query_string(params))
    }

    /// Get provisioned devices
    pub async fn get_inventory(&self) -> Result<Vec<Device>, CvpError> {
        let path = self.with_query(INVENTORY, &[("provisioned", "true")]);
        self.http.get(&path).await
    }

    pub async fn get_configlets_page(&self, start: u64, end: u64) -> Result<Page<Configlet>, CvpError> {
        self.http.get(&self.paged(CONFIGLETS, start, end)).await
    }

    pub async fn get_containers_page(&self, start: u64, end: u64) -> Result<Page<Container>, CvpError> {
        self.http.get(&self.paged(SEARCH_CONTAINERS, start, end)).await
    }

    pub async fn get_image_bundles_page(&self, start: u64, end: u64) -> Result<Page<ImageBundle>, CvpError> {
        self.http.get(&self.paged(IMAGE_BUNDLES, start, end)).await
    }

    pub async fn get_images_page(&self, start: u64, end: u64) -> Result<Page<Image>, CvpError> {
        self.http.get(&self.paged(IMAGES, start, end)).await
    }

    pub async fn get_tasks_page(&self, start: u64, end: u64) -> Result<Page<Task>, CvpError> {
        self.http.get(&self.paged(TASKS, start, end)).await
    }

    /// Get a configlet by name
    ///
    /// # Returns
    /// * `Ok(Some(Configlet))` - The configlet if found
    /// * `Ok(None)` - If no configlet has this name
    /// * `Err(CvpError)` - If the request fails
    pub async fn get_configlet_by_name(&self, name: &str) -> Result<Option<Configlet>, CvpError> {
        let path = self.with_query(CONFIGLET_BY_NAME, &[("name", name)]);
        match self.http.get::<Configlet>(&path).await {
            Ok(configlet) => Ok(Some(configlet)),
            Err(CvpError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a configlet and return its key
    pub async fn add_configlet(&self, name: &str, config: &str) -> Result<String, CvpError> {
        debug!("Creating configlet {}", name);
        let body = serde_json::json!({ "name": name, "config": config });
        let response: DataEnvelope<String> = self.http.post(ADD_CONFIGLET, &body).await?;
        Ok(response.data)
    }

    /// Replace a configlet's content
    ///
    /// CVP creates a task for every device the configlet is applied to;
    /// their ids are returned.
    pub async fn update_configlet(&self, key: &str, name: &str, config: &str) -> Result<Vec<String>, CvpError> {
        debug!("Updating configlet {} ({})", name, key);
        let body = serde_json::json!({
            "key": key,
            "name": name,
            "config": config,
            "waitForTaskIds": true,
            "reconciled": false,
        });
        let response: UpdateConfigletResponse = self.http.post(UPDATE_CONFIGLET, &body).await?;
        Ok(response.task_ids)
    }

    pub async fn delete_configlet(&self, key: &str, name: &str) -> Result<(), CvpError> {
        debug!("Deleting configlet {} ({})", name, key);
        let body = serde_json::json!([{ "key": key, "name": name }]);
        let _: serde_json::Value = self.http.post(DELETE_CONFIGLET, &body).await?;
        Ok(())
    }

    pub async fn get_configlets_by_device(&self, device_key: &str) -> Result<Vec<Configlet>, CvpError> {
        let path = self.with_query(
            CONFIGLETS_BY_DEVICE,
            &[("netElementId", device_key), ("queryParam", ""), ("startIndex", "0"), ("endIndex", "0")],
        );
        let list: ConfigletList = self.http.get(&path).await?;
        Ok(list.configlet_list)
    }

    pub async fn get_configlets_by_container(&self, container_key: &str) -> Result<Vec<Configlet>, CvpError> {
        let path = self.with_query(
            CONFIGLETS_BY_CONTAINER,
            &[("containerId", container_key), ("queryParam", ""), ("startIndex", "0"), ("endIndex", "0")],
        );
        let list: ConfigletList = self.http.get(&path).await?;
        Ok(list.configlet_list)
    }

    pub async fn get_devices_by_configlet(&self, name: &str) -> Result<Vec<AppliedDevice>, CvpError> {
        let path = self.with_query(
            APPLIED_DEVICES,
            &[("configletName", name), ("queryparam", ""), ("startIndex", "0"), ("endIndex", "0")],
        );
        let page: Page<AppliedDevice> = self.http.get(&path).await?;
        Ok(page.data)
    }

    /// Stage topology actions and commit them
    async fn save_topology(&self, actions: Vec<TopologyAction>) -> Result<TaskResponse, CvpError> {
        let body = serde_json::json!({ "data": actions });
        let _: serde_json::Value = self.http.post(ADD_TEMP_ACTION, &body).await?;

        let saved: DataEnvelope<TaskResponse> = self.http.post(SAVE_TOPOLOGY, &serde_json::json!([])).await?;
        if !saved.data.task_ids.is_empty() {
            info!("CVP created tasks {:?}", saved.data.task_ids);
        }
        Ok(saved.data)
    }

    /// Create a container under `parent`
    pub async fn add_container(&self, name: &str, parent: &Container) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![container_add_action(name, parent)]).await
    }

    /// Delete an empty container
    pub async fn delete_container(&self, container: &Container, parent: &Container) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![container_delete_action(container, parent)]).await
    }

    /// Attach configlets to a container, keeping those already attached
    pub async fn apply_configlets_to_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        let current = self.get_configlets_by_container(&container.key).await?;
        let target = ConfigletTarget {
            id: &container.key,
            name: &container.name,
            id_type: "container",
            ip_address: None,
        };
        self.save_topology(vec![configlet_action(&target, &merge_configlets(&current, configlets), &[])]).await
    }

    /// Detach configlets from a container
    pub async fn remove_configlets_from_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        let current = self.get_configlets_by_container(&container.key).await?;
        let target = ConfigletTarget {
            id: &container.key,
            name: &container.name,
            id_type: "container",
            ip_address: None,
        };
        let keep = subtract_configlets(&current, configlets);
        self.save_topology(vec![configlet_action(&target, &keep, configlets)]).await
    }

    /// Attach configlets to a device, keeping those already attached
    pub async fn apply_configlets_to_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        let current = self.get_configlets_by_device(&device.key).await?;
        let target = device_target(device);
        self.save_topology(vec![configlet_action(&target, &merge_configlets(&current, configlets), &[])]).await
    }

    /// Detach configlets from a device
    pub async fn remove_configlets_from_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        let current = self.get_configlets_by_device(&device.key).await?;
        let target = device_target(device);
        let keep = subtract_configlets(&current, configlets);
        self.save_topology(vec![configlet_action(&target, &keep, configlets)]).await
    }

    /// Move a device to another container
    pub async fn move_device(&self, device: &Device, container: &Container) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![device_move_action(device, container)]).await
    }

    /// Name of the image bundle applied directly to a device, if any
    pub async fn get_device_image_bundle(&self, device: &Device) -> Result<Option<String>, CvpError> {
        let path = self.with_query(NET_ELEMENT_INFO, &[("netElementId", &device.key)]);
        let info: NetElementInfo = self.http.get(&path).await?;
        Ok(info.bundle_name.filter(|name| !name.is_empty()))
    }

    pub async fn apply_image_bundle_to_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![image_bundle_action(device, bundle, false)]).await
    }

    pub async fn remove_image_bundle_from_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![image_bundle_action(device, bundle, true)]).await
    }

    /// Factory reset a device (moves it back to the undefined container)
    pub async fn reset_device(&self, device: &Device) -> Result<TaskResponse, CvpError> {
        self.save_topology(vec![device_reset_action(device)]).await
    }

    /// Remove a device from the inventory
    pub async fn delete_device(&self, device: &Device) -> Result<(), CvpError> {
        let mac = if device.system_mac_address.is_empty() {
            &device.key
        } else {
            &device.system_mac_address
        };
        let body = serde_json::json!({ "data": [mac] });
        let _: serde_json::Value = self.http.post(DELETE_DEVICES, &body).await?;
        Ok(())
    }

    pub async fn get_image_bundle_by_name(&self, name: &str) -> Result<Option<ImageBundle>, CvpError> {
        let path = self.with_query(IMAGE_BUNDLE_BY_NAME, &[("name", name)]);
        match self.http.get::<Option<ImageBundle>>(&path).await {
            Ok(bundle) => Ok(bundle),
            Err(CvpError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn add_image_bundle(&self, name: &str, images: &[Image], certified: bool) -> Result<(), CvpError> {
        debug!("Creating image bundle {}", name);
        let body = serde_json::json!({
            "name": name,
            "isCertifiedImage": certified.to_string(),
            "images": images,
        });
        let _: serde_json::Value = self.http.post(SAVE_IMAGE_BUNDLE, &body).await?;
        Ok(())
    }

    pub async fn update_image_bundle(&self, bundle: &ImageBundle, images: &[Image], certified: bool) -> Result<(), CvpError> {
        debug!("Updating image bundle {}", bundle.name);
        let body = serde_json::json!({
            "id": bundle.key,
            "name": bundle.name,
            "isCertifiedImage": certified.to_string(),
            "images": images,
        });
        let _: serde_json::Value = self.http.post(UPDATE_IMAGE_BUNDLE, &body).await?;
        Ok(())
    }

    pub async fn delete_image_bundle(&self, bundle: &ImageBundle) -> Result<(), CvpError> {
        debug!("Deleting image bundle {}", bundle.name);
        let body = serde_json::json!({ "data": [{ "key": bundle.key, "name": bundle.name }] });
        let _: serde_json::Value = self.http.post(DELETE_IMAGE_BUNDLES, &body).await?;
        Ok(())
    }

    /// Upload an EOS image or extension from a local file
    pub async fn upload_image(&self, path: &Path) -> Result<Image, CvpError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CvpError::InvalidRequest(format!("Invalid image path: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        info!("Uploading image {} ({} bytes)", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response: UploadImageResponse = self.http.post_multipart(ADD_IMAGE, form).await?;

        Ok(Image {
            key: response.image_id,
            name: if response.name.is_empty() { file_name } else { response.name },
            image_size: response.image_size,
            sha512: None,
        })
    }

    pub async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, CvpError> {
        let path = self.with_query(TASK_BY_ID, &[("taskId", id)]);
        match self.http.get::<Task>(&path).await {
            Ok(task) => Ok(Some(task)),
            Err(CvpError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn execute_task(&self, id: &str) -> Result<(), CvpError> {
        info!("Executing task {}", id);
        let body = serde_json::json!({ "data": [id] });
        let _: serde_json::Value = self.http.post(EXECUTE_TASK, &body).await?;
        Ok(())
    }

    pub async fn cancel_task(&self, id: &str) -> Result<(), CvpError> {
        info!("Cancelling task {}", id);
        let body = serde_json::json!({ "data": id });
        let _: serde_json::Value = self.http.post(CANCEL_TASK, &body).await?;
        Ok(())
    }
}

fn device_target(device: &Device) -> ConfigletTarget<'_> {
    ConfigletTarget {
        id: device.system_mac_address.as_str(),
        name: if device.fqdn.is_empty() { device.hostname.as_str() } else { device.fqdn.as_str() },
        id_type: "netelement",
        ip_address: Some(device.ip_address.as_str()),
    }
}

/// `current` followed by the configlets of `extra` not already in it
fn merge_configlets(current: &[Configlet], extra: &[Configlet]) -> Vec<Configlet> {
    let mut merged = current.to_vec();
    for configlet in extra {
        if !merged.iter().any(|c| c.key == configlet.key) {
            merged.push(configlet.clone());
        }
    }
    merged
}

fn subtract_configlets(current: &[Configlet], removed: &[Configlet]) -> Vec<Configlet> {
    current
        .iter()
        .filter(|c| !removed.iter().any(|r| r.key == c.key))
        .cloned()
        .collect()
}

fn container_add_action(name: &str, parent: &Container) -> TopologyAction {
    TopologyAction {
        info: format!("Container {} created", name),
        info_preview: format!("Container {} created", name),
        action: "add".to_string(),
        node_type: "container".to_string(),
        node_id: "new_container".to_string(),
        node_name: name.to_string(),
        to_id: parent.key.clone(),
        to_name: parent.name.clone(),
        to_id_type: "container".to_string(),
        ..Default::default()
    }
}

fn container_delete_action(container: &Container, parent: &Container) -> TopologyAction {
    TopologyAction {
        info: format!("Container {} deleted", container.name),
        info_preview: format!("Container {} deleted", container.name),
        action: "delete".to_string(),
        node_type: "container".to_string(),
        node_id: container.key.clone(),
        node_name: container.name.clone(),
        from_id: parent.key.clone(),
        from_name: parent.name.clone(),
        to_id_type: "container".to_string(),
        ..Default::default()
    }
}

fn configlet_action(target: &ConfigletTarget<'_>, keep: &[Configlet], ignore: &[Configlet]) -> TopologyAction {
    let info = format!("Configlet assignment for {}", target.name);
    TopologyAction {
        info: info.clone(),
        info_preview: info,
        action: "associate".to_string(),
        node_type: "configlet".to_string(),
        to_id: target.id.to_string(),
        to_name: target.name.to_string(),
        to_id_type: target.id_type.to_string(),
        node_ip_address: target.ip_address.map(str::to_string),
        node_target_ip_address: target.ip_address.map(str::to_string),
        configlet_list: Some(keep.iter().map(|c| c.key.clone()).collect()),
        configlet_names_list: Some(keep.iter().map(|c| c.name.clone()).collect()),
        ignore_configlet_list: Some(ignore.iter().map(|c| c.key.clone()).collect()),
        ignore_configlet_names_list: Some(ignore.iter().map(|c| c.name.clone()).collect()),
        ..Default::default()
    }
}

fn device_move_action(device: &Device, container: &Container) -> TopologyAction {
    let info = format!("Device {} moved to {}", device.fqdn, container.name);
    TopologyAction {
        info: info.clone(),
        info_preview: info,
        action: "update".to_string(),
        node_type: "netelement".to_string(),
        node_id: device.key.clone(),
        node_name: device.fqdn.clone(),
        to_id: container.key.clone(),
        to_name: container.name.clone(),
        to_id_type: "container".to_string(),
        from_id: device.parent_container_key.clone(),
        from_name: device.parent_container_name.clone(),
        ..Default::default()
    }
}

fn image_bundle_action(device: &Device, bundle: &ImageBundle, remove: bool) -> TopologyAction {
    let verb = if remove { "removed from" } else { "applied to" };
    let info = format!("Image bundle {} {} {}", bundle.name, verb, device.fqdn);
    let mut action = TopologyAction {
        info: info.clone(),
        info_preview: info,
        action: "associate".to_string(),
        node_type: "imagebundle".to_string(),
        to_id: device.key.clone(),
        to_name: device.fqdn.clone(),
        to_id_type: "netelement".to_string(),
        ..Default::default()
    };
    if remove {
        action.ignore_node_id = Some(bundle.key.clone());
        action.ignore_node_name = Some(bundle.name.clone());
    } else {
        action.node_id = bundle.key.clone();
        action.node_name = bundle.name.clone();
    }
    action
}

fn device_reset_action(device: &Device) -> TopologyAction {
    let info = format!("Device {} reset", device.fqdn);
    TopologyAction {
        info: info.clone(),
        info_preview: info,
        action: "reset".to_string(),
        node_type: "netelement".to_string(),
        node_id: device.key.clone(),
        node_name: device.fqdn.clone(),
        to_id: device.parent_container_key.clone(),
        to_name: device.parent_container_name.clone(),
        from_id: device.parent_container_key.clone(),
        to_id_type: "container".to_string(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl CvpClientTrait for CvpClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_session(&self) -> Result<CvpInfo, CvpError> {
        self.validate_session().await
    }

    async fn get_inventory(&self) -> Result<Vec<Device>, CvpError> {
        self.get_inventory().await
    }

    async fn get_configlets_page(&self, start: u64, end: u64) -> Result<Page<Configlet>, CvpError> {
        self.get_configlets_page(start, end).await
    }

    async fn get_containers_page(&self, start: u64, end: u64) -> Result<Page<Container>, CvpError> {
        self.get_containers_page(start, end).await
    }

    async fn get_image_bundles_page(&self, start: u64, end: u64) -> Result<Page<ImageBundle>, CvpError> {
        self.get_image_bundles_page(start, end).await
    }

    async fn get_images_page(&self, start: u64, end: u64) -> Result<Page<Image>, CvpError> {
        self.get_images_page(start, end).await
    }

    async fn get_tasks_page(&self, start: u64, end: u64) -> Result<Page<Task>, CvpError> {
        self.get_tasks_page(start, end).await
    }

    // Configlet Operations
    async fn get_configlet_by_name(&self, name: &str) -> Result<Option<Configlet>, CvpError> {
        self.get_configlet_by_name(name).await
    }

    async fn add_configlet(&self, name: &str, config: &str) -> Result<String, CvpError> {
        self.add_configlet(name, config).await
    }

    async fn update_configlet(&self, key: &str, name: &str, config: &str) -> Result<Vec<String>, CvpError> {
        self.update_configlet(key, name, config).await
    }

    async fn delete_configlet(&self, key: &str, name: &str) -> Result<(), CvpError> {
        self.delete_configlet(key, name).await
    }

    async fn get_configlets_by_device(&self, device_key: &str) -> Result<Vec<Configlet>, CvpError> {
        self.get_configlets_by_device(device_key).await
    }

    async fn get_configlets_by_container(&self, container_key: &str) -> Result<Vec<Configlet>, CvpError> {
        self.get_configlets_by_container(container_key).await
    }

    async fn get_devices_by_configlet(&self, name: &str) -> Result<Vec<AppliedDevice>, CvpError> {
        self.get_devices_by_configlet(name).await
    }

    // Container Operations
    async fn add_container(&self, name: &str, parent: &Container) -> Result<TaskResponse, CvpError> {
        self.add_container(name, parent).await
    }

    async fn delete_container(&self, container: &Container, parent: &Container) -> Result<TaskResponse, CvpError> {
        self.delete_container(container, parent).await
    }

    async fn apply_configlets_to_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        self.apply_configlets_to_container(container, configlets).await
    }

    async fn remove_configlets_from_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        self.remove_configlets_from_container(container, configlets).await
    }

    // Device Operations
    async fn apply_configlets_to_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        self.apply_configlets_to_device(device, configlets).await
    }

    async fn remove_configlets_from_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        self.remove_configlets_from_device(device, configlets).await
    }

    async fn move_device(&self, device: &Device, container: &Container) -> Result<TaskResponse, CvpError> {
        self.move_device(device, container).await
    }

    async fn get_device_image_bundle(&self, device: &Device) -> Result<Option<String>, CvpError> {
        self.get_device_image_bundle(device).await
    }

    async fn apply_image_bundle_to_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        self.apply_image_bundle_to_device(device, bundle).await
    }

    async fn remove_image_bundle_from_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        self.remove_image_bundle_from_device(device, bundle).await
    }

    async fn reset_device(&self, device: &Device) -> Result<TaskResponse, CvpError> {
        self.reset_device(device).await
    }

    async fn delete_device(&self, device: &Device) -> Result<(), CvpError> {
        self.delete_device(device).await
    }

    // Image Operations
    async fn get_image_bundle_by_name(&self, name: &str) -> Result<Option<ImageBundle>, CvpError> {
        self.get_image_bundle_by_name(name).await
    }

    async fn add_image_bundle(&self, name: &str, images: &[Image], certified: bool) -> Result<(), CvpError> {
        self.add_image_bundle(name, images, certified).await
    }

    async fn update_image_bundle(&self, bundle: &ImageBundle, images: &[Image], certified: bool) -> Result<(), CvpError> {
        self.update_image_bundle(bundle, images, certified).await
    }

    async fn delete_image_bundle(&self, bundle: &ImageBundle) -> Result<(), CvpError> {
        self.delete_image_bundle(bundle).await
    }

    async fn upload_image(&self, path: &Path) -> Result<Image, CvpError> {
        self.upload_image(path).await
    }

    // Task Operations
    async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, CvpError> {
        self.get_task_by_id(id).await
    }

    async fn execute_task(&self, id: &str) -> Result<(), CvpError> {
        self.execute_task(id).await
    }

    async fn cancel_task(&self, id: &str) -> Result<(), CvpError> {
        self.cancel_task(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configlet(key: &str, name: &str) -> Configlet {
        Configlet {
            key: key.to_string(),
            name: name.to_string(),
            config: String::new(),
            configlet_type: "Static".to_string(),
            note: String::new(),
            last_changed: 0,
        }
    }

    fn device() -> Device {
        Device {
            key: "50:00:00:d5:5d:c0".to_string(),
            hostname: "leaf1".to_string(),
            fqdn: "leaf1.example.com".to_string(),
            serial_number: "SN1".to_string(),
            system_mac_address: "50:00:00:d5:5d:c0".to_string(),
            parent_container_key: "container_leafs".to_string(),
            parent_container_name: "Leafs".to_string(),
            ip_address: "10.0.0.11".to_string(),
            version: String::new(),
            model_name: String::new(),
            streaming_status: "active".to_string(),
            compliance_code: String::new(),
        }
    }

    fn container(key: &str, name: &str) -> Container {
        Container {
            key: key.to_string(),
            name: name.to_string(),
            parent_name: None,
            parent_key: None,
            child_container_count: 0,
            child_net_element_count: 0,
        }
    }

    #[test]
    fn test_merge_and_subtract_configlets() {
        let current = vec![configlet("c1", "base"), configlet("c2", "mgmt")];
        let merged = merge_configlets(&current, &[configlet("c2", "mgmt"), configlet("c3", "bgp")]);
        let keys: Vec<_> = merged.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["c1", "c2", "c3"]);

        let kept = subtract_configlets(&merged, &[configlet("c1", "base")]);
        let keys: Vec<_> = kept.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["c2", "c3"]);
    }

    #[test]
    fn test_container_add_action_targets_parent() {
        let action = container_add_action("Leafs", &container("root", "Tenant"));
        assert_eq!(action.action, "add");
        assert_eq!(action.node_id, "new_container");
        assert_eq!(action.to_id, "root");
        assert_eq!(action.to_name, "Tenant");
    }

    #[test]
    fn test_configlet_removal_action_lists_ignored() {
        let dev = device();
        let target = device_target(&dev);
        let action = configlet_action(&target, &[configlet("c1", "base")], &[configlet("c2", "old")]);
        assert_eq!(action.to_id_type, "netelement");
        assert_eq!(action.to_name, "leaf1.example.com");
        assert_eq!(action.configlet_list, Some(vec!["c1".to_string()]));
        assert_eq!(action.ignore_configlet_names_list, Some(vec!["old".to_string()]));
        assert_eq!(action.node_ip_address.as_deref(), Some("10.0.0.11"));
    }

    #[test]
    fn test_device_move_action() {
        let action = device_move_action(&device(), &container("container_spines", "Spines"));
        assert_eq!(action.node_type, "netelement");
        assert_eq!(action.from_id, "container_leafs");
        assert_eq!(action.to_id, "container_spines");
    }

    #[test]
    fn test_image_bundle_removal_uses_ignore_node() {
        let bundle = ImageBundle {
            key: "imagebundle_1".to_string(),
            name: "EOS-4.30".to_string(),
            images: vec![],
            image_ids: vec![],
            is_certified: false,
        };
        let applied = image_bundle_action(&device(), &bundle, false);
        assert_eq!(applied.node_id, "imagebundle_1");
        assert!(applied.ignore_node_id.is_none());

        let removed = image_bundle_action(&device(), &bundle, true);
        assert!(removed.node_id.is_empty());
        assert_eq!(removed.ignore_node_name.as_deref(), Some("EOS-4.30"));
    }

    #[test]
    fn test_paged_path() {
        let client = CvpClient::new("https://cvp/".to_string(), "t".to_string()).unwrap();
        assert_eq!(
            client.paged(CONFIGLETS, 0, 25),
            "/cvpservice/configlet/getConfiglets.do?queryparam=&startIndex=0&endIndex=25"
        );
    }
}
