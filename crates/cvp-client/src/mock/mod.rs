//! Mock CvpClient for unit testing
//!
//! This module provides a mock implementation of CvpClientTrait that can be used
//! in unit tests without requiring a running CVP instance.
//!
//! The mock is organized into domain-specific modules:
//! - `inventory.rs` - devices, containers and topology changes
//! - `configlets.rs` - configlet CRUD and attachment lookups
//! - `images.rs` - images and image bundles
//! - `tasks.rs` - task lookup, execution and cancellation
//! - `helpers.rs` - paging windows, key generation and task creation

mod configlets;
mod helpers;
mod images;
mod inventory;
mod tasks;

use crate::error::CvpError;
use crate::models::*;
use crate::cvp_trait::CvpClientTrait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock CvpClient for testing
///
/// Stores CVP state in memory, records every logical operation in a call log
/// (`"add_container:Leafs"`, `"apply_configlets_to_device:leaf1:base"`, ...)
/// and can be told to fail a given operation.
#[derive(Clone, Debug)]
pub struct MockCvpClient {
    pub(crate) base_url: String,
    // In-memory storage, insertion ordered like CVP list endpoints
    pub(crate) devices: Arc<Mutex<Vec<Device>>>,
    pub(crate) containers: Arc<Mutex<Vec<Container>>>,
    pub(crate) configlets: Arc<Mutex<Vec<Configlet>>>,
    pub(crate) images: Arc<Mutex<Vec<Image>>>,
    pub(crate) image_bundles: Arc<Mutex<Vec<ImageBundle>>>,
    pub(crate) tasks: Arc<Mutex<Vec<Task>>>,
    // Attachments: device key / container key -> configlet keys
    pub(crate) device_configlets: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pub(crate) container_configlets: Arc<Mutex<HashMap<String, Vec<String>>>>,
    // Device key -> image bundle name
    pub(crate) device_bundles: Arc<Mutex<HashMap<String, String>>>,
    // Observability for assertions
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    pub(crate) page_requests: Arc<Mutex<Vec<(String, u64, u64)>>>,
    pub(crate) failures: Arc<Mutex<HashSet<String>>>,
    // Counter for generating task ids
    pub(crate) next_task_id: Arc<Mutex<u64>>,
}

impl MockCvpClient {
    /// Create a new mock client holding only the `Tenant` root and `Undefined` containers
    pub fn new(base_url: impl Into<String>) -> Self {
        let root = Container {
            key: ROOT_CONTAINER_KEY.to_string(),
            name: ROOT_CONTAINER_NAME.to_string(),
            parent_name: None,
            parent_key: None,
            child_container_count: 0,
            child_net_element_count: 0,
        };
        let undefined = Container {
            key: "undefined_container".to_string(),
            name: UNDEFINED_CONTAINER_NAME.to_string(),
            parent_name: Some(ROOT_CONTAINER_NAME.to_string()),
            parent_key: Some(ROOT_CONTAINER_KEY.to_string()),
            child_container_count: 0,
            child_net_element_count: 0,
        };

        Self {
            base_url: base_url.into(),
            devices: Arc::new(Mutex::new(Vec::new())),
            containers: Arc::new(Mutex::new(vec![root, undefined])),
            configlets: Arc::new(Mutex::new(Vec::new())),
            images: Arc::new(Mutex::new(Vec::new())),
            image_bundles: Arc::new(Mutex::new(Vec::new())),
            tasks: Arc::new(Mutex::new(Vec::new())),
            device_configlets: Arc::new(Mutex::new(HashMap::new())),
            container_configlets: Arc::new(Mutex::new(HashMap::new())),
            device_bundles: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            page_requests: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            next_task_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a container under an existing parent (for test setup)
    pub fn seed_container(&self, name: &str, parent_name: &str) -> Container {
        let parent_key = self
            .container_by_name(parent_name)
            .map(|c| c.key)
            .unwrap_or_else(|| ROOT_CONTAINER_KEY.to_string());
        let container = Container {
            key: helpers::new_key("container"),
            name: name.to_string(),
            parent_name: Some(parent_name.to_string()),
            parent_key: Some(parent_key),
            child_container_count: 0,
            child_net_element_count: 0,
        };
        self.containers.lock().unwrap().push(container.clone());
        container
    }

    /// Add a provisioned device inside a container (for test setup)
    pub fn seed_device(&self, hostname: &str, serial: &str, container_name: &str) -> Device {
        let index = self.devices.lock().unwrap().len() + 1;
        let mac = format!("50:00:00:00:00:{:02x}", index);
        let container_key = self
            .container_by_name(container_name)
            .map(|c| c.key)
            .unwrap_or_default();
        let device = Device {
            key: mac.clone(),
            hostname: hostname.to_string(),
            fqdn: format!("{}.example.com", hostname),
            serial_number: serial.to_string(),
            system_mac_address: mac,
            parent_container_key: container_key,
            parent_container_name: container_name.to_string(),
            ip_address: format!("10.0.0.{}", index),
            version: "4.30.1F".to_string(),
            model_name: "vEOS-lab".to_string(),
            streaming_status: "active".to_string(),
            compliance_code: "0000".to_string(),
        };
        self.devices.lock().unwrap().push(device.clone());
        device
    }

    /// Add a configlet (for test setup)
    pub fn seed_configlet(&self, name: &str, config: &str) -> Configlet {
        let configlet = Configlet {
            key: helpers::new_key("configlet"),
            name: name.to_string(),
            config: config.to_string(),
            configlet_type: "Static".to_string(),
            note: String::new(),
            last_changed: chrono::Utc::now().timestamp_millis(),
        };
        self.configlets.lock().unwrap().push(configlet.clone());
        configlet
    }

    /// Attach existing configlets to a device by hostname (for test setup)
    pub fn attach_to_device(&self, hostname: &str, configlet_names: &[&str]) {
        let Some(device) = self.device_by_hostname(hostname) else { return };
        let keys = self.configlet_keys(configlet_names);
        self.device_configlets
            .lock()
            .unwrap()
            .entry(device.key)
            .or_default()
            .extend(keys);
    }

    /// Attach existing configlets to a container by name (for test setup)
    pub fn attach_to_container(&self, container_name: &str, configlet_names: &[&str]) {
        let Some(container) = self.container_by_name(container_name) else { return };
        let keys = self.configlet_keys(configlet_names);
        self.container_configlets
            .lock()
            .unwrap()
            .entry(container.key)
            .or_default()
            .extend(keys);
    }

    /// Add an uploaded image (for test setup)
    pub fn seed_image(&self, name: &str) -> Image {
        let image = Image {
            key: name.to_string(),
            name: name.to_string(),
            image_size: "1024".to_string(),
            sha512: None,
        };
        self.images.lock().unwrap().push(image.clone());
        image
    }

    /// Add an image bundle made of seeded images (for test setup)
    pub fn seed_image_bundle(&self, name: &str, image_names: &[&str]) -> ImageBundle {
        let images: Vec<Image> = self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|i| image_names.contains(&i.name.as_str()))
            .cloned()
            .collect();
        let bundle = ImageBundle {
            key: helpers::new_key("imagebundle"),
            name: name.to_string(),
            images,
            image_ids: Vec::new(),
            is_certified: false,
        };
        self.image_bundles.lock().unwrap().push(bundle.clone());
        bundle
    }

    /// Apply an image bundle to a device by hostname (for test setup)
    pub fn attach_bundle_to_device(&self, hostname: &str, bundle_name: &str) {
        if let Some(device) = self.device_by_hostname(hostname) {
            self.device_bundles
                .lock()
                .unwrap()
                .insert(device.key, bundle_name.to_string());
        }
    }

    /// Add a task with the given status (for test setup)
    pub fn seed_task(&self, id: &str, status: &str) -> Task {
        let task = Task {
            work_order_id: id.to_string(),
            work_order_user_defined_status: status.to_string(),
            description: format!("Seeded task {}", id),
            hostname: String::new(),
            created_on: chrono::Utc::now().timestamp_millis(),
        };
        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    /// Make every call of `operation` fail with an API error
    pub fn fail_on(&self, operation: &str) {
        self.failures.lock().unwrap().insert(operation.to_string());
    }

    /// Logical operations performed so far, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose operation name is `operation`
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}:", operation);
        self.calls()
            .into_iter()
            .filter(|c| c == operation || c.starts_with(&prefix))
            .collect()
    }

    /// `(endpoint, start, end)` of every paged request
    pub fn page_requests(&self) -> Vec<(String, u64, u64)> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn container_by_name(&self, name: &str) -> Option<Container> {
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn device_by_hostname(&self, hostname: &str) -> Option<Device> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.hostname == hostname)
            .cloned()
    }

    pub fn configlet_by_name(&self, name: &str) -> Option<Configlet> {
        self.configlets
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn image_bundle_by_name(&self, name: &str) -> Option<ImageBundle> {
        self.image_bundles
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.name == name)
            .cloned()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.work_order_id == id)
            .cloned()
    }

    /// Names of configlets attached to a device, in attachment order
    pub fn device_configlet_names(&self, hostname: &str) -> Vec<String> {
        let Some(device) = self.device_by_hostname(hostname) else { return Vec::new() };
        let keys = self
            .device_configlets
            .lock()
            .unwrap()
            .get(&device.key)
            .cloned()
            .unwrap_or_default();
        self.configlet_names(&keys)
    }

    /// Names of configlets attached to a container, in attachment order
    pub fn container_configlet_names(&self, container_name: &str) -> Vec<String> {
        let Some(container) = self.container_by_name(container_name) else { return Vec::new() };
        let keys = self
            .container_configlets
            .lock()
            .unwrap()
            .get(&container.key)
            .cloned()
            .unwrap_or_default();
        self.configlet_names(&keys)
    }

    /// Image bundle applied to a device
    pub fn device_bundle(&self, hostname: &str) -> Option<String> {
        let device = self.device_by_hostname(hostname)?;
        self.device_bundles.lock().unwrap().get(&device.key).cloned()
    }

    fn configlet_keys(&self, names: &[&str]) -> Vec<String> {
        let configlets = self.configlets.lock().unwrap();
        names
            .iter()
            .filter_map(|n| configlets.iter().find(|c| c.name == *n).map(|c| c.key.clone()))
            .collect()
    }

    fn configlet_names(&self, keys: &[String]) -> Vec<String> {
        let configlets = self.configlets.lock().unwrap();
        keys.iter()
            .filter_map(|k| configlets.iter().find(|c| &c.key == k).map(|c| c.name.clone()))
            .collect()
    }

    /// Record a call, failing it when injected
    pub(crate) fn record(&self, call: String) -> Result<(), CvpError> {
        let operation = call.split(':').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);
        if self.failures.lock().unwrap().contains(&operation) {
            return Err(CvpError::Api(format!("injected failure: {}", operation)));
        }
        Ok(())
    }

    pub(crate) fn record_page(&self, endpoint: &str, start: u64, end: u64) -> Result<(), CvpError> {
        self.page_requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), start, end));
        if self.failures.lock().unwrap().contains(endpoint) {
            return Err(CvpError::Api(format!("injected failure: {}", endpoint)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CvpClientTrait for MockCvpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_session(&self) -> Result<CvpInfo, CvpError> {
        Ok(CvpInfo { version: "2023.2.0".to_string() })
    }

    // Inventory and paged lists - delegated per domain
    async fn get_inventory(&self) -> Result<Vec<Device>, CvpError> {
        inventory::get_inventory(self).await
    }

    async fn get_configlets_page(&self, start: u64, end: u64) -> Result<Page<Configlet>, CvpError> {
        configlets::get_configlets_page(self, start, end).await
    }

    async fn get_containers_page(&self, start: u64, end: u64) -> Result<Page<Container>, CvpError> {
        inventory::get_containers_page(self, start, end).await
    }

    async fn get_image_bundles_page(&self, start: u64, end: u64) -> Result<Page<ImageBundle>, CvpError> {
        images::get_image_bundles_page(self, start, end).await
    }

    async fn get_images_page(&self, start: u64, end: u64) -> Result<Page<Image>, CvpError> {
        images::get_images_page(self, start, end).await
    }

    async fn get_tasks_page(&self, start: u64, end: u64) -> Result<Page<Task>, CvpError> {
        tasks::get_tasks_page(self, start, end).await
    }

    // Configlet Operations - delegated to configlets module
    async fn get_configlet_by_name(&self, name: &str) -> Result<Option<Configlet>, CvpError> {
        configlets::get_configlet_by_name(self, name).await
    }

    async fn add_configlet(&self, name: &str, config: &str) -> Result<String, CvpError> {
        configlets::add_configlet(self, name, config).await
    }

    async fn update_configlet(&self, key: &str, name: &str, config: &str) -> Result<Vec<String>, CvpError> {
        configlets::update_configlet(self, key, name, config).await
    }

    async fn delete_configlet(&self, key: &str, name: &str) -> Result<(), CvpError> {
        configlets::delete_configlet(self, key, name).await
    }

    async fn get_configlets_by_device(&self, device_key: &str) -> Result<Vec<Configlet>, CvpError> {
        configlets::get_configlets_by_device(self, device_key).await
    }

    async fn get_configlets_by_container(&self, container_key: &str) -> Result<Vec<Configlet>, CvpError> {
        configlets::get_configlets_by_container(self, container_key).await
    }

    async fn get_devices_by_configlet(&self, name: &str) -> Result<Vec<AppliedDevice>, CvpError> {
        configlets::get_devices_by_configlet(self, name).await
    }

    // Container Operations - delegated to inventory module
    async fn add_container(&self, name: &str, parent: &Container) -> Result<TaskResponse, CvpError> {
        inventory::add_container(self, name, parent).await
    }

    async fn delete_container(&self, container: &Container, parent: &Container) -> Result<TaskResponse, CvpError> {
        inventory::delete_container(self, container, parent).await
    }

    async fn apply_configlets_to_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        inventory::apply_configlets_to_container(self, container, configlets).await
    }

    async fn remove_configlets_from_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        inventory::remove_configlets_from_container(self, container, configlets).await
    }

    // Device Operations - delegated to inventory module
    async fn apply_configlets_to_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        inventory::apply_configlets_to_device(self, device, configlets).await
    }

    async fn remove_configlets_from_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
        inventory::remove_configlets_from_device(self, device, configlets).await
    }

    async fn move_device(&self, device: &Device, container: &Container) -> Result<TaskResponse, CvpError> {
        inventory::move_device(self, device, container).await
    }

    async fn get_device_image_bundle(&self, device: &Device) -> Result<Option<String>, CvpError> {
        images::get_device_image_bundle(self, device).await
    }

    async fn apply_image_bundle_to_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        images::apply_image_bundle_to_device(self, device, bundle).await
    }

    async fn remove_image_bundle_from_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
        images::remove_image_bundle_from_device(self, device, bundle).await
    }

    async fn reset_device(&self, device: &Device) -> Result<TaskResponse, CvpError> {
        inventory::reset_device(self, device).await
    }

    async fn delete_device(&self, device: &Device) -> Result<(), CvpError> {
        inventory::delete_device(self, device).await
    }

    // Image Operations - delegated to images module
    async fn get_image_bundle_by_name(&self, name: &str) -> Result<Option<ImageBundle>, CvpError> {
        images::get_image_bundle_by_name(self, name).await
    }

    async fn add_image_bundle(&self, name: &str, bundle_images: &[Image], certified: bool) -> Result<(), CvpError> {
        images::add_image_bundle(self, name, bundle_images, certified).await
    }

    async fn update_image_bundle(&self, bundle: &ImageBundle, bundle_images: &[Image], certified: bool) -> Result<(), CvpError> {
        images::update_image_bundle(self, bundle, bundle_images, certified).await
    }

    async fn delete_image_bundle(&self, bundle: &ImageBundle) -> Result<(), CvpError> {
        images::delete_image_bundle(self, bundle).await
    }

    async fn upload_image(&self, path: &Path) -> Result<Image, CvpError> {
        images::upload_image(self, path).await
    }

    // Task Operations - delegated to tasks module
    async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, CvpError> {
        tasks::get_task_by_id(self, id).await
    }

    async fn execute_task(&self, id: &str) -> Result<(), CvpError> {
        tasks::execute_task(self, id).await
    }

    async fn cancel_task(&self, id: &str) -> Result<(), CvpError> {
        tasks::cancel_task(self, id).await
    }
}
