//! CvpClient trait for mocking
//!
//! This trait abstracts the CvpClient so reconcilers can run against an
//! in-memory mock in unit tests. Each method is one logical CVP operation.

use crate::error::CvpError;
use crate::models::*;
use std::path::Path;

/// Trait for CVP API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Paged methods take a half-open `[start, end)` window.
#[async_trait::async_trait]
pub trait CvpClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Check the token against CVP and return server information
    async fn validate_session(&self) -> Result<CvpInfo, CvpError>;

    // Inventory and paged lists
    async fn get_inventory(&self) -> Result<Vec<Device>, CvpError>;
    async fn get_configlets_page(&self, start: u64, end: u64) -> Result<Page<Configlet>, CvpError>;
    async fn get_containers_page(&self, start: u64, end: u64) -> Result<Page<Container>, CvpError>;
    async fn get_image_bundles_page(&self, start: u64, end: u64) -> Result<Page<ImageBundle>, CvpError>;
    async fn get_images_page(&self, start: u64, end: u64) -> Result<Page<Image>, CvpError>;
    async fn get_tasks_page(&self, start: u64, end: u64) -> Result<Page<Task>, CvpError>;

    // Configlet Operations
    async fn get_configlet_by_name(&self, name: &str) -> Result<Option<Configlet>, CvpError>;
    /// Returns the key of the new configlet
    async fn add_configlet(&self, name: &str, config: &str) -> Result<String, CvpError>;
    /// Returns the ids of tasks created for devices using the configlet
    async fn update_configlet(&self, key: &str, name: &str, config: &str) -> Result<Vec<String>, CvpError>;
    async fn delete_configlet(&self, key: &str, name: &str) -> Result<(), CvpError>;
    async fn get_configlets_by_device(&self, device_key: &str) -> Result<Vec<Configlet>, CvpError>;
    async fn get_configlets_by_container(&self, container_key: &str) -> Result<Vec<Configlet>, CvpError>;
    async fn get_devices_by_configlet(&self, name: &str) -> Result<Vec<AppliedDevice>, CvpError>;

    // Container Operations
    async fn add_container(&self, name: &str, parent: &Container) -> Result<TaskResponse, CvpError>;
    async fn delete_container(&self, container: &Container, parent: &Container) -> Result<TaskResponse, CvpError>;
    async fn apply_configlets_to_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError>;
    async fn remove_configlets_from_container(&self, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError>;

    // Device Operations
    async fn apply_configlets_to_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError>;
    async fn remove_configlets_from_device(&self, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError>;
    async fn move_device(&self, device: &Device, container: &Container) -> Result<TaskResponse, CvpError>;
    async fn get_device_image_bundle(&self, device: &Device) -> Result<Option<String>, CvpError>;
    async fn apply_image_bundle_to_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError>;
    async fn remove_image_bundle_from_device(&self, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError>;
    async fn reset_device(&self, device: &Device) -> Result<TaskResponse, CvpError>;
    async fn delete_device(&self, device: &Device) -> Result<(), CvpError>;

    // Image Operations
    async fn get_image_bundle_by_name(&self, name: &str) -> Result<Option<ImageBundle>, CvpError>;
    async fn add_image_bundle(&self, name: &str, images: &[Image], certified: bool) -> Result<(), CvpError>;
    async fn update_image_bundle(&self, bundle: &ImageBundle, images: &[Image], certified: bool) -> Result<(), CvpError>;
    async fn delete_image_bundle(&self, bundle: &ImageBundle) -> Result<(), CvpError>;
    async fn upload_image(&self, path: &Path) -> Result<Image, CvpError>;

    // Task Operations
    async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>, CvpError>;
    async fn execute_task(&self, id: &str) -> Result<(), CvpError>;
    async fn cancel_task(&self, id: &str) -> Result<(), CvpError>;
}
