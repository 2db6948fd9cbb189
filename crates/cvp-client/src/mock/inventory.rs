//! Inventory operations for MockCvpClient
//!
//! Handles devices, containers and topology changes (container create/delete,
//! configlet association, device moves and resets)

use super::helpers::{create_task, new_key, task_response, window};
use super::MockCvpClient;
use crate::error::CvpError;
use crate::models::*;

fn names(configlets: &[Configlet]) -> String {
    configlets.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",")
}

pub async fn get_inventory(client: &MockCvpClient) -> Result<Vec<Device>, CvpError> {
    client.record("get_inventory".to_string())?;
    Ok(client.devices.lock().unwrap().clone())
}

pub async fn get_containers_page(client: &MockCvpClient, start: u64, end: u64) -> Result<Page<Container>, CvpError> {
    client.record_page("containers", start, end)?;
    let devices = client.devices.lock().unwrap().clone();
    let containers = client.containers.lock().unwrap();
    let snapshot: Vec<Container> = containers
        .iter()
        .map(|c| Container {
            child_container_count: containers
                .iter()
                .filter(|child| child.parent_key.as_deref() == Some(c.key.as_str()))
                .count() as u64,
            child_net_element_count: devices
                .iter()
                .filter(|d| d.parent_container_key == c.key)
                .count() as u64,
            ..c.clone()
        })
        .collect();
    Ok(window(&snapshot, start, end))
}

pub async fn add_container(client: &MockCvpClient, name: &str, parent: &Container) -> Result<TaskResponse, CvpError> {
    client.record(format!("add_container:{}", name))?;
    let mut containers = client.containers.lock().unwrap();
    if containers.iter().any(|c| c.name == name) {
        return Err(CvpError::Api(format!("Container {} already exists", name)));
    }
    if !containers.iter().any(|c| c.key == parent.key) {
        return Err(CvpError::Api(format!("Parent container {} does not exist", parent.name)));
    }
    containers.push(Container {
        key: new_key("container"),
        name: name.to_string(),
        parent_name: Some(parent.name.clone()),
        parent_key: Some(parent.key.clone()),
        child_container_count: 0,
        child_net_element_count: 0,
    });
    Ok(task_response(Vec::new()))
}

pub async fn delete_container(client: &MockCvpClient, container: &Container, _parent: &Container) -> Result<TaskResponse, CvpError> {
    client.record(format!("delete_container:{}", container.name))?;
    if container.is_root() {
        return Err(CvpError::Api("The root container cannot be deleted".to_string()));
    }
    let has_devices = client
        .devices
        .lock()
        .unwrap()
        .iter()
        .any(|d| d.parent_container_key == container.key);
    let mut containers = client.containers.lock().unwrap();
    if !containers.iter().any(|c| c.key == container.key) {
        return Err(CvpError::NotFound(format!("Container {} does not exist", container.name)));
    }
    if has_devices || containers.iter().any(|c| c.parent_key.as_deref() == Some(container.key.as_str())) {
        return Err(CvpError::Api(format!("Container {} is not empty", container.name)));
    }
    containers.retain(|c| c.key != container.key);
    client.container_configlets.lock().unwrap().remove(&container.key);
    Ok(task_response(Vec::new()))
}

/// One task per device directly inside the container
fn container_tasks(client: &MockCvpClient, container: &Container, description: &str) -> Vec<String> {
    let hostnames: Vec<String> = client
        .devices
        .lock()
        .unwrap()
        .iter()
        .filter(|d| d.parent_container_key == container.key)
        .map(|d| d.hostname.clone())
        .collect();
    hostnames
        .iter()
        .map(|h| create_task(client, h, description))
        .collect()
}

fn ensure_container(client: &MockCvpClient, container: &Container) -> Result<(), CvpError> {
    if client.containers.lock().unwrap().iter().any(|c| c.key == container.key) {
        Ok(())
    } else {
        Err(CvpError::NotFound(format!("Container {} does not exist", container.name)))
    }
}

fn ensure_device(client: &MockCvpClient, device: &Device) -> Result<(), CvpError> {
    if client.devices.lock().unwrap().iter().any(|d| d.key == device.key) {
        Ok(())
    } else {
        Err(CvpError::NotFound(format!("Device {} does not exist", device.hostname)))
    }
}

pub async fn apply_configlets_to_container(client: &MockCvpClient, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
    client.record(format!("apply_configlets_to_container:{}:{}", container.name, names(configlets)))?;
    ensure_container(client, container)?;
    {
        let mut attached = client.container_configlets.lock().unwrap();
        let keys = attached.entry(container.key.clone()).or_default();
        for configlet in configlets {
            if !keys.contains(&configlet.key) {
                keys.push(configlet.key.clone());
            }
        }
    }
    Ok(task_response(container_tasks(client, container, "Container configlets applied")))
}

pub async fn remove_configlets_from_container(client: &MockCvpClient, container: &Container, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
    client.record(format!("remove_configlets_from_container:{}:{}", container.name, names(configlets)))?;
    ensure_container(client, container)?;
    if let Some(keys) = client.container_configlets.lock().unwrap().get_mut(&container.key) {
        keys.retain(|k| !configlets.iter().any(|c| &c.key == k));
    }
    Ok(task_response(container_tasks(client, container, "Container configlets removed")))
}

pub async fn apply_configlets_to_device(client: &MockCvpClient, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
    client.record(format!("apply_configlets_to_device:{}:{}", device.hostname, names(configlets)))?;
    ensure_device(client, device)?;
    {
        let mut attached = client.device_configlets.lock().unwrap();
        let keys = attached.entry(device.key.clone()).or_default();
        for configlet in configlets {
            if !keys.contains(&configlet.key) {
                keys.push(configlet.key.clone());
            }
        }
    }
    let task = create_task(client, &device.hostname, "Configlet Assign");
    Ok(task_response(vec![task]))
}

pub async fn remove_configlets_from_device(client: &MockCvpClient, device: &Device, configlets: &[Configlet]) -> Result<TaskResponse, CvpError> {
    client.record(format!("remove_configlets_from_device:{}:{}", device.hostname, names(configlets)))?;
    ensure_device(client, device)?;
    if let Some(keys) = client.device_configlets.lock().unwrap().get_mut(&device.key) {
        keys.retain(|k| !configlets.iter().any(|c| &c.key == k));
    }
    let task = create_task(client, &device.hostname, "Configlet Remove");
    Ok(task_response(vec![task]))
}

pub async fn move_device(client: &MockCvpClient, device: &Device, container: &Container) -> Result<TaskResponse, CvpError> {
    client.record(format!("move_device:{}:{}", device.hostname, container.name))?;
    ensure_container(client, container)?;
    {
        let mut devices = client.devices.lock().unwrap();
        let stored = devices
            .iter_mut()
            .find(|d| d.key == device.key)
            .ok_or_else(|| CvpError::NotFound(format!("Device {} does not exist", device.hostname)))?;
        stored.parent_container_key = container.key.clone();
        stored.parent_container_name = container.name.clone();
    }
    let task = create_task(client, &device.hostname, "Device Move");
    Ok(task_response(vec![task]))
}

pub async fn reset_device(client: &MockCvpClient, device: &Device) -> Result<TaskResponse, CvpError> {
    client.record(format!("reset_device:{}", device.hostname))?;
    let undefined = client
        .containers
        .lock()
        .unwrap()
        .iter()
        .find(|c| c.name == UNDEFINED_CONTAINER_NAME)
        .cloned();
    {
        let mut devices = client.devices.lock().unwrap();
        let stored = devices
            .iter_mut()
            .find(|d| d.key == device.key)
            .ok_or_else(|| CvpError::NotFound(format!("Device {} does not exist", device.hostname)))?;
        if let Some(undefined) = undefined {
            stored.parent_container_key = undefined.key;
            stored.parent_container_name = undefined.name;
        }
    }
    client.device_configlets.lock().unwrap().remove(&device.key);
    client.device_bundles.lock().unwrap().remove(&device.key);
    let task = create_task(client, &device.hostname, "Device Reset");
    Ok(task_response(vec![task]))
}

pub async fn delete_device(client: &MockCvpClient, device: &Device) -> Result<(), CvpError> {
    client.record(format!("delete_device:{}", device.hostname))?;
    ensure_device(client, device)?;
    client.devices.lock().unwrap().retain(|d| d.key != device.key);
    client.device_configlets.lock().unwrap().remove(&device.key);
    client.device_bundles.lock().unwrap().remove(&device.key);
    Ok(())
}
