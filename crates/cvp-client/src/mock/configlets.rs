//! Configlet operations for MockCvpClient

use super::helpers::{create_task, new_key, window};
use super::MockCvpClient;
use crate::error::CvpError;
use crate::models::*;

pub async fn get_configlets_page(client: &MockCvpClient, start: u64, end: u64) -> Result<Page<Configlet>, CvpError> {
    client.record_page("configlets", start, end)?;
    let configlets = client.configlets.lock().unwrap();
    Ok(window(configlets.as_slice(), start, end))
}

pub async fn get_configlet_by_name(client: &MockCvpClient, name: &str) -> Result<Option<Configlet>, CvpError> {
    client.record(format!("get_configlet_by_name:{}", name))?;
    Ok(client.configlet_by_name(name))
}

pub async fn add_configlet(client: &MockCvpClient, name: &str, config: &str) -> Result<String, CvpError> {
    client.record(format!("add_configlet:{}", name))?;
    let mut configlets = client.configlets.lock().unwrap();
    if configlets.iter().any(|c| c.name == name) {
        return Err(CvpError::Api(format!("Configlet {} already exists", name)));
    }
    let key = new_key("configlet");
    configlets.push(Configlet {
        key: key.clone(),
        name: name.to_string(),
        config: config.to_string(),
        configlet_type: "Static".to_string(),
        note: String::new(),
        last_changed: chrono::Utc::now().timestamp_millis(),
    });
    Ok(key)
}

/// Replace the configlet text; every device running it gets a task
pub async fn update_configlet(client: &MockCvpClient, key: &str, name: &str, config: &str) -> Result<Vec<String>, CvpError> {
    client.record(format!("update_configlet:{}", name))?;
    {
        let mut configlets = client.configlets.lock().unwrap();
        let stored = configlets
            .iter_mut()
            .find(|c| c.key == key)
            .ok_or_else(|| CvpError::NotFound(format!("Configlet {} does not exist", name)))?;
        stored.name = name.to_string();
        stored.config = config.to_string();
        stored.last_changed = chrono::Utc::now().timestamp_millis();
    }

    let hostnames = attached_hostnames(client, key);
    Ok(hostnames
        .iter()
        .map(|h| create_task(client, h, &format!("Configlet {} updated", name)))
        .collect())
}

pub async fn delete_configlet(client: &MockCvpClient, key: &str, name: &str) -> Result<(), CvpError> {
    client.record(format!("delete_configlet:{}", name))?;
    if !attached_hostnames(client, key).is_empty() {
        return Err(CvpError::Api(format!("Configlet {} is applied to devices", name)));
    }
    let in_use = client
        .container_configlets
        .lock()
        .unwrap()
        .values()
        .any(|keys| keys.iter().any(|k| k == key));
    if in_use {
        return Err(CvpError::Api(format!("Configlet {} is applied to containers", name)));
    }

    let mut configlets = client.configlets.lock().unwrap();
    let before = configlets.len();
    configlets.retain(|c| c.key != key);
    if configlets.len() == before {
        return Err(CvpError::NotFound(format!("Configlet {} does not exist", name)));
    }
    Ok(())
}

pub async fn get_configlets_by_device(client: &MockCvpClient, device_key: &str) -> Result<Vec<Configlet>, CvpError> {
    client.record(format!("get_configlets_by_device:{}", device_key))?;
    let keys = client
        .device_configlets
        .lock()
        .unwrap()
        .get(device_key)
        .cloned()
        .unwrap_or_default();
    Ok(resolve(client, &keys))
}

pub async fn get_configlets_by_container(client: &MockCvpClient, container_key: &str) -> Result<Vec<Configlet>, CvpError> {
    client.record(format!("get_configlets_by_container:{}", container_key))?;
    let keys = client
        .container_configlets
        .lock()
        .unwrap()
        .get(container_key)
        .cloned()
        .unwrap_or_default();
    Ok(resolve(client, &keys))
}

pub async fn get_devices_by_configlet(client: &MockCvpClient, name: &str) -> Result<Vec<AppliedDevice>, CvpError> {
    client.record(format!("get_devices_by_configlet:{}", name))?;
    let Some(configlet) = client.configlet_by_name(name) else {
        return Err(CvpError::NotFound(format!("Configlet {} does not exist", name)));
    };
    let hostnames = attached_hostnames(client, &configlet.key);
    let devices = client.devices.lock().unwrap();
    Ok(devices
        .iter()
        .filter(|d| hostnames.contains(&d.hostname))
        .map(|d| AppliedDevice {
            hostname: d.hostname.clone(),
            mac_address: d.system_mac_address.clone(),
            ip_address: d.ip_address.clone(),
        })
        .collect())
}

/// Hostnames of devices with the configlet directly attached
fn attached_hostnames(client: &MockCvpClient, configlet_key: &str) -> Vec<String> {
    let device_keys: Vec<String> = client
        .device_configlets
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, keys)| keys.iter().any(|k| k == configlet_key))
        .map(|(device_key, _)| device_key.clone())
        .collect();
    client
        .devices
        .lock()
        .unwrap()
        .iter()
        .filter(|d| device_keys.contains(&d.key))
        .map(|d| d.hostname.clone())
        .collect()
}

fn resolve(client: &MockCvpClient, keys: &[String]) -> Vec<Configlet> {
    let configlets = client.configlets.lock().unwrap();
    keys.iter()
        .filter_map(|k| configlets.iter().find(|c| &c.key == k).cloned())
        .collect()
}
