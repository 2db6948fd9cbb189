//! Image and image bundle operations for MockCvpClient

use super::helpers::{create_task, new_key, task_response, window};
use super::MockCvpClient;
use crate::error::CvpError;
use crate::models::*;
use std::path::Path;

pub async fn get_image_bundles_page(client: &MockCvpClient, start: u64, end: u64) -> Result<Page<ImageBundle>, CvpError> {
    client.record_page("image_bundles", start, end)?;
    let bundles = client.image_bundles.lock().unwrap();
    Ok(window(bundles.as_slice(), start, end))
}

pub async fn get_images_page(client: &MockCvpClient, start: u64, end: u64) -> Result<Page<Image>, CvpError> {
    client.record_page("images", start, end)?;
    let images = client.images.lock().unwrap();
    Ok(window(images.as_slice(), start, end))
}

pub async fn get_device_image_bundle(client: &MockCvpClient, device: &Device) -> Result<Option<String>, CvpError> {
    client.record(format!("get_device_image_bundle:{}", device.hostname))?;
    Ok(client.device_bundles.lock().unwrap().get(&device.key).cloned())
}

pub async fn apply_image_bundle_to_device(client: &MockCvpClient, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
    client.record(format!("apply_image_bundle_to_device:{}:{}", device.hostname, bundle.name))?;
    if client.image_bundle_by_name(&bundle.name).is_none() {
        return Err(CvpError::NotFound(format!("Image bundle {} does not exist", bundle.name)));
    }
    client
        .device_bundles
        .lock()
        .unwrap()
        .insert(device.key.clone(), bundle.name.clone());
    let task = create_task(client, &device.hostname, "Image Bundle Assign");
    Ok(task_response(vec![task]))
}

pub async fn remove_image_bundle_from_device(client: &MockCvpClient, device: &Device, bundle: &ImageBundle) -> Result<TaskResponse, CvpError> {
    client.record(format!("remove_image_bundle_from_device:{}:{}", device.hostname, bundle.name))?;
    let removed = {
        let mut applied = client.device_bundles.lock().unwrap();
        match applied.get(&device.key) {
            Some(current) if current == &bundle.name => applied.remove(&device.key).is_some(),
            _ => false,
        }
    };
    if !removed {
        return Ok(task_response(Vec::new()));
    }
    let task = create_task(client, &device.hostname, "Image Bundle Remove");
    Ok(task_response(vec![task]))
}

pub async fn get_image_bundle_by_name(client: &MockCvpClient, name: &str) -> Result<Option<ImageBundle>, CvpError> {
    client.record(format!("get_image_bundle_by_name:{}", name))?;
    Ok(client.image_bundle_by_name(name))
}

pub async fn add_image_bundle(client: &MockCvpClient, name: &str, bundle_images: &[Image], certified: bool) -> Result<(), CvpError> {
    client.record(format!("add_image_bundle:{}", name))?;
    let mut bundles = client.image_bundles.lock().unwrap();
    if bundles.iter().any(|b| b.name == name) {
        return Err(CvpError::Api(format!("Image bundle {} already exists", name)));
    }
    bundles.push(ImageBundle {
        key: new_key("imagebundle"),
        name: name.to_string(),
        images: bundle_images.to_vec(),
        image_ids: bundle_images.iter().map(|i| i.key.clone()).collect(),
        is_certified: certified,
    });
    Ok(())
}

pub async fn update_image_bundle(client: &MockCvpClient, bundle: &ImageBundle, bundle_images: &[Image], certified: bool) -> Result<(), CvpError> {
    client.record(format!("update_image_bundle:{}", bundle.name))?;
    let mut bundles = client.image_bundles.lock().unwrap();
    let stored = bundles
        .iter_mut()
        .find(|b| b.key == bundle.key)
        .ok_or_else(|| CvpError::NotFound(format!("Image bundle {} does not exist", bundle.name)))?;
    stored.images = bundle_images.to_vec();
    stored.image_ids = bundle_images.iter().map(|i| i.key.clone()).collect();
    stored.is_certified = certified;
    Ok(())
}

pub async fn delete_image_bundle(client: &MockCvpClient, bundle: &ImageBundle) -> Result<(), CvpError> {
    client.record(format!("delete_image_bundle:{}", bundle.name))?;
    let in_use = client
        .device_bundles
        .lock()
        .unwrap()
        .values()
        .any(|name| name == &bundle.name);
    if in_use {
        return Err(CvpError::Api(format!("Image bundle {} is applied to devices", bundle.name)));
    }
    let mut bundles = client.image_bundles.lock().unwrap();
    let before = bundles.len();
    bundles.retain(|b| b.key != bundle.key);
    if bundles.len() == before {
        return Err(CvpError::NotFound(format!("Image bundle {} does not exist", bundle.name)));
    }
    Ok(())
}

pub async fn upload_image(client: &MockCvpClient, path: &Path) -> Result<Image, CvpError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CvpError::InvalidRequest(format!("Invalid image path: {}", path.display())))?
        .to_string();
    client.record(format!("upload_image:{}", name))?;
    let size = tokio::fs::metadata(path).await?.len();

    let image = Image {
        key: name.clone(),
        name,
        image_size: size.to_string(),
        sha512: None,
    };
    let mut images = client.images.lock().unwrap();
    images.retain(|i| i.name != image.name);
    images.push(image.clone());
    Ok(image)
}
