//! Device reconciler

use super::{ManagerResult, Reconciler};
use crate::diff::diff_configlets;
use crate::error::ControllerError;
use crate::facts::{CvpFacts, FactScope};
use crate::reconcile_helpers::{join_names, resolve_configlets, resolve_container};
use cvp_client::{Device, ImageBundle};
use cvp_state::{ApplyMode, DesiredState, DeviceSpec, InventoryMode, ResourceState};
use tracing::{debug, info, warn};

pub const MANAGER: &str = "devices";

impl Reconciler {
    pub async fn reconcile_devices(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        info!(
            "Reconciling {} devices (search key: {}, apply mode: {})",
            state.devices.len(),
            self.options.search_key,
            self.options.apply_mode
        );
        let facts = self
            .facts(&[FactScope::Devices, FactScope::Containers, FactScope::Configlets])
            .await?;
        let mut result = ManagerResult::new(MANAGER);

        for spec in &state.devices {
            let value = spec.search_value(self.options.search_key).unwrap_or_default();
            let Some(device) = facts.device(self.options.search_key, value) else {
                let msg = format!(
                    "Device {} {} is not in the CVP inventory",
                    self.options.search_key, value
                );
                if self.options.inventory_mode == InventoryMode::Strict {
                    return Err(ControllerError::DeviceNotFound(msg));
                }
                warn!("{}", msg);
                result.message(msg);
                continue;
            };

            match state.device_state(spec) {
                ResourceState::Absent => self.remove_device(device, &mut result).await?,
                ResourceState::FactoryReset => self.reset_device(device, &mut result).await?,
                ResourceState::Present => {
                    self.place_device(state, &facts, device, spec, &mut result).await?;
                    self.sync_device_configlets(state, &facts, device, spec, &mut result).await?;
                    self.sync_device_image_bundle(&facts, device, spec, &mut result).await?;
                }
            }
        }

        Ok(result)
    }

    async fn remove_device(&self, device: &Device, result: &mut ManagerResult) -> Result<(), ControllerError> {
        if self.options.dry_run {
            info!("[dry run] Would remove {} from the inventory", device.hostname);
        } else {
            self.client.delete_device(device).await?;
            info!("Removed {} from the inventory", device.hostname);
        }
        result.record(format!("{}: removed", device.hostname));
        Ok(())
    }

    async fn reset_device(&self, device: &Device, result: &mut ManagerResult) -> Result<(), ControllerError> {
        if self.options.dry_run {
            info!("[dry run] Would factory reset {}", device.hostname);
        } else {
            let response = self.client.reset_device(device).await?;
            info!("Factory reset {} ({} tasks)", device.hostname, response.task_ids.len());
            result.add_tasks(&response.task_ids);
        }
        result.record(format!("{}: factory reset", device.hostname));
        Ok(())
    }

    /// Move the device to its declared container
    async fn place_device(
        &self,
        state: &DesiredState,
        facts: &CvpFacts,
        device: &Device,
        spec: &DeviceSpec,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        let Some(target) = spec.parent_container_name.as_deref() else {
            return Ok(());
        };
        if device.parent_container_name == target {
            return Ok(());
        }

        let dry_run = self.options.dry_run;
        let container = resolve_container(facts, target, |n| dry_run && state.containers.contains_key(n))?;

        if dry_run {
            info!("[dry run] Would move {} from {} to {}", device.hostname, device.parent_container_name, target);
        } else {
            let response = self.client.move_device(device, &container).await?;
            info!("Moved {} from {} to {}", device.hostname, device.parent_container_name, target);
            result.add_tasks(&response.task_ids);
        }
        result.record(format!("{} -> {}", device.hostname, target));
        Ok(())
    }

    async fn sync_device_configlets(
        &self,
        state: &DesiredState,
        facts: &CvpFacts,
        device: &Device,
        spec: &DeviceSpec,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        let current = facts
            .device_fact(&device.key)
            .map(|f| f.configlets.clone())
            .unwrap_or_default();
        let diff = diff_configlets(&spec.configlets, &current, self.options.apply_mode);
        if diff.is_empty() {
            debug!("Device {} configlets are up to date", device.hostname);
            return Ok(());
        }

        let dry_run = self.options.dry_run;
        let planned = |n: &str| dry_run && state.configlets.contains_key(n);

        if !diff.to_add.is_empty() {
            let configlets = resolve_configlets(facts, &diff.to_add, planned)?;
            if dry_run {
                info!("[dry run] Would attach {} to {}", join_names(&diff.to_add), device.hostname);
            } else {
                let response = self.client.apply_configlets_to_device(device, &configlets).await?;
                info!("Attached {} to {}", join_names(&diff.to_add), device.hostname);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{}: +{}", device.hostname, join_names(&diff.to_add)));
        }

        if !diff.to_remove.is_empty() {
            let configlets = resolve_configlets(facts, &diff.to_remove, planned)?;
            if dry_run {
                info!("[dry run] Would detach {} from {}", join_names(&diff.to_remove), device.hostname);
            } else {
                let response = self.client.remove_configlets_from_device(device, &configlets).await?;
                info!("Detached {} from {}", join_names(&diff.to_remove), device.hostname);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{}: -{}", device.hostname, join_names(&diff.to_remove)));
        }

        debug!("Device {} configlets now {}", device.hostname, join_names(&diff.resulting(&current)));
        Ok(())
    }

    /// Attach the declared bundle; in strict mode an undeclared bundle is detached
    async fn sync_device_image_bundle(
        &self,
        facts: &CvpFacts,
        device: &Device,
        spec: &DeviceSpec,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        let current = facts
            .device_fact(&device.key)
            .and_then(|f| f.image_bundle.clone());

        match (spec.image_bundle.as_deref(), current.as_deref()) {
            (Some(desired), Some(current)) if desired == current => Ok(()),
            (Some(desired), _) => {
                let bundle = self.lookup_bundle(desired).await?;
                if self.options.dry_run {
                    info!("[dry run] Would apply image bundle {} to {}", desired, device.hostname);
                } else {
                    let response = self.client.apply_image_bundle_to_device(device, &bundle).await?;
                    info!("Applied image bundle {} to {}", desired, device.hostname);
                    result.add_tasks(&response.task_ids);
                }
                result.record(format!("{}: image bundle {}", device.hostname, desired));
                Ok(())
            }
            (None, Some(current)) if self.options.apply_mode == ApplyMode::Strict => {
                let bundle = self.lookup_bundle(current).await?;
                if self.options.dry_run {
                    info!("[dry run] Would remove image bundle {} from {}", current, device.hostname);
                } else {
                    let response = self.client.remove_image_bundle_from_device(device, &bundle).await?;
                    info!("Removed image bundle {} from {}", current, device.hostname);
                    result.add_tasks(&response.task_ids);
                }
                result.record(format!("{}: image bundle -{}", device.hostname, current));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub(crate) async fn lookup_bundle(&self, name: &str) -> Result<ImageBundle, ControllerError> {
        match self.client.get_image_bundle_by_name(name).await? {
            Some(bundle) => Ok(bundle),
            None if self.options.dry_run => Ok(ImageBundle {
                name: name.to_string(),
                ..Default::default()
            }),
            None => Err(ControllerError::ImageBundleNotFound(name.to_string())),
        }
    }
}
