//! Container reconciler
//!
//! Creation walks the declared tree parent-first, deletion walks it
//! child-first. Container configlets follow the container mode: `merge`
//! only attaches, `override` also detaches what is not declared.

use super::{ManagerResult, Reconciler};
use crate::diff::diff_configlets;
use crate::error::ControllerError;
use crate::facts::{CvpFacts, FactScope};
use crate::reconcile_helpers::{join_names, resolve_configlets, resolve_container};
use crate::topology::ContainerTree;
use cvp_client::{fetch_all_concurrently, Container, Device, ROOT_CONTAINER_NAME};
use cvp_state::{ApplyMode, ContainerMode, ContainerSpec, DesiredState, InventoryMode, ResourceState};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const MANAGER: &str = "containers";

impl Reconciler {
    pub async fn reconcile_containers(
        &self,
        state: &DesiredState,
        tree: &ContainerTree,
    ) -> Result<ManagerResult, ControllerError> {
        info!(
            "Reconciling {} containers (mode: {})",
            state.containers.len(),
            self.options.container_mode
        );
        if state.state == ResourceState::Absent || self.options.container_mode == ContainerMode::Delete {
            self.remove_containers(tree).await
        } else {
            self.apply_containers(state, tree).await
        }
    }

    async fn apply_containers(
        &self,
        state: &DesiredState,
        tree: &ContainerTree,
    ) -> Result<ManagerResult, ControllerError> {
        let facts = self
            .facts(&[FactScope::Containers, FactScope::Devices, FactScope::Configlets])
            .await?;
        let mut result = ManagerResult::new(MANAGER);

        for anchor in tree.anchors() {
            if facts.container(anchor).is_none() {
                return Err(ControllerError::ContainerNotFound(format!(
                    "{} (parent of declared containers) does not exist in CVP",
                    anchor
                )));
            }
        }

        let mut known: HashMap<String, Container> = facts
            .inventory
            .containers
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();
        let mut planned: HashSet<String> = HashSet::new();

        for name in tree.to_create(|n| facts.containers.contains_key(n)) {
            let parent_name = tree.parent(&name).unwrap_or(ROOT_CONTAINER_NAME);

            if self.options.dry_run {
                info!("[dry run] Would create container {} under {}", name, parent_name);
                planned.insert(name.clone());
                result.record(name);
                continue;
            }

            if !known.contains_key(parent_name) {
                known = self.refresh_containers().await?;
            }
            let parent = known
                .get(parent_name)
                .cloned()
                .ok_or_else(|| ControllerError::ContainerNotFound(parent_name.to_string()))?;

            let response = self.client.add_container(&name, &parent).await?;
            info!("Created container {} under {}", name, parent_name);
            result.add_tasks(&response.task_ids);
            result.record(name);
        }

        if !self.options.dry_run && result.changed {
            known = self.refresh_containers().await?;
        }

        for (name, spec) in &state.containers {
            let container = match known.get(name) {
                Some(c) => c.clone(),
                None => resolve_container(&facts, name, |n| planned.contains(n))?,
            };
            self.sync_container_configlets(state, &facts, &container, spec, &mut result)
                .await?;
            self.sync_container_devices(&facts, &container, spec, &mut result)
                .await?;
            if let Some(bundle) = &spec.image_bundle {
                self.sync_container_image_bundle(&facts, &container, spec, bundle, &mut result)
                    .await?;
            }
        }

        Ok(result)
    }

    async fn refresh_containers(&self) -> Result<HashMap<String, Container>, ControllerError> {
        let containers = fetch_all_concurrently(
            |start, end| self.client.get_containers_page(start, end),
            self.options.workers,
        )
        .await?;
        Ok(containers.into_iter().map(|c| (c.name.clone(), c)).collect())
    }

    async fn sync_container_configlets(
        &self,
        state: &DesiredState,
        facts: &CvpFacts,
        container: &Container,
        spec: &ContainerSpec,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        let current = facts
            .containers
            .get(&container.name)
            .map(|c| c.configlets.clone())
            .unwrap_or_default();
        let mode = match self.options.container_mode {
            ContainerMode::Override => ApplyMode::Strict,
            _ => ApplyMode::Loose,
        };
        let diff = diff_configlets(&spec.configlets, &current, mode);
        if diff.is_empty() {
            debug!("Container {} configlets are up to date", container.name);
            return Ok(());
        }

        let dry_run = self.options.dry_run;
        let planned = |n: &str| dry_run && state.configlets.contains_key(n);

        if !diff.to_add.is_empty() {
            let configlets = resolve_configlets(facts, &diff.to_add, planned)?;
            if dry_run {
                info!("[dry run] Would attach {} to container {}", join_names(&diff.to_add), container.name);
            } else {
                let response = self.client.apply_configlets_to_container(container, &configlets).await?;
                info!("Attached {} to container {}", join_names(&diff.to_add), container.name);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{}: +{}", container.name, join_names(&diff.to_add)));
        }

        if !diff.to_remove.is_empty() {
            let configlets = resolve_configlets(facts, &diff.to_remove, planned)?;
            if dry_run {
                info!("[dry run] Would detach {} from container {}", join_names(&diff.to_remove), container.name);
            } else {
                let response = self.client.remove_configlets_from_container(container, &configlets).await?;
                info!("Detached {} from container {}", join_names(&diff.to_remove), container.name);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{}: -{}", container.name, join_names(&diff.to_remove)));
        }

        Ok(())
    }

    /// Move the devices a container lists into it
    async fn sync_container_devices(
        &self,
        facts: &CvpFacts,
        container: &Container,
        spec: &ContainerSpec,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        for value in &spec.devices {
            let Some(device) = facts.device(self.options.search_key, value) else {
                let msg = format!(
                    "Device {} {} listed in container {} is not in the inventory",
                    self.options.search_key, value, container.name
                );
                if self.options.inventory_mode == InventoryMode::Strict {
                    return Err(ControllerError::DeviceNotFound(msg));
                }
                warn!("{}", msg);
                result.message(msg);
                continue;
            };

            if device.parent_container_name == container.name {
                continue;
            }
            if self.options.dry_run {
                info!("[dry run] Would move {} to container {}", device.hostname, container.name);
            } else {
                let response = self.client.move_device(device, container).await?;
                info!("Moved {} from {} to {}", device.hostname, device.parent_container_name, container.name);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{} -> {}", device.hostname, container.name));
        }
        Ok(())
    }

    /// Apply the container's image bundle to every device it holds
    async fn sync_container_image_bundle(
        &self,
        facts: &CvpFacts,
        container: &Container,
        spec: &ContainerSpec,
        bundle_name: &str,
        result: &mut ManagerResult,
    ) -> Result<(), ControllerError> {
        let search_key = self.options.search_key;
        let members: Vec<&Device> = facts
            .inventory
            .devices
            .iter()
            .filter(|d| facts.in_scope(&d.hostname))
            .filter(|d| {
                d.parent_container_name == container.name
                    || spec.devices.iter().any(|v| facts.device(search_key, v).map(|m| &m.key) == Some(&d.key))
            })
            .collect();
        let pending: Vec<&Device> = members
            .into_iter()
            .filter(|d| {
                facts
                    .device_fact(&d.key)
                    .and_then(|f| f.image_bundle.as_deref())
                    != Some(bundle_name)
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let bundle = self.lookup_bundle(bundle_name).await?;

        for device in pending {
            if self.options.dry_run {
                info!("[dry run] Would apply image bundle {} to {}", bundle_name, device.hostname);
            } else {
                let response = self.client.apply_image_bundle_to_device(device, &bundle).await?;
                info!("Applied image bundle {} to {} (container {})", bundle_name, device.hostname, container.name);
                result.add_tasks(&response.task_ids);
            }
            result.record(format!("{}: image bundle {}", device.hostname, bundle_name));
        }
        Ok(())
    }

    /// Delete declared containers children-first
    ///
    /// Missing containers are skipped. A container that still holds devices,
    /// or children this run does not delete, is refused.
    async fn remove_containers(&self, tree: &ContainerTree) -> Result<ManagerResult, ControllerError> {
        let facts = self.facts(&[FactScope::Containers, FactScope::Devices]).await?;
        let mut result = ManagerResult::new(MANAGER);
        let mut deleted: HashSet<String> = HashSet::new();

        for name in tree.to_delete(|n| facts.containers.contains_key(n)) {
            let Some(container) = facts.container(&name) else { continue };

            if container.is_root() || name == ROOT_CONTAINER_NAME {
                result.fail(format!("Refusing to delete the root container {}", name));
                continue;
            }

            let devices: Vec<&str> = facts.devices_in(&name).iter().map(|d| d.hostname.as_str()).collect();
            if !devices.is_empty() {
                result.fail(format!(
                    "Container {} still holds devices {}; not deleted",
                    name,
                    devices.join(", ")
                ));
                continue;
            }

            let remaining: Vec<&str> = facts
                .child_containers(&name)
                .into_iter()
                .filter(|child| !deleted.contains(*child))
                .collect();
            if !remaining.is_empty() {
                result.fail(format!(
                    "Container {} still holds containers {}; not deleted",
                    name,
                    remaining.join(", ")
                ));
                continue;
            }

            let parent_name = container.parent_name.as_deref().unwrap_or(ROOT_CONTAINER_NAME);
            let parent = facts
                .container(parent_name)
                .cloned()
                .ok_or_else(|| ControllerError::ContainerNotFound(parent_name.to_string()))?;

            if self.options.dry_run {
                info!("[dry run] Would delete container {}", name);
            } else {
                let response = self.client.delete_container(container, &parent).await?;
                info!("Deleted container {}", name);
                result.add_tasks(&response.task_ids);
            }
            deleted.insert(name.clone());
            result.record(name);
        }

        Ok(result)
    }
}
