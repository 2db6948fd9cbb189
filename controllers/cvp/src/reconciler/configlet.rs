//! Configlet reconciler

use super::{ManagerResult, Reconciler};
use crate::diff::config_text_diff;
use crate::error::ControllerError;
use crate::facts::FactScope;
use cvp_state::{DesiredState, ResourceState};
use tracing::{debug, info, warn};

pub const MANAGER: &str = "configlets";

impl Reconciler {
    pub async fn reconcile_configlets(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        info!("Reconciling {} configlets", state.configlets.len());
        match state.state {
            ResourceState::Absent => self.remove_configlets(state).await,
            _ => self.apply_configlets(state).await,
        }
    }

    /// Create missing configlets and update the ones whose content drifted
    async fn apply_configlets(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        let facts = self.facts(&[FactScope::Configlets]).await?;
        let mut result = ManagerResult::new(MANAGER);

        for (name, config) in &state.configlets {
            match facts.configlet(name) {
                Some(existing) => {
                    let Some(diff) = config_text_diff(name, &existing.config, config) else {
                        debug!("Configlet {} is up to date", name);
                        continue;
                    };
                    result.diff.insert(name.clone(), diff);

                    if self.options.dry_run {
                        info!("[dry run] Would update configlet {}", name);
                    } else {
                        let task_ids = self.client.update_configlet(&existing.key, name, config).await?;
                        info!("Updated configlet {} ({} tasks)", name, task_ids.len());
                        result.add_tasks(&task_ids);
                    }
                    result.record(name.clone());
                }
                None => {
                    if let Some(diff) = config_text_diff(name, "", config) {
                        result.diff.insert(name.clone(), diff);
                    }

                    if self.options.dry_run {
                        info!("[dry run] Would create configlet {}", name);
                    } else {
                        let key = self.client.add_configlet(name, config).await?;
                        info!("Created configlet {} (key: {})", name, key);
                    }
                    result.record(name.clone());
                }
            }
        }

        Ok(result)
    }

    /// Delete declared configlets that nothing uses any more
    async fn remove_configlets(&self, state: &DesiredState) -> Result<ManagerResult, ControllerError> {
        let facts = self.facts(&[FactScope::Configlets, FactScope::Containers]).await?;
        let mut result = ManagerResult::new(MANAGER);

        for name in state.configlets.keys() {
            let Some(existing) = facts.configlet(name) else {
                debug!("Configlet {} already absent", name);
                continue;
            };

            let devices = self.client.get_devices_by_configlet(name).await?;
            if !devices.is_empty() {
                let hostnames: Vec<&str> = devices.iter().map(|d| d.hostname.as_str()).collect();
                let msg = format!(
                    "Configlet {} is still applied to {}; not deleted",
                    name,
                    hostnames.join(", ")
                );
                warn!("{}", msg);
                result.message(msg);
                continue;
            }

            let containers: Vec<&str> = facts
                .containers
                .iter()
                .filter(|(_, c)| c.configlets.contains(name))
                .map(|(container, _)| container.as_str())
                .collect();
            if !containers.is_empty() {
                let msg = format!(
                    "Configlet {} is still applied to containers {}; not deleted",
                    name,
                    containers.join(", ")
                );
                warn!("{}", msg);
                result.message(msg);
                continue;
            }

            if self.options.dry_run {
                info!("[dry run] Would delete configlet {}", name);
            } else {
                self.client.delete_configlet(&existing.key, name).await?;
                info!("Deleted configlet {}", name);
            }
            result.record(name.clone());
        }

        Ok(result)
    }
}
