//! Reconciliation of CVP resources against the desired state.
//!
//! One manager per resource family, each in its own module:
//! - `configlet`: configlet content
//! - `image`: image bundles
//! - `container`: container hierarchy and container configlets
//! - `device`: device placement, configlets, image bundles, reset and removal
//! - `task`: executing or cancelling tasks
//!
//! Managers re-collect the facts they need, so each sees the changes made by
//! the managers that ran before it.

pub mod configlet;
#[cfg(test)]
mod configlet_test;
pub mod container;
#[cfg(test)]
mod container_test;
pub mod device;
pub mod image;
#[cfg(test)]
mod image_test;
pub mod task;

use crate::error::ControllerError;
use crate::facts::{CvpFacts, FactCollector, FactScope};
use crate::topology::ContainerTree;
use cvp_client::{CvpClientTrait, ROOT_CONTAINER_NAME};
use cvp_state::{
    ApplyMode, ContainerMode, DesiredState, InventoryMode, ResourceState, SearchKey,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Behaviour switches shared by every manager
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Concurrent requests when fetching paged lists
    pub workers: usize,
    /// Report planned changes without making them
    pub dry_run: bool,
    pub apply_mode: ApplyMode,
    pub container_mode: ContainerMode,
    pub search_key: SearchKey,
    pub inventory_mode: InventoryMode,
    /// Execute the tasks generated by this run
    pub execute_tasks: bool,
    /// How long to wait for executed tasks; zero disables waiting
    pub task_timeout: Duration,
    /// Regex on hostnames limiting which devices the managers act on
    pub fact_filter: Option<String>,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            dry_run: false,
            apply_mode: ApplyMode::Loose,
            container_mode: ContainerMode::Merge,
            search_key: SearchKey::Hostname,
            inventory_mode: InventoryMode::Strict,
            execute_tasks: false,
            task_timeout: Duration::from_secs(300),
            fact_filter: None,
        }
    }
}

/// Outcome of one manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerResult {
    pub name: String,
    pub success: bool,
    pub changed: bool,
    pub task_ids: Vec<String>,
    /// Resource name -> unified diff of its content
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub diff: BTreeMap<String, String>,
    pub count: usize,
    /// Resources changed (or that would be, in a dry run)
    pub list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl ManagerResult {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            ..Default::default()
        }
    }

    /// Note a changed resource
    pub fn record(&mut self, item: impl Into<String>) {
        self.changed = true;
        self.count += 1;
        self.list.push(item.into());
    }

    pub fn add_tasks(&mut self, task_ids: &[String]) {
        for id in task_ids {
            if !self.task_ids.contains(id) {
                self.task_ids.push(id.clone());
            }
        }
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.messages.push(message.into());
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub success: bool,
    pub changed: bool,
    pub dry_run: bool,
    pub results: Vec<ManagerResult>,
}

impl ReconcileReport {
    fn push(&mut self, result: ManagerResult) {
        self.success &= result.success;
        self.changed |= result.changed;
        self.results.push(result);
    }

    pub fn result(&self, name: &str) -> Option<&ManagerResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Task ids produced by every manager, in run order
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.results.iter().flat_map(|r| r.task_ids.iter()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// Reconciles CVP against a desired-state document.
pub struct Reconciler {
    pub(crate) client: Box<dyn CvpClientTrait>,
    pub(crate) options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(client: impl CvpClientTrait + 'static, options: ReconcilerOptions) -> Self {
        Self {
            client: Box::new(client),
            options,
        }
    }

    pub(crate) async fn facts(&self, scopes: &[FactScope]) -> Result<CvpFacts, ControllerError> {
        let facts = FactCollector::new(self.client.as_ref(), self.options.workers)
            .collect(scopes)
            .await?;
        match &self.options.fact_filter {
            Some(pattern) => facts.scope_devices(pattern),
            None => Ok(facts),
        }
    }

    /// Run every manager the document needs, in dependency order
    ///
    /// Creation runs configlets, image bundles, containers, then devices;
    /// removal runs devices first and containers before the configlets and
    /// bundles they may still hold. A failing manager stops the run.
    pub async fn reconcile(&self, state: &DesiredState) -> Result<ReconcileReport, ControllerError> {
        state.validate(self.options.search_key)?;
        let tree = ContainerTree::build(&state.containers, ROOT_CONTAINER_NAME)?;

        let mut report = ReconcileReport {
            success: true,
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        let removing = state.state == ResourceState::Absent;
        info!(
            "Reconciling CVP {} (state: {}, dry run: {})",
            self.client.base_url(),
            state.state,
            self.options.dry_run
        );

        if !tree.is_empty() {
            debug!("Container creation order: {}", tree.creation_order().join(" -> "));
        }

        let steps: Vec<Step> = if removing {
            vec![Step::Devices, Step::Containers, Step::Configlets, Step::Images]
        } else {
            vec![Step::Configlets, Step::Images, Step::Containers, Step::Devices]
        };

        for step in steps {
            if !step.applies(state) {
                continue;
            }
            let outcome = match step {
                Step::Configlets => self.reconcile_configlets(state).await,
                Step::Images => self.reconcile_image_bundles(state).await,
                Step::Containers => self.reconcile_containers(state, &tree).await,
                Step::Devices => self.reconcile_devices(state).await,
            };
            if !self.finish(&mut report, step.name(), outcome) {
                return Ok(report);
            }
        }

        let mut task_ids = state.tasks.clone();
        if self.options.execute_tasks {
            for id in report.task_ids() {
                if !task_ids.contains(&id) {
                    task_ids.push(id);
                }
            }
        }
        if !task_ids.is_empty() {
            let outcome = self.reconcile_tasks(&task_ids, state.task_state).await;
            self.finish(&mut report, task::MANAGER, outcome);
        }

        info!(
            "Reconciliation finished: success={}, changed={}",
            report.success, report.changed
        );
        Ok(report)
    }

    /// Add a manager outcome to the report; false when the run must stop
    fn finish(
        &self,
        report: &mut ReconcileReport,
        name: &str,
        outcome: Result<ManagerResult, ControllerError>,
    ) -> bool {
        match outcome {
            Ok(result) => {
                if !result.success {
                    warn!("Manager {} reported failures: {:?}", name, result.messages);
                }
                let ok = result.success;
                report.push(result);
                ok
            }
            Err(e) => {
                let error_msg = format!("{} manager failed: {}", name, e);
                error!("{}", error_msg);
                let mut result = ManagerResult::new(name);
                result.fail(error_msg);
                report.push(result);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Configlets,
    Images,
    Containers,
    Devices,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Configlets => configlet::MANAGER,
            Step::Images => image::MANAGER,
            Step::Containers => container::MANAGER,
            Step::Devices => device::MANAGER,
        }
    }

    fn applies(&self, state: &DesiredState) -> bool {
        match self {
            Step::Configlets => !state.configlets.is_empty(),
            Step::Images => !state.image_bundles.is_empty(),
            Step::Containers => !state.containers.is_empty(),
            Step::Devices => !state.devices.is_empty(),
        }
    }
}
