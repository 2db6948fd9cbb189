//! CVP fact collection
//!
//! Fetches the live state of CVP and reshapes it into name-keyed facts the
//! managers can diff against. Paged lists go through the concurrent
//! pagination fan-out; per-device and per-container configlet lookups run
//! with the same concurrency limit.

use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use cvp_client::{
    fetch_all_concurrently, Configlet, Container, CvpClientTrait, CvpError, Device, ImageBundle,
};
use cvp_state::SearchKey;
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resource families the collector can fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactScope {
    Devices,
    Containers,
    Configlets,
    Images,
    Tasks,
}

impl FactScope {
    pub const ALL: [FactScope; 5] = [
        FactScope::Devices,
        FactScope::Containers,
        FactScope::Configlets,
        FactScope::Images,
        FactScope::Tasks,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFact {
    pub key: String,
    pub hostname: String,
    pub fqdn: String,
    pub serial_number: String,
    pub system_mac_address: String,
    pub parent_container_name: String,
    pub configlets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_bundle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerFact {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_container_name: Option<String>,
    pub configlets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFact {
    pub id: String,
    pub status: String,
    pub description: String,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Raw client objects behind the facts, needed to issue changes
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub devices: Vec<Device>,
    pub containers: Vec<Container>,
    pub configlets: Vec<Configlet>,
    pub image_bundles: Vec<ImageBundle>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CvpFacts {
    pub devices: Vec<DeviceFact>,
    pub containers: BTreeMap<String, ContainerFact>,
    pub configlets: BTreeMap<String, String>,
    pub images: BTreeMap<String, Vec<String>>,
    pub tasks: Vec<TaskFact>,
    #[serde(skip)]
    pub inventory: Inventory,
    /// Hostnames the managers may act on; everything else stays visible but untouched
    #[serde(skip)]
    device_scope: Option<Regex>,
}

impl CvpFacts {
    /// Restrict device lookups to hostnames matching `pattern`
    ///
    /// Containers, configlets and the container membership of out-of-scope
    /// devices are left as collected.
    pub fn scope_devices(mut self, pattern: &str) -> Result<Self, ControllerError> {
        self.device_scope = Some(name_filter(pattern)?);
        Ok(self)
    }

    pub fn in_scope(&self, hostname: &str) -> bool {
        self.device_scope.as_ref().map_or(true, |re| re.is_match(hostname))
    }

    /// In-scope device whose search attribute equals `value`
    pub fn device(&self, key: SearchKey, value: &str) -> Option<&Device> {
        self.inventory
            .devices
            .iter()
            .filter(|d| self.in_scope(&d.hostname))
            .find(|d| match key {
                SearchKey::Hostname => d.hostname == value,
                SearchKey::Fqdn => d.fqdn == value,
                SearchKey::SerialNumber => d.serial_number == value,
            })
    }

    pub fn device_fact(&self, device_key: &str) -> Option<&DeviceFact> {
        self.devices.iter().find(|d| d.key == device_key)
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.inventory.containers.iter().find(|c| c.name == name)
    }

    pub fn configlet(&self, name: &str) -> Option<&Configlet> {
        self.inventory.configlets.iter().find(|c| c.name == name)
    }

    pub fn image_bundle(&self, name: &str) -> Option<&ImageBundle> {
        self.inventory.image_bundles.iter().find(|b| b.name == name)
    }

    /// Devices directly inside a container
    pub fn devices_in(&self, container_name: &str) -> Vec<&DeviceFact> {
        self.devices
            .iter()
            .filter(|d| d.parent_container_name == container_name)
            .collect()
    }

    /// Containers whose parent is `container_name`
    pub fn child_containers(&self, container_name: &str) -> Vec<&str> {
        self.containers
            .iter()
            .filter(|(_, c)| c.parent_container_name.as_deref() == Some(container_name))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn name_filter(pattern: &str) -> Result<Regex, ControllerError> {
    Regex::new(pattern)
        .map_err(|e| ControllerError::InvalidConfig(format!("Invalid fact filter '{}': {}", pattern, e)))
}

/// Collects [`CvpFacts`] for the requested scopes
///
/// An optional name filter drops unmatched devices, containers and
/// configlets from the collected facts. It is meant for reporting: the
/// managers collect unfiltered facts and narrow device lookups with
/// [`CvpFacts::scope_devices`] instead.
pub struct FactCollector<'a> {
    client: &'a dyn CvpClientTrait,
    workers: usize,
    filter: Option<Regex>,
}

impl<'a> FactCollector<'a> {
    /// `workers` bounds the concurrent requests; zero is treated as one
    pub fn new(client: &'a dyn CvpClientTrait, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
            filter: None,
        }
    }

    /// Only keep devices, containers and configlets whose name matches `pattern`
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, ControllerError> {
        self.filter = Some(name_filter(pattern)?);
        Ok(self)
    }

    fn keep(&self, name: &str) -> bool {
        self.filter.as_ref().map_or(true, |re| re.is_match(name))
    }

    /// Fetch every scope in `scopes`; the others are left empty
    pub async fn collect(&self, scopes: &[FactScope]) -> Result<CvpFacts, ControllerError> {
        let mut facts = CvpFacts::default();

        if scopes.contains(&FactScope::Configlets) {
            self.collect_configlets(&mut facts).await?;
        }
        if scopes.contains(&FactScope::Containers) {
            self.collect_containers(&mut facts).await?;
        }
        if scopes.contains(&FactScope::Devices) {
            self.collect_devices(&mut facts).await?;
        }
        if scopes.contains(&FactScope::Images) {
            self.collect_images(&mut facts).await?;
        }
        if scopes.contains(&FactScope::Tasks) {
            self.collect_tasks(&mut facts).await?;
        }

        info!(
            "Collected CVP facts: {} devices, {} containers, {} configlets, {} image bundles, {} tasks",
            facts.devices.len(),
            facts.containers.len(),
            facts.configlets.len(),
            facts.images.len(),
            facts.tasks.len()
        );
        Ok(facts)
    }

    async fn collect_configlets(&self, facts: &mut CvpFacts) -> Result<(), ControllerError> {
        let configlets = fetch_all_concurrently(
            |start, end| self.client.get_configlets_page(start, end),
            self.workers,
        )
        .await?;

        let configlets: Vec<Configlet> = configlets.into_iter().filter(|c| self.keep(&c.name)).collect();
        facts.configlets = configlets
            .iter()
            .map(|c| (c.name.clone(), c.config.clone()))
            .collect();
        facts.inventory.configlets = configlets;
        Ok(())
    }

    async fn collect_containers(&self, facts: &mut CvpFacts) -> Result<(), ControllerError> {
        let containers = fetch_all_concurrently(
            |start, end| self.client.get_containers_page(start, end),
            self.workers,
        )
        .await?;
        let containers: Vec<Container> = containers.into_iter().filter(|c| self.keep(&c.name)).collect();

        let attached: Vec<Vec<Configlet>> = stream::iter(containers.iter().map(|c| {
            let key = c.key.clone();
            async move { self.client.get_configlets_by_container(&key).await }
        }))
        .buffered(self.workers)
        .try_collect()
        .await?;

        for (container, configlets) in containers.iter().zip(attached) {
            facts.containers.insert(
                container.name.clone(),
                ContainerFact {
                    key: container.key.clone(),
                    parent_container_name: container.parent_name.clone(),
                    configlets: configlets.into_iter().map(|c| c.name).collect(),
                },
            );
        }
        debug!("Collected {} containers", containers.len());
        facts.inventory.containers = containers;
        Ok(())
    }

    async fn collect_devices(&self, facts: &mut CvpFacts) -> Result<(), ControllerError> {
        let devices: Vec<Device> = self
            .client
            .get_inventory()
            .await?
            .into_iter()
            .filter(|d| self.keep(&d.hostname))
            .collect();

        let details: Vec<(Vec<Configlet>, Option<String>)> = stream::iter(devices.iter().map(|d| async move {
            let configlets = self.client.get_configlets_by_device(&d.key).await?;
            let bundle = self.client.get_device_image_bundle(d).await?;
            Ok::<_, CvpError>((configlets, bundle))
        }))
        .buffered(self.workers)
        .try_collect()
        .await?;

        facts.devices = devices
            .iter()
            .zip(details)
            .map(|(d, (configlets, image_bundle))| DeviceFact {
                key: d.key.clone(),
                hostname: d.hostname.clone(),
                fqdn: d.fqdn.clone(),
                serial_number: d.serial_number.clone(),
                system_mac_address: d.system_mac_address.clone(),
                parent_container_name: d.parent_container_name.clone(),
                configlets: configlets.into_iter().map(|c| c.name).collect(),
                image_bundle,
            })
            .collect();
        debug!("Collected {} devices", devices.len());
        facts.inventory.devices = devices;
        Ok(())
    }

    async fn collect_images(&self, facts: &mut CvpFacts) -> Result<(), ControllerError> {
        let bundles = fetch_all_concurrently(
            |start, end| self.client.get_image_bundles_page(start, end),
            self.workers,
        )
        .await?;

        facts.images = bundles
            .iter()
            .map(|b| (b.name.clone(), b.image_names()))
            .collect();
        facts.inventory.image_bundles = bundles;
        Ok(())
    }

    async fn collect_tasks(&self, facts: &mut CvpFacts) -> Result<(), ControllerError> {
        let tasks = fetch_all_concurrently(
            |start, end| self.client.get_tasks_page(start, end),
            self.workers,
        )
        .await?;

        facts.tasks = tasks
            .iter()
            .map(|t| TaskFact {
                id: t.work_order_id.clone(),
                status: t.work_order_user_defined_status.clone(),
                description: t.description.clone(),
                hostname: t.hostname.clone(),
                created_at: t.created_at(),
            })
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvp_client::MockCvpClient;

    fn seeded() -> MockCvpClient {
        let mock = MockCvpClient::new("https://cvp.test");
        mock.seed_container("DC1", "Tenant");
        mock.seed_container("Leafs", "DC1");
        mock.seed_configlet("base", "hostname base\n");
        mock.seed_configlet("leaf1-config", "interface Ethernet1\n");
        mock.seed_device("leaf1", "SN-1", "Leafs");
        mock.seed_device("spine1", "SN-2", "DC1");
        mock.attach_to_container("Leafs", &["base"]);
        mock.attach_to_device("leaf1", &["leaf1-config"]);
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image_bundle("EOS-4.30", &["EOS-4.30.1F.swi"]);
        mock.attach_bundle_to_device("leaf1", "EOS-4.30");
        mock.seed_task("100", "Pending");
        mock
    }

    #[tokio::test]
    async fn test_collect_all_scopes() {
        let mock = seeded();
        let facts = FactCollector::new(&mock, 4).collect(&FactScope::ALL).await.unwrap();

        assert_eq!(facts.devices.len(), 2);
        let leaf1 = facts.devices.iter().find(|d| d.hostname == "leaf1").unwrap();
        assert_eq!(leaf1.parent_container_name, "Leafs");
        assert_eq!(leaf1.configlets, vec!["leaf1-config"]);
        assert_eq!(leaf1.image_bundle.as_deref(), Some("EOS-4.30"));

        assert_eq!(facts.containers["Leafs"].parent_container_name.as_deref(), Some("DC1"));
        assert_eq!(facts.containers["Leafs"].configlets, vec!["base"]);
        assert!(facts.containers.contains_key("Tenant"));

        assert_eq!(facts.configlets["base"], "hostname base\n");
        assert_eq!(facts.images["EOS-4.30"], vec!["EOS-4.30.1F.swi"]);
        assert_eq!(facts.tasks.len(), 1);
        assert_eq!(facts.tasks[0].status, "Pending");

        assert_eq!(facts.device(SearchKey::SerialNumber, "SN-2").map(|d| d.hostname.as_str()), Some("spine1"));
        assert_eq!(facts.child_containers("DC1"), vec!["Leafs"]);
        assert_eq!(facts.devices_in("DC1").len(), 1);
    }

    #[tokio::test]
    async fn test_collect_only_requested_scopes() {
        let mock = seeded();
        let facts = FactCollector::new(&mock, 2).collect(&[FactScope::Configlets]).await.unwrap();

        assert_eq!(facts.configlets.len(), 2);
        assert!(facts.devices.is_empty());
        assert!(facts.containers.is_empty());
        assert!(mock.calls_to("get_inventory").is_empty());
    }

    #[tokio::test]
    async fn test_paged_lists_fan_out() {
        let mock = MockCvpClient::new("https://cvp.test");
        for i in 0..10 {
            mock.seed_configlet(&format!("cfg-{:02}", i), "!");
        }

        let facts = FactCollector::new(&mock, 3).collect(&[FactScope::Configlets]).await.unwrap();

        assert_eq!(facts.configlets.len(), 10);
        let requests: Vec<(u64, u64)> = mock
            .page_requests()
            .into_iter()
            .filter(|(endpoint, _, _)| endpoint == "configlets")
            .map(|(_, s, e)| (s, e))
            .collect();
        assert_eq!(requests, vec![(0, 1), (0, 4), (4, 8), (8, 10)]);
    }

    #[tokio::test]
    async fn test_name_filter() {
        let mock = seeded();
        let facts = FactCollector::new(&mock, 4)
            .with_filter("^leaf")
            .unwrap()
            .collect(&[FactScope::Devices, FactScope::Configlets])
            .await
            .unwrap();

        assert_eq!(facts.devices.len(), 1);
        assert_eq!(facts.devices[0].hostname, "leaf1");
        assert_eq!(facts.configlets.keys().collect::<Vec<_>>(), vec!["leaf1-config"]);

        assert!(FactCollector::new(&mock, 4).with_filter("(").is_err());
    }

    #[tokio::test]
    async fn test_device_scope_only_narrows_device_lookups() {
        let mock = seeded();
        let facts = FactCollector::new(&mock, 4)
            .collect(&FactScope::ALL)
            .await
            .unwrap()
            .scope_devices("^spine")
            .unwrap();

        assert!(facts.device(SearchKey::Hostname, "leaf1").is_none());
        assert!(facts.device(SearchKey::Hostname, "spine1").is_some());
        assert!(!facts.in_scope("leaf1"));

        assert!(facts.container("Leafs").is_some());
        assert!(facts.configlet("leaf1-config").is_some());
        assert_eq!(facts.devices_in("Leafs").len(), 1);
        assert_eq!(facts.containers["Leafs"].configlets, vec!["base"]);

        assert!(CvpFacts::default().scope_devices("(").is_err());
    }

    #[tokio::test]
    async fn test_page_failure_propagates() {
        let mock = seeded();
        mock.fail_on("containers");

        let result = FactCollector::new(&mock, 4).collect(&[FactScope::Containers]).await;
        assert!(matches!(result, Err(ControllerError::Cvp(CvpError::Api(_)))));
    }
}
