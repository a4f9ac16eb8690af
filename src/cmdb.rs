//! Configuration management database of a zone.
//!
//! The CMDB pairs the zone inventory with platform bindings and decides
//! which hosts serve which component.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InventoryError;
use crate::hostpatch::CLUSTER_GROUP;
use crate::inventory::{Group, Inventory};
use crate::model::Component;

/// Platform key applying to every component without its own binding.
pub const ALL_PLATFORM: &str = "all";

/// Kubernetes binding of a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8s {
    /// Path to the kubeconfig file. A leading `~` is the home directory.
    #[serde(rename = "kubeConfig", default)]
    pub kube_config: String,

    /// Context within the kubeconfig.
    #[serde(rename = "kubeContext", default)]
    pub kube_context: String,

    /// Target namespace.
    #[serde(default)]
    pub namespace: String,
}

impl K8s {
    /// Returns the kubeconfig path with `~` expanded, or `None` if unset.
    #[must_use]
    pub fn kube_config_path(&self) -> Option<PathBuf> {
        if self.kube_config.is_empty() {
            None
        } else {
            Some(expand_tilde(&self.kube_config))
        }
    }
}

/// Where pod components of a zone are deployed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Kubernetes binding.
    #[serde(rename = "k8s", default, skip_serializing_if = "Option::is_none")]
    pub k8s: Option<K8s>,
}

/// Inventory plus platform bindings of a zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cmdb {
    /// Zone inventory.
    #[serde(default)]
    pub inventory: Inventory,

    /// Platform bindings keyed by component name or [`ALL_PLATFORM`].
    #[serde(default)]
    pub platforms: BTreeMap<String, Platform>,
}

impl Cmdb {
    /// Creates a CMDB with a top-level inventory holding the `all` group.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inventory(Inventory::with_all_group())
    }

    /// Creates a CMDB around an existing inventory and fills its `all` group.
    #[must_use]
    pub fn with_inventory(inventory: Inventory) -> Self {
        inventory.fill_all();
        Self {
            inventory,
            platforms: BTreeMap::new(),
        }
    }

    /// Returns the hosts serving `component`, in group insertion order.
    ///
    /// Empty when the component has no group.
    #[must_use]
    pub fn hosts_for_component(&self, component: &str) -> Vec<String> {
        self.inventory.hosts_of(component)
    }

    /// Reconciles the inventory with the components.
    ///
    /// Disabled components lose their group. An enabled component keeps an
    /// existing group untouched; a missing one is created from the hosts of
    /// the cluster group. The `all` group is refilled afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if a group cannot be added.
    pub fn compute<'a, I>(&self, components: I) -> Result<(), InventoryError>
    where
        I: IntoIterator<Item = &'a Component>,
    {
        for component in components {
            if !component.enabled {
                if self.inventory.remove_group(&component.name).is_some() {
                    debug!("Removed group of disabled component {}", component.name);
                }
                continue;
            }
            if self.inventory.has_group(&component.name) {
                continue;
            }
            let hosts = self.determine_hosts_for_component(&component.name);
            debug!("Creating group {} with {} host(s)", component.name, hosts.len());
            self.inventory
                .add_group(Group::with_hosts(component.name.as_str(), hosts))?;
        }
        self.inventory.fill_all();
        Ok(())
    }

    // Placement policy: every new component lands on the whole cluster.
    fn determine_hosts_for_component(&self, _component: &str) -> Vec<String> {
        self.inventory.hosts_of(CLUSTER_GROUP)
    }

    /// Returns the platform of `component`, falling back to [`ALL_PLATFORM`].
    #[must_use]
    pub fn platform_for_component(&self, component: &str) -> Option<&Platform> {
        self.platforms
            .get(component)
            .or_else(|| self.platforms.get(ALL_PLATFORM))
    }

    /// Returns the platform shared by the whole product.
    #[must_use]
    pub fn platform_for_product(&self) -> Option<&Platform> {
        self.platforms.get(ALL_PLATFORM)
    }
}

/// Expands a leading `~` to the home directory.
///
/// The path is returned unchanged when there is no home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        return PathBuf::from(path);
    }
    dirs::home_dir().map_or_else(
        || PathBuf::from(path),
        |home| home.join(rest.trim_start_matches('/')),
    )
}
