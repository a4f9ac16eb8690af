//! The recursive inventory tree.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use tracing::debug;

use super::group::{ANSIBLE_PASSWORD_VAR, ANSIBLE_PORT_VAR, ANSIBLE_USER_VAR};
use super::{Group, Subnet};
use crate::error::InventoryError;

/// Name of the group that receives every host.
pub const ALL_GROUP: &str = "all";
/// Reserved metadata group, never populated.
pub const META_GROUP: &str = "_meta";
/// Name of the conventional ungrouped group.
pub const UNGROUPED_GROUP: &str = "ungrouped";

/// A mapping from group name to [`Group`].
///
/// The group map sits behind a read/write lock so an inventory can be shared
/// between threads; every method takes `&self`.
#[derive(Debug, Default)]
pub struct Inventory {
    groups: RwLock<BTreeMap<String, Group>>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a top-level inventory holding an empty `all` group.
    #[must_use]
    pub fn with_all_group() -> Self {
        let inventory = Self::new();
        inventory.set_group(Group::new(ALL_GROUP));
        inventory
    }

    /// Returns the number of groups at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns true if there are no groups at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Returns true if a group named `name` exists at this level.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.read().contains_key(name)
    }

    /// Returns true if the `all` group exists.
    #[must_use]
    pub fn has_all_group(&self) -> bool {
        self.has_group(ALL_GROUP)
    }

    /// Returns the sorted group names at this level.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }

    /// Returns a copy of the group named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist.
    pub fn get_group(&self, name: &str) -> Result<Group, InventoryError> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| InventoryError::GroupNotFound {
                name: name.to_string(),
            })
    }

    /// Adds a group.
    ///
    /// # Errors
    ///
    /// Returns an error if a group with the same name already exists.
    pub fn add_group(&self, group: Group) -> Result<(), InventoryError> {
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(InventoryError::DuplicateGroup {
                name: group.name().to_string(),
            });
        }
        groups.insert(group.name().to_string(), group);
        Ok(())
    }

    /// Inserts a group, replacing any group with the same name.
    pub fn set_group(&self, group: Group) {
        self.groups.write().insert(group.name().to_string(), group);
    }

    /// Removes a group. Removing an absent group is a no-op.
    pub fn remove_group(&self, name: &str) -> Option<Group> {
        self.groups.write().remove(name)
    }

    /// Runs `f` on the group named `name` while holding the write lock.
    ///
    /// Returns `None` if the group does not exist.
    pub fn update_group<F, R>(&self, name: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Group) -> R,
    {
        self.groups.write().get_mut(name).map(f)
    }

    /// Returns the hosts of `name`, or an empty list if it does not exist.
    #[must_use]
    pub fn hosts_of(&self, name: &str) -> Vec<String> {
        self.groups
            .read()
            .get(name)
            .map(Group::hosts_list)
            .unwrap_or_default()
    }

    /// Returns the union of the hosts of every group at this level, in
    /// group order then insertion order.
    ///
    /// Child inventories are not visited.
    #[must_use]
    pub fn all_hosts(&self) -> Vec<String> {
        let groups = self.groups.read();
        let mut hosts: Vec<String> = Vec::new();
        for (name, group) in groups.iter() {
            if name == ALL_GROUP || name == META_GROUP {
                continue;
            }
            for host in group.hosts().keys() {
                if !hosts.contains(host) {
                    hosts.push(host.clone());
                }
            }
        }
        hosts
    }

    /// Sets the hosts of the `all` group to the union of the hosts of every
    /// other group, and adds the default connection variables.
    ///
    /// Hosts no other group holds are dropped; the variables of the hosts
    /// that remain are kept. Does nothing if there is no `all` group.
    pub fn fill_all(&self) {
        let hosts = self.all_hosts();
        let members: BTreeSet<&str> = hosts.iter().map(String::as_str).collect();
        self.update_group(ALL_GROUP, |all| {
            all.retain_hosts(|host| members.contains(host));
            all.add_hosts(&hosts);
            all.add_default_vars();
        });
    }

    /// Copies every group of `other` into this inventory, replacing whole
    /// groups on name clashes.
    pub fn merge(&self, other: &Self) {
        if std::ptr::eq(self, other) {
            return;
        }
        let incoming = other.groups.read().clone();
        let mut groups = self.groups.write();
        for (name, group) in incoming {
            groups.insert(name, group);
        }
    }

    /// Removes every host that is not an address inside `subnet`, at every
    /// level of the tree.
    pub fn filter_out_ip(&self, subnet: &Subnet) {
        let mut groups = self.groups.write();
        for group in groups.values_mut() {
            let before = group.hosts().len();
            group.retain_hosts(|host| subnet.contains_host(host));
            let removed = before - group.hosts().len();
            if removed > 0 {
                debug!("Filtered {} host(s) out of group {} for {}", removed, group.name(), subnet);
            }
            group.children().filter_out_ip(subnet);
        }
    }

    /// Sets the SSH user on the `all` group.
    pub fn set_default_ssh_user(&self, user: &str) {
        self.set_all_var(ANSIBLE_USER_VAR, Value::from(user));
    }

    /// Sets the SSH port on the `all` group.
    pub fn set_default_ssh_port(&self, port: u16) {
        self.set_all_var(ANSIBLE_PORT_VAR, Value::from(port));
    }

    /// Sets the SSH password on the `all` group.
    pub fn set_default_ssh_password(&self, password: &str) {
        self.set_all_var(ANSIBLE_PASSWORD_VAR, Value::from(password));
    }

    fn set_all_var(&self, key: &str, value: Value) {
        self.update_group(ALL_GROUP, |all| all.set_var(key, value));
    }

    /// Parses an inventory from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a valid inventory.
    pub fn from_yaml(content: &str) -> Result<Self, InventoryError> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_yaml::from_str(content)
            .map_err(|e| InventoryError::serialization(format!("Failed to parse inventory: {e}")))
    }

    /// Renders the inventory as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, InventoryError> {
        serde_yaml::to_string(self)
            .map_err(|e| InventoryError::serialization(format!("Failed to render inventory: {e}")))
    }
}

impl Clone for Inventory {
    fn clone(&self) -> Self {
        Self {
            groups: RwLock::new(self.groups.read().clone()),
        }
    }
}

impl PartialEq for Inventory {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        *self.groups.read() == *other.groups.read()
    }
}

impl Serialize for Inventory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.groups.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Inventory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Option<Group>>>::deserialize(deserializer)?;
        let groups = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(name, group)| {
                let mut group = group.unwrap_or_default();
                group.set_name(name.clone());
                (name, group)
            })
            .collect();
        Ok(Self {
            groups: RwLock::new(groups),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_inventory() -> Inventory {
        let inventory = Inventory::with_all_group();
        inventory.set_group(Group::with_hosts("web", ["10.0.0.1", "10.0.0.2"]));
        inventory.set_group(Group::with_hosts("db", ["10.0.1.1", "10.0.0.2"]));
        inventory
    }

    #[test]
    fn test_get_group_not_found() {
        let inventory = Inventory::new();
        let result = inventory.get_group("missing");
        assert!(matches!(result, Err(InventoryError::GroupNotFound { .. })));
    }

    #[test]
    fn test_add_group_duplicate() {
        let inventory = create_test_inventory();
        let result = inventory.add_group(Group::new("web"));
        assert!(matches!(result, Err(InventoryError::DuplicateGroup { .. })));
        assert_eq!(inventory.hosts_of("web").len(), 2);
    }

    #[test]
    fn test_set_group_overwrites() {
        let inventory = create_test_inventory();
        inventory.set_group(Group::with_hosts("web", ["10.9.9.9"]));
        assert_eq!(inventory.hosts_of("web"), vec!["10.9.9.9"]);
    }

    #[test]
    fn test_remove_absent_group_is_noop() {
        let inventory = create_test_inventory();
        assert!(inventory.remove_group("nope").is_none());
        assert_eq!(inventory.len(), 3);
    }

    #[test]
    fn test_fill_all() {
        let inventory = create_test_inventory();
        inventory.fill_all();

        let all = inventory.get_group(ALL_GROUP).unwrap();
        assert_eq!(all.hosts_list(), vec!["10.0.1.1", "10.0.0.2", "10.0.0.1"]);
        assert_eq!(all.vars().get("ansible_port"), Some(&Value::from(22)));
        assert_eq!(all.vars().get("ansible_user"), Some(&Value::from("root")));
    }

    #[test]
    fn test_fill_all_drops_orphan_hosts() {
        let inventory = create_test_inventory();
        inventory.fill_all();
        inventory.update_group(ALL_GROUP, |all| {
            all.set_host_var("10.0.0.2", "ansible_host", Value::from("shared"));
        });

        inventory.remove_group("db");
        inventory.update_group("web", |g| {
            g.remove_host("10.0.0.1");
        });
        inventory.fill_all();

        let all = inventory.get_group(ALL_GROUP).unwrap();
        assert_eq!(all.hosts_list(), vec!["10.0.0.2"]);
        assert_eq!(
            all.host_vars("10.0.0.2").and_then(|v| v.get("ansible_host")),
            Some(&Value::from("shared"))
        );
    }

    #[test]
    fn test_fill_all_ignores_children() {
        let inventory = Inventory::with_all_group();
        let mut parent = Group::with_hosts("parent", ["p1"]);
        let children = Inventory::new();
        children.set_group(Group::with_hosts("child", ["c1"]));
        parent.set_children(children);
        inventory.set_group(parent);

        inventory.fill_all();

        // Flat semantics: hosts of nested groups are not aggregated.
        assert_eq!(inventory.hosts_of(ALL_GROUP), vec!["p1"]);
    }

    #[test]
    fn test_fill_all_without_all_group() {
        let inventory = Inventory::new();
        inventory.set_group(Group::with_hosts("web", ["h1"]));
        inventory.fill_all();
        assert!(!inventory.has_all_group());
    }

    #[test]
    fn test_merge_replaces_whole_groups() {
        let inventory = create_test_inventory();
        let other = Inventory::new();
        other.set_group(Group::with_hosts("web", ["10.5.5.5"]));
        other.set_group(Group::with_hosts("cache", ["10.6.6.6"]));

        inventory.merge(&other);

        assert_eq!(inventory.hosts_of("web"), vec!["10.5.5.5"]);
        assert_eq!(inventory.hosts_of("cache"), vec!["10.6.6.6"]);
        assert_eq!(inventory.hosts_of("db").len(), 2);
    }

    #[test]
    fn test_filter_out_ip_recurses() {
        let inventory = create_test_inventory();
        let mut parent = Group::with_hosts("parent", ["10.0.0.5", "gw.local"]);
        let children = Inventory::new();
        children.set_group(Group::with_hosts("child", ["10.0.0.6", "172.16.0.1"]));
        parent.set_children(children);
        inventory.set_group(parent);

        inventory.filter_out_ip(&"10.0.0.0/24".parse().unwrap());

        assert_eq!(inventory.hosts_of("web"), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(inventory.hosts_of("db"), vec!["10.0.0.2"]);
        let parent = inventory.get_group("parent").unwrap();
        assert_eq!(parent.hosts_list(), vec!["10.0.0.5"]);
        assert_eq!(parent.children().hosts_of("child"), vec!["10.0.0.6"]);
    }

    #[test]
    fn test_default_ssh_setters() {
        let inventory = Inventory::with_all_group();
        inventory.set_default_ssh_user("deploy");
        inventory.set_default_ssh_port(2222);
        inventory.set_default_ssh_password("secret");
        inventory.fill_all();

        let all = inventory.get_group(ALL_GROUP).unwrap();
        assert_eq!(all.vars().get("ansible_user"), Some(&Value::from("deploy")));
        assert_eq!(all.vars().get("ansible_port"), Some(&Value::from(2222)));
        assert_eq!(all.vars().get("ansible_password"), Some(&Value::from("secret")));
    }

    #[test]
    fn test_yaml_round_trip() {
        let inventory = create_test_inventory();
        inventory.update_group("web", |g| {
            g.set_host_var("10.0.0.1", "ansible_host", Value::from("web1"));
            g.set_var("tier", Value::from("front"));
        });
        let mut parent = Group::new("parent");
        let children = Inventory::new();
        children.set_group(Group::with_hosts("child", ["c1"]));
        parent.set_children(children);
        inventory.set_group(parent);
        inventory.fill_all();

        let yaml = inventory.to_yaml().unwrap();
        let decoded = Inventory::from_yaml(&yaml).unwrap();

        assert_eq!(decoded, inventory);
        assert_eq!(decoded.get_group("web").unwrap().name(), "web");
        let parent = decoded.get_group("parent").unwrap();
        assert_eq!(parent.children().get_group("child").unwrap().name(), "child");
    }

    #[test]
    fn test_from_yaml_null_groups() {
        let inventory = Inventory::from_yaml("all:\nweb:\n  hosts:\n    h1:\n").unwrap();
        assert!(inventory.has_all_group());
        assert_eq!(inventory.hosts_of("web"), vec!["h1"]);
    }

    #[test]
    fn test_from_empty_yaml() {
        let inventory = Inventory::from_yaml("").unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let inventory = create_test_inventory();
        let copy = inventory.clone();
        copy.remove_group("web");
        assert!(inventory.has_group("web"));
    }
}
