//! Inventory groups.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use super::Inventory;

/// Free-form variables attached to a host or a group.
pub type Vars = BTreeMap<String, Value>;

/// Hosts of a group with their per-host variables, in insertion order.
pub type HostVars = IndexMap<String, Vars>;

/// Variable holding the SSH user.
pub const ANSIBLE_USER_VAR: &str = "ansible_user";
/// Variable holding the SSH port.
pub const ANSIBLE_PORT_VAR: &str = "ansible_port";
/// Variable holding the SSH password.
pub const ANSIBLE_PASSWORD_VAR: &str = "ansible_password";

/// Default SSH user written by [`Group::add_default_vars`].
pub const DEFAULT_SSH_USER: &str = "root";
/// Default SSH port written by [`Group::add_default_vars`].
pub const DEFAULT_SSH_PORT: u16 = 22;

/// A named group of hosts.
///
/// The name is not serialized; it is the key under which the group is
/// stored in its parent [`Inventory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Group name.
    #[serde(skip)]
    name: String,

    /// Hosts and their variables.
    #[serde(
        default,
        deserialize_with = "deserialize_hosts",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    hosts: HostVars,

    /// Group variables.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    vars: Vars,

    /// Child groups.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Inventory::is_empty"
    )]
    children: Inventory,
}

impl Group {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a group holding `hosts`, each with empty variables.
    #[must_use]
    pub fn with_hosts<I, S>(name: impl Into<String>, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self::new(name);
        group.add_hosts(hosts);
        group
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the hosts with their variables.
    #[must_use]
    pub const fn hosts(&self) -> &HostVars {
        &self.hosts
    }

    /// Returns the host names in insertion order.
    #[must_use]
    pub fn hosts_list(&self) -> Vec<String> {
        self.hosts.keys().cloned().collect()
    }

    /// Returns true if the group holds `host`.
    #[must_use]
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }

    /// Adds a host with empty variables. An existing host keeps its variables.
    pub fn add_host(&mut self, host: impl Into<String>) {
        self.hosts.entry(host.into()).or_default();
    }

    /// Adds several hosts.
    pub fn add_hosts<I, S>(&mut self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            self.add_host(host);
        }
    }

    /// Removes a host, returning true if it was present.
    pub fn remove_host(&mut self, host: &str) -> bool {
        self.hosts.shift_remove(host).is_some()
    }

    /// Removes several hosts. Absent hosts are ignored.
    pub fn remove_hosts<I, S>(&mut self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for host in hosts {
            self.remove_host(host.as_ref());
        }
    }

    /// Removes every host.
    pub fn clear_hosts(&mut self) {
        self.hosts.clear();
    }

    /// Returns the variables of `host`.
    #[must_use]
    pub fn host_vars(&self, host: &str) -> Option<&Vars> {
        self.hosts.get(host)
    }

    /// Sets a variable on `host`, adding the host if needed.
    pub fn set_host_var(&mut self, host: impl Into<String>, key: impl Into<String>, value: Value) {
        self.hosts
            .entry(host.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Returns the group variables.
    #[must_use]
    pub const fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Sets a group variable.
    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key.into(), value);
    }

    /// Removes a group variable.
    pub fn remove_var(&mut self, key: &str) -> Option<Value> {
        self.vars.remove(key)
    }

    /// Returns the child inventory.
    #[must_use]
    pub const fn children(&self) -> &Inventory {
        &self.children
    }

    /// Replaces the child inventory.
    pub fn set_children(&mut self, children: Inventory) {
        self.children = children;
    }

    /// Sets the default SSH connection variables that are not already set.
    pub fn add_default_vars(&mut self) {
        self.vars
            .entry(ANSIBLE_PORT_VAR.to_string())
            .or_insert_with(|| Value::from(DEFAULT_SSH_PORT));
        self.vars
            .entry(ANSIBLE_USER_VAR.to_string())
            .or_insert_with(|| Value::from(DEFAULT_SSH_USER));
    }

    /// Keeps only the hosts for which `keep` returns true.
    pub(crate) fn retain_hosts(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.hosts.retain(|host, _| keep(host));
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// `host:` with no value is valid inventory YAML.
fn deserialize_hosts<'de, D>(deserializer: D) -> Result<HostVars, D::Error>
where
    D: Deserializer<'de>,
{
    let hosts = Option::<IndexMap<String, Option<Vars>>>::deserialize(deserializer)?;
    Ok(hosts
        .unwrap_or_default()
        .into_iter()
        .map(|(host, vars)| (host, vars.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_host_keeps_existing_vars() {
        let mut group = Group::new("web");
        group.set_host_var("10.0.0.1", "role", Value::from("primary"));
        group.add_host("10.0.0.1");

        let vars = group.host_vars("10.0.0.1").unwrap();
        assert_eq!(vars.get("role"), Some(&Value::from("primary")));
    }

    #[test]
    fn test_hosts_list_keeps_insertion_order() {
        let mut group = Group::with_hosts("db", ["h3", "h1", "h2"]);
        assert_eq!(group.hosts_list(), vec!["h3", "h1", "h2"]);

        group.remove_host("h1");
        group.add_host("h0");
        assert_eq!(group.hosts_list(), vec!["h3", "h2", "h0"]);
    }

    #[test]
    fn test_remove_absent_host() {
        let mut group = Group::with_hosts("db", ["h1"]);
        assert!(!group.remove_host("h9"));
        assert!(group.remove_host("h1"));
        assert!(group.hosts().is_empty());
    }

    #[test]
    fn test_set_host_var_creates_host() {
        let mut group = Group::new("db");
        group.set_host_var("h1", "ansible_host", Value::from("192.168.0.1"));
        assert!(group.has_host("h1"));
    }

    #[test]
    fn test_add_default_vars() {
        let mut group = Group::new("all");
        group.add_default_vars();
        assert_eq!(group.vars().get(ANSIBLE_PORT_VAR), Some(&Value::from(22)));
        assert_eq!(group.vars().get(ANSIBLE_USER_VAR), Some(&Value::from("root")));
    }

    #[test]
    fn test_deserialize_null_members() {
        let yaml = "hosts:\n  h1:\n  h2: {a: 1}\nvars:\n";
        let group: Group = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(group.hosts_list(), vec!["h1", "h2"]);
        assert!(group.host_vars("h1").unwrap().is_empty());
        assert!(group.vars().is_empty());
    }
}
