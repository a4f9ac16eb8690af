//! Host patch mini-language.
//!
//! A patch edits the host sets of inventory groups:
//!
//! ```text
//! [+|-]comp1[,comp2]/host1[,host2]    edit the groups of the listed components
//! [+|-]host1[,host2]                  edit the cluster group
//! ```
//!
//! A leading `+` adds hosts, `-` removes them and no sign replaces the host
//! set. Patches compose in the order they are given.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PatchParseError;
use crate::inventory::{Group, Inventory};

/// Group that receives hosts of patches naming no component.
pub const CLUSTER_GROUP: &str = "_cluster";

/// How a patch edits a host set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostAction {
    /// Add hosts, keeping existing ones.
    Add,
    /// Remove hosts.
    Remove,
    /// Replace the host set.
    Update,
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        };
        write!(f, "{s}")
    }
}

/// One edit of one group's host set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHosts {
    /// The edit to perform.
    pub action: HostAction,
    /// Hosts the edit applies to.
    pub hosts: Vec<String>,
}

impl ActionHosts {
    /// Applies this edit to an existing group.
    pub fn apply_to(&self, group: &mut Group) {
        match self.action {
            HostAction::Add => group.add_hosts(&self.hosts),
            HostAction::Remove => group.remove_hosts(&self.hosts),
            HostAction::Update => {
                group.clear_hosts();
                group.add_hosts(&self.hosts);
            }
        }
    }
}

/// A parsed batch of host patches, keyed by target group in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostsPatch {
    edits: IndexMap<String, Vec<ActionHosts>>,
}

impl HostsPatch {
    /// Parses a batch of patch tokens.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first malformed token. Nothing is
    /// returned for the tokens before it.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, PatchParseError> {
        let mut patch = Self::default();
        for token in tokens {
            let token = token.as_ref();
            let (action, groups, hosts) = parse_token(token)?;
            for group in groups {
                patch.edits.entry(group).or_default().push(ActionHosts {
                    action,
                    hosts: hosts.clone(),
                });
            }
        }
        Ok(patch)
    }

    /// Returns true if the batch holds no edit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Returns the target groups in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.edits.keys().map(String::as_str)
    }

    /// Returns the edits of `group` in the order they were given.
    #[must_use]
    pub fn edits_for(&self, group: &str) -> Option<&[ActionHosts]> {
        self.edits.get(group).map(Vec::as_slice)
    }

    /// Iterates over every target group and its edits.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ActionHosts])> {
        self.edits.iter().map(|(g, a)| (g.as_str(), a.as_slice()))
    }

    /// Applies every edit to `inventory`.
    ///
    /// A missing group is created by its first add or update edit; removing
    /// hosts from a missing group does nothing.
    pub fn apply(&self, inventory: &Inventory) {
        for (group, edits) in &self.edits {
            for edit in edits {
                patch_group(inventory, group, edit);
            }
        }
    }
}

/// Applies one edit to the group named `group_name`.
pub fn patch_group(inventory: &Inventory, group_name: &str, edit: &ActionHosts) {
    if inventory.update_group(group_name, |group| edit.apply_to(group)).is_some() {
        debug!("Applied {} of {:?} to group {}", edit.action, edit.hosts, group_name);
        return;
    }
    if edit.action == HostAction::Remove {
        debug!("Skipping remove on missing group {}", group_name);
        return;
    }
    debug!("Creating group {} with {:?}", group_name, edit.hosts);
    inventory.set_group(Group::with_hosts(group_name, &edit.hosts));
}

fn parse_token(token: &str) -> Result<(HostAction, Vec<String>, Vec<String>), PatchParseError> {
    let (action, body) = if let Some(rest) = token.strip_prefix('+') {
        (HostAction::Add, rest)
    } else if let Some(rest) = token.strip_prefix('-') {
        (HostAction::Remove, rest)
    } else {
        (HostAction::Update, token)
    };

    if body.is_empty() {
        return Err(PatchParseError::malformed(token, "empty patch"));
    }

    let parts: Vec<&str> = body.split('/').collect();
    let (groups, hosts) = match parts.as_slice() {
        [hosts] => (vec![CLUSTER_GROUP.to_string()], split_list(token, hosts, "host")?),
        [components, hosts] => (
            split_list(token, components, "component")?,
            split_list(token, hosts, "host")?,
        ),
        _ => {
            return Err(PatchParseError::malformed(
                token,
                "more than one '/' separator",
            ));
        }
    };

    Ok((action, groups, hosts))
}

fn split_list(token: &str, segment: &str, what: &str) -> Result<Vec<String>, PatchParseError> {
    segment
        .split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Err(PatchParseError::malformed(token, format!("empty {what} name")))
            } else if item.chars().any(char::is_whitespace) {
                Err(PatchParseError::malformed(
                    token,
                    format!("whitespace in {what} name {item:?}"),
                ))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action: HostAction, hosts: &[&str]) -> ActionHosts {
        ActionHosts {
            action,
            hosts: hosts.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_parse_component_patch() {
        let patch = HostsPatch::parse(&["+A,B/h1,h2"]).unwrap();
        let expected = [action(HostAction::Add, &["h1", "h2"])];
        assert_eq!(patch.edits_for("A"), Some(&expected[..]));
        assert_eq!(patch.edits_for("B"), Some(&expected[..]));
        assert_eq!(patch.groups().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_cluster_patch() {
        let patch = HostsPatch::parse(&["h1,h2", "-h2"]).unwrap();
        let edits = patch.edits_for(CLUSTER_GROUP).unwrap();
        assert_eq!(edits[0], action(HostAction::Update, &["h1", "h2"]));
        assert_eq!(edits[1], action(HostAction::Remove, &["h2"]));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for token in ["", "+", "-", "a/b/c", "/h1", "A/", "A,,B/h1", "A/h1,"] {
            let result = HostsPatch::parse(&[token]);
            assert!(
                matches!(result, Err(PatchParseError::Malformed { .. })),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_inner_whitespace() {
        for token in ["db/bad host", "bad\thost", "my db/h1", "+A/h1, h 2"] {
            let result = HostsPatch::parse(&[token]);
            assert!(
                matches!(result, Err(PatchParseError::Malformed { .. })),
                "token {token:?} should be rejected"
            );
        }

        let patch = HostsPatch::parse(&["A/ h1 , h2 "]).unwrap();
        assert_eq!(patch.edits_for("A").unwrap()[0], action(HostAction::Update, &["h1", "h2"]));
    }

    #[test]
    fn test_parse_error_names_token() {
        let err = HostsPatch::parse(&["A/h1", "x/y/z"]).unwrap_err();
        assert!(err.to_string().contains("x/y/z"));
    }

    #[test]
    fn test_update_is_idempotent() {
        let inventory = Inventory::new();
        inventory.set_group(Group::with_hosts("A", ["old"]));
        let patch = HostsPatch::parse(&["A/h1,h2"]).unwrap();

        patch.apply(&inventory);
        let once = inventory.clone();
        patch.apply(&inventory);

        assert_eq!(inventory, once);
        assert_eq!(inventory.hosts_of("A"), vec!["h1", "h2"]);
    }

    #[test]
    fn test_add_then_remove_leaves_empty_group() {
        let inventory = Inventory::new();
        let patch = HostsPatch::parse(&["+A/h1", "-A/h1"]).unwrap();

        patch.apply(&inventory);

        let group = inventory.get_group("A").unwrap();
        assert!(group.hosts().is_empty());
    }

    #[test]
    fn test_remove_on_missing_group_is_noop() {
        let inventory = Inventory::new();
        HostsPatch::parse(&["-A/h1"]).unwrap().apply(&inventory);
        assert!(!inventory.has_group("A"));
    }

    #[test]
    fn test_update_missing_group_creates_it() {
        let inventory = Inventory::new();
        HostsPatch::parse(&["h1,h2"]).unwrap().apply(&inventory);
        assert_eq!(inventory.hosts_of(CLUSTER_GROUP), vec!["h1", "h2"]);
    }

    #[test]
    fn test_add_keeps_existing_host_vars() {
        let inventory = Inventory::new();
        let mut group = Group::with_hosts("A", ["h1"]);
        group.set_host_var("h1", "zone", serde_yaml::Value::from("a"));
        inventory.set_group(group);

        HostsPatch::parse(&["+A/h1,h2"]).unwrap().apply(&inventory);

        let group = inventory.get_group("A").unwrap();
        assert_eq!(group.hosts_list(), vec!["h1", "h2"]);
        assert!(!group.host_vars("h1").unwrap().is_empty());
    }
}
