//! Host inventory for the configuration-management executor.
//!
//! This module provides:
//! - A recursive group tree (`name -> hosts, vars, children`)
//! - Aggregation of every host into the reserved `all` group
//! - Subnet scoping of an inventory
//!
//! Host aggregation is flat: only the groups at one level are visited and
//! child inventories are carried along untouched.

mod group;
mod subnet;
mod tree;

pub use group::{
    ANSIBLE_PASSWORD_VAR, ANSIBLE_PORT_VAR, ANSIBLE_USER_VAR, DEFAULT_SSH_PORT, DEFAULT_SSH_USER,
    Group, HostVars, Vars,
};
pub use subnet::Subnet;
pub use tree::{ALL_GROUP, Inventory, META_GROUP, UNGROUPED_GROUP};
