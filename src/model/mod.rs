//! Product data model.
//!
//! This module handles:
//! - Components and services with their default-vs-override merge rules
//! - Products holding default declarations and a zone-resolved working copy
//! - Service endpoint computation
//! - Component selectors and filters

mod check;
mod component;
mod product;
mod selector;
mod service;
mod value;

pub use check::CheckReport;
pub use component::{Component, ComponentForm, ComponentPatch, Pkg, Require, SELF_ROLE};
pub use product::{ComponentFilter, FilterMode, Product, string_var};
pub use selector::{ComponentSelection, SelectionPartition, split_list};
pub use service::{
    DEFAULT_PATH, DEFAULT_SCHEME, LOOPBACK_HOST, Service, ServiceComputed, ServicePatch,
};
pub use value::StringOrList;
