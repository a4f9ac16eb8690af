//! Component selectors given on the command line.
//!
//! A selector is `name`, `name/version` or `name/version/longVersion`; in
//! the last form the long version wins. Several selectors may be joined by
//! commas or repeated.

use std::collections::BTreeMap;

use super::component::ComponentForm;
use super::product::{ComponentFilter, FilterMode, Product};
use crate::error::ComponentError;

/// Selected components with their requested versions.
///
/// An empty version keeps the declared one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSelection {
    versions: BTreeMap<String, String>,
}

/// A selection split by deployment form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPartition {
    /// Server components, deployed by playbook.
    pub server: ComponentSelection,
    /// Pod components, deployed by chart.
    pub pod: ComponentSelection,
}

impl ComponentSelection {
    /// Parses component selectors.
    ///
    /// # Errors
    ///
    /// Returns an error if a selector has an empty name or more than three
    /// segments.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ComponentError> {
        let mut selection = Self::default();
        for selector in split_list(selectors) {
            let segments: Vec<&str> = selector.split('/').collect();
            let (name, version) = match segments.as_slice() {
                [name] => (*name, ""),
                [name, version] | [name, _, version] => (*name, *version),
                _ => {
                    return Err(ComponentError::InvalidSelector {
                        selector: selector.clone(),
                    });
                }
            };
            if name.is_empty() {
                return Err(ComponentError::InvalidSelector {
                    selector: selector.clone(),
                });
            }
            selection.insert(name, version);
        }
        Ok(selection)
    }

    /// Adds a component, replacing a previously selected version.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.versions.insert(name.into(), version.into());
    }

    /// Returns true if `name` is selected.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.versions.contains_key(name)
    }

    /// Returns the requested version of `name`. Empty means unchanged.
    #[must_use]
    pub fn version(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    /// Returns the sorted selected names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }

    /// Returns the number of selected components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns a filter matching the selected components.
    #[must_use]
    pub fn to_filter(&self) -> ComponentFilter {
        ComponentFilter::Named(self.versions.keys().cloned().collect())
    }

    /// Sets the requested versions on the product's working components.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected component is not declared.
    pub fn apply_versions(&self, product: &mut Product) -> Result<(), ComponentError> {
        for (name, version) in &self.versions {
            if !product.has_component(name) {
                return Err(ComponentError::unknown(name.as_str()));
            }
            if !version.is_empty() {
                product.set_component_version(name, version)?;
            }
        }
        Ok(())
    }

    /// Splits the selection into server and pod components.
    ///
    /// `all_server` and `all_pod` first extend the selection with every
    /// component of that form.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected component is not declared.
    pub fn partition(
        &self,
        product: &Product,
        all_server: bool,
        all_pod: bool,
    ) -> Result<SelectionPartition, ComponentError> {
        let mut selected = self.clone();
        let mut extend = |filter: ComponentFilter| {
            for name in product.component_list_with_filter(&[filter], FilterMode::And) {
                selected.versions.entry(name).or_default();
            }
        };
        if all_server {
            extend(ComponentFilter::FormServer);
        }
        if all_pod {
            extend(ComponentFilter::FormPod);
        }

        let mut partition = SelectionPartition::default();
        for (name, version) in selected.versions {
            let component = product.component(&name)?;
            let target = match component.form {
                ComponentForm::Server => &mut partition.server,
                ComponentForm::Pod => &mut partition.pod,
            };
            target.insert(name, version);
        }
        Ok(partition)
    }
}

/// Splits comma-separated values into trimmed, non-empty items.
#[must_use]
pub fn split_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
