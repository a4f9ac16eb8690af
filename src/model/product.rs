//! Products: default declarations plus the zone-resolved working copy.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;
use tracing::{debug, warn};

use super::check::CheckReport;
use super::component::{Component, ComponentPatch};
use crate::cmdb::Cmdb;
use crate::error::{ComponentError, ComputeError, LoadError, MergeError};
use crate::inventory::Vars;

/// How several component filters combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Every filter must match. No filter matches everything.
    #[default]
    And,
    /// At least one filter must match. No filter matches nothing.
    Or,
}

/// A predicate over components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentFilter {
    /// Enabled components.
    Enabled,
    /// Disabled components.
    Disabled,
    /// Pod components.
    FormPod,
    /// Server components.
    FormServer,
    /// Components whose name is in the set.
    Named(BTreeSet<String>),
}

impl ComponentFilter {
    /// Returns true if `component` passes the filter.
    #[must_use]
    pub fn matches(&self, component: &Component) -> bool {
        match self {
            Self::Enabled => component.enabled,
            Self::Disabled => !component.enabled,
            Self::FormPod => component.is_pod(),
            Self::FormServer => component.is_server(),
            Self::Named(names) => names.contains(&component.name),
        }
    }
}

/// A product: its default declarations and the working copy being resolved.
///
/// Defaults are captured while loading and never change afterwards. The
/// working `vars` and `components` start as deep copies of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    /// Product name.
    pub name: String,

    /// Working variables.
    pub vars: Vars,

    /// Working components.
    pub components: BTreeMap<String, Component>,

    default_vars: Vars,
    default_components: BTreeMap<String, Component>,
    declared_order: Vec<String>,
}

impl Product {
    /// Creates an empty product.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the default variables and resets the working variables to them.
    pub fn load_default_vars(&mut self, vars: Vars) {
        self.vars = vars.clone();
        self.default_vars = vars;
    }

    /// Loads component declarations from one source.
    ///
    /// `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if a component is already declared or a declaration
    /// cannot be decoded. Nothing from `declarations` is kept on error.
    pub fn load_components(&mut self, origin: &str, declarations: &Vars) -> Result<(), LoadError> {
        let mut decoded = Vec::with_capacity(declarations.len());
        for (name, value) in declarations {
            if self.default_components.contains_key(name) {
                return Err(LoadError::DuplicateComponent {
                    name: name.clone(),
                    origin: origin.to_string(),
                });
            }
            let mut component = Component::from_declaration(name, value).map_err(|e| {
                LoadError::InvalidDeclaration {
                    component: name.clone(),
                    message: e.to_string(),
                }
            })?;
            if component.normalize_activation() {
                warn!(
                    "Component {} in {} is both enabled and external, disabling it",
                    name, origin
                );
            }
            decoded.push(component);
        }

        debug!("Loaded {} component(s) from {}", decoded.len(), origin);
        for component in decoded {
            self.components
                .insert(component.name.clone(), component.clone());
            self.default_components
                .insert(component.name.clone(), component);
        }
        Ok(())
    }

    /// Parses and loads component declarations from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a mapping of component names or
    /// [`Product::load_components`] fails.
    pub fn load_components_yaml(&mut self, origin: &str, content: &str) -> Result<(), LoadError> {
        if content.trim().is_empty() {
            return Ok(());
        }
        let declarations: Option<Vars> = serde_yaml::from_str(content)
            .map_err(|e| LoadError::parse(e.to_string(), Some(origin.to_string())))?;
        self.load_components(origin, &declarations.unwrap_or_default())
    }

    /// Sets the declared deployment order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is not a declared component.
    pub fn set_order(&mut self, order: Vec<String>) -> Result<(), LoadError> {
        if let Some(unknown) = order
            .iter()
            .find(|c| !self.default_components.contains_key(*c))
        {
            return Err(LoadError::UnknownOrderEntry {
                component: unknown.clone(),
                product: self.name.clone(),
            });
        }
        self.declared_order = order;
        Ok(())
    }

    /// Returns the deployment order: the declared order followed by the
    /// remaining components sorted by name, without duplicates.
    #[must_use]
    pub fn order(&self) -> Vec<String> {
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        self.declared_order
            .iter()
            .chain(self.default_components.keys())
            .filter(|name| seen.insert(*name))
            .cloned()
            .collect()
    }

    /// Returns the default variables.
    #[must_use]
    pub const fn default_vars(&self) -> &Vars {
        &self.default_vars
    }

    /// Returns the default components.
    #[must_use]
    pub const fn default_components(&self) -> &BTreeMap<String, Component> {
        &self.default_components
    }

    /// Resets the working copy to deep copies of the defaults.
    pub fn reset_to_defaults(&mut self) {
        self.vars = self.default_vars.clone();
        self.components = self.default_components.clone();
    }

    /// Applies a zone override file.
    ///
    /// Keys naming a component override it field by field; any other key
    /// becomes a product variable.
    ///
    /// # Errors
    ///
    /// Returns an error if a component override cannot be decoded. The
    /// product is left untouched on error.
    pub fn apply_zone_overrides(&mut self, overrides: &Vars) -> Result<(), MergeError> {
        let mut patches = Vec::new();
        let mut vars = Vec::new();
        for (key, value) in overrides {
            if self.components.contains_key(key) {
                let patch = ComponentPatch::from_value(value).map_err(|e| {
                    MergeError::DecodeFailed {
                        component: key.clone(),
                        message: e.to_string(),
                    }
                })?;
                patches.push((key, patch));
            } else {
                vars.push((key.clone(), value.clone()));
            }
        }

        self.vars.extend(vars);
        for (name, patch) in patches {
            if let Some(component) = self.components.get_mut(name) {
                patch.apply_to(component);
                if component.normalize_activation() {
                    warn!(
                        "Component {} is both enabled and external after zone overrides, disabling it",
                        name
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns true if the product declares `name`.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Returns the working component named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not declare it.
    pub fn component(&self, name: &str) -> Result<&Component, ComponentError> {
        self.components
            .get(name)
            .ok_or_else(|| ComponentError::unknown(name))
    }

    fn component_mut(&mut self, name: &str) -> Result<&mut Component, ComponentError> {
        self.components
            .get_mut(name)
            .ok_or_else(|| ComponentError::unknown(name))
    }

    /// Sets the enabled flag of a component. Enabling clears external.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not declare it.
    pub fn set_component_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ComponentError> {
        self.component_mut(name)?.set_enabled(enabled);
        Ok(())
    }

    /// Sets the external flag of a component. Making external clears enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not declare it.
    pub fn set_component_external_enabled(
        &mut self,
        name: &str,
        external: bool,
    ) -> Result<(), ComponentError> {
        self.component_mut(name)?.set_external(external);
        Ok(())
    }

    /// Sets the version of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not declare it.
    pub fn set_component_version(&mut self, name: &str, version: &str) -> Result<(), ComponentError> {
        self.component_mut(name)?.version = version.to_string();
        Ok(())
    }

    /// Returns the sorted component names.
    #[must_use]
    pub fn component_list(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    /// Returns the sorted names of the components passing `filters`.
    #[must_use]
    pub fn component_list_with_filter(
        &self,
        filters: &[ComponentFilter],
        mode: FilterMode,
    ) -> Vec<String> {
        self.components
            .values()
            .filter(|c| match mode {
                FilterMode::And => filters.iter().all(|f| f.matches(c)),
                FilterMode::Or => filters.iter().any(|f| f.matches(c)),
            })
            .map(|c| c.name.clone())
            .collect()
    }

    /// Computes the services of every component.
    ///
    /// Either every component receives its new computed services or none
    /// does.
    ///
    /// # Errors
    ///
    /// Returns the first service computation error.
    pub fn compute(&mut self, cmdb: &Cmdb) -> Result<(), ComputeError> {
        let computed = self
            .components
            .iter()
            .map(|(name, c)| Ok((name.clone(), c.compute_services(cmdb)?)))
            .collect::<Result<Vec<_>, ComputeError>>()?;

        for (name, services) in computed {
            if let Some(component) = self.components.get_mut(&name) {
                component.set_computed(services);
            }
        }
        debug!("Computed services of product {}", self.name);
        Ok(())
    }

    /// Checks every non-external component.
    #[must_use]
    pub fn check(&self, cmdb: &Cmdb) -> CheckReport {
        let mut report = CheckReport::default();
        for component in self.components.values() {
            report.errors.extend(component.check());
            if component.enabled
                && component.is_server()
                && cmdb.hosts_for_component(&component.name).is_empty()
            {
                report
                    .warnings
                    .push(format!("component {} is enabled but has no hosts", component.name));
            }
            for require in &component.requires {
                if require.component.is_empty() {
                    continue;
                }
                match self.components.get(&require.component) {
                    None => report.warnings.push(format!(
                        "component {} requires unknown component {}",
                        component.name, require.component
                    )),
                    Some(provider)
                        if !require.service.is_empty()
                            && !provider.services.contains_key(&require.service) =>
                    {
                        report.warnings.push(format!(
                            "component {} requires unknown service {}.{}",
                            component.name, require.component, require.service
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        report
    }

    /// Renders the working variables and components as one tree.
    ///
    /// Each component carries its effective `roleName`, the component name
    /// when none is declared.
    ///
    /// # Errors
    ///
    /// Returns an error if a component cannot be serialized.
    pub fn render_vars(&self) -> Result<Vars, serde_yaml::Error> {
        let mut tree = self.vars.clone();
        for (name, component) in &self.components {
            let mut value = serde_yaml::to_value(component)?;
            if let Value::Mapping(fields) = &mut value {
                fields.insert(Value::from("roleName"), Value::from(component.role_name()));
            }
            tree.insert(name.clone(), value);
        }
        Ok(tree)
    }

    /// Renders the computed services of every component.
    ///
    /// # Errors
    ///
    /// Returns an error if a computed service cannot be serialized.
    pub fn render_computed(&self) -> Result<Vars, serde_yaml::Error> {
        self.components
            .iter()
            .map(|(name, c)| Ok((name.clone(), serde_yaml::to_value(c.computed())?)))
            .collect()
    }
}

/// Returns a string variable of `vars`.
#[must_use]
pub fn string_var<'a>(vars: &'a Vars, key: &str) -> Option<&'a str> {
    vars.get(key).and_then(Value::as_str)
}
