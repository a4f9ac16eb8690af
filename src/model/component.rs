//! Components and their declaration merge rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::service::{Service, ServiceComputed, ServicePatch};
use super::value::StringOrList;
use crate::cmdb::Cmdb;
use crate::error::{CheckError, ComputeError};
use crate::inventory::Vars;

/// Role entry that stands for the component's own role.
pub const SELF_ROLE: &str = ".";

/// How a component is deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentForm {
    /// Installed on hosts by the configuration-management executor.
    #[default]
    Server,
    /// Deployed as a chart on a container platform.
    Pod,
}

impl fmt::Display for ComponentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Server => "server",
            Self::Pod => "pod",
        };
        write!(f, "{s}")
    }
}

/// A package shipped with a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pkg {
    /// Local file name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// Download URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// A service this component consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Require {
    /// Providing component.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,
    /// Provided service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
}

/// A deployable unit of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Component {
    /// Component name, the key it is declared under.
    #[serde(skip)]
    pub name: String,

    /// Deployed version.
    pub version: String,

    /// Role applied by the component's play. Empty means the component name.
    #[serde(rename = "roleName")]
    pub role_name: String,

    /// Deployment form.
    pub form: ComponentForm,

    /// Whether the zone deploys the component.
    pub enabled: bool,

    /// Whether the component is provided outside the zone.
    pub external: bool,

    /// Extra tag shared by the plays of several components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Packages.
    pub pkgs: Vec<Pkg>,

    /// Declared services.
    pub services: BTreeMap<String, Service>,

    /// Computed services, rebuilt on every compute.
    computed: BTreeMap<String, ServiceComputed>,

    /// Consumed services.
    pub requires: Vec<Require>,

    /// Components this one depends on.
    pub dependencies: Vec<String>,

    /// Declared children. Not used for placement.
    pub children: Vec<String>,

    /// Roles applied by the component's play.
    pub roles: Vec<String>,

    /// Free-form variables.
    pub vars: Vars,

    /// Free-form tags.
    pub tags: Vars,
}

/// A partial component decoded from a declaration or a zone override.
///
/// Present scalar and list fields replace the target field, including empty
/// and zero values. Maps merge key by key and an explicit empty map clears
/// the field. A `computed` key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComponentPatch {
    /// Deployed version.
    pub version: Option<String>,
    /// Role name.
    #[serde(rename = "roleName", alias = "role_name")]
    pub role_name: Option<String>,
    /// Deployment form.
    pub form: Option<ComponentForm>,
    /// Enabled flag.
    pub enabled: Option<bool>,
    /// External flag.
    pub external: Option<bool>,
    /// Group tag. An empty string clears it.
    pub group: Option<String>,
    /// Packages.
    pub pkgs: Option<Vec<Pkg>>,
    /// Partial services.
    pub services: Option<BTreeMap<String, Option<ServicePatch>>>,
    /// Consumed services.
    pub requires: Option<Vec<Require>>,
    /// Dependencies.
    pub dependencies: Option<StringOrList>,
    /// Children.
    pub children: Option<StringOrList>,
    /// Roles.
    pub roles: Option<StringOrList>,
    /// Variables.
    pub vars: Option<Vars>,
    /// Tags.
    pub tags: Option<Vars>,
}

impl ComponentPatch {
    /// Decodes a patch from a YAML value. `null` is an empty patch.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have the component shape.
    pub fn from_value(value: &Value) -> Result<Self, serde_yaml::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value.clone())
    }

    /// Overrides the fields of `component` present in this patch.
    pub fn apply_to(self, component: &mut Component) {
        if let Some(v) = self.version {
            component.version = v;
        }
        if let Some(v) = self.role_name {
            component.role_name = v;
        }
        if let Some(v) = self.form {
            component.form = v;
        }
        if let Some(v) = self.enabled {
            component.enabled = v;
        }
        if let Some(v) = self.external {
            component.external = v;
        }
        if let Some(v) = self.group {
            component.group = Some(v).filter(|g| !g.is_empty());
        }
        if let Some(v) = self.pkgs {
            component.pkgs = v;
        }
        if let Some(v) = self.requires {
            component.requires = v;
        }
        if let Some(v) = self.dependencies {
            component.dependencies = v.into_vec();
        }
        if let Some(v) = self.children {
            component.children = v.into_vec();
        }
        if let Some(v) = self.roles {
            component.roles = v.into_vec();
        }
        if let Some(v) = self.vars {
            merge_map(&mut component.vars, v);
        }
        if let Some(v) = self.tags {
            merge_map(&mut component.tags, v);
        }
        if let Some(services) = self.services {
            if services.is_empty() {
                component.services.clear();
            }
            let owner = component.name.clone();
            for (name, patch) in services {
                let service = component
                    .services
                    .entry(name.clone())
                    .or_insert_with(|| Service::new(owner.as_str(), name));
                if let Some(patch) = patch {
                    patch.apply_to(service);
                }
            }
        }
    }
}

fn merge_map(target: &mut Vars, patch: Vars) {
    if patch.is_empty() {
        target.clear();
    }
    target.extend(patch);
}

impl Component {
    /// Creates an empty server component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Decodes a component declared under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have the component shape.
    pub fn from_declaration(name: &str, value: &Value) -> Result<Self, serde_yaml::Error> {
        let mut component = Self::new(name);
        ComponentPatch::from_value(value)?.apply_to(&mut component);
        Ok(component)
    }

    /// Returns the role name, defaulting to the component name.
    #[must_use]
    pub fn role_name(&self) -> &str {
        if self.role_name.is_empty() {
            &self.name
        } else {
            &self.role_name
        }
    }

    /// Returns the roles applied by the component's play.
    ///
    /// No declared role means the role name alone; `.` stands for it.
    #[must_use]
    pub fn resolved_roles(&self) -> Vec<String> {
        if self.roles.is_empty() {
            return vec![self.role_name().to_string()];
        }
        self.roles
            .iter()
            .map(|r| {
                if r == SELF_ROLE {
                    self.role_name().to_string()
                } else {
                    r.clone()
                }
            })
            .collect()
    }

    /// Returns true for pod components.
    #[must_use]
    pub fn is_pod(&self) -> bool {
        self.form == ComponentForm::Pod
    }

    /// Returns true for server components.
    #[must_use]
    pub fn is_server(&self) -> bool {
        self.form != ComponentForm::Pod
    }

    /// Clears `enabled` when both `enabled` and `external` are set.
    ///
    /// Returns true if the flags were contradictory.
    pub fn normalize_activation(&mut self) -> bool {
        if self.enabled && self.external {
            self.enabled = false;
            return true;
        }
        false
    }

    /// Sets the enabled flag. Enabling clears the external flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.external = false;
        }
    }

    /// Sets the external flag. Making external clears the enabled flag.
    pub fn set_external(&mut self, external: bool) {
        self.external = external;
        if external {
            self.enabled = false;
        }
    }

    /// Returns the computed services.
    #[must_use]
    pub const fn computed(&self) -> &BTreeMap<String, ServiceComputed> {
        &self.computed
    }

    pub(crate) fn set_computed(&mut self, computed: BTreeMap<String, ServiceComputed>) {
        self.computed = computed;
    }

    /// Computes every service without modifying the component.
    ///
    /// # Errors
    ///
    /// Returns the first service computation error.
    pub fn compute_services(
        &self,
        cmdb: &Cmdb,
    ) -> Result<BTreeMap<String, ServiceComputed>, ComputeError> {
        self.services
            .iter()
            .map(|(name, service)| Ok((name.clone(), service.compute(self.external, cmdb)?)))
            .collect()
    }

    /// Checks the service invariants. External components are exempt.
    #[must_use]
    pub fn check(&self) -> Vec<CheckError> {
        if self.external {
            return Vec::new();
        }
        self.services.values().flat_map(Service::check).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(name: &str, yaml: &str) -> Component {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Component::from_declaration(name, &value).unwrap()
    }

    fn patch(yaml: &str) -> ComponentPatch {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        ComponentPatch::from_value(&value).unwrap()
    }

    #[test]
    fn test_decode_declaration() {
        let component = decode(
            "mysql",
            r"
version: '8.0'
form: server
enabled: true
roles: [., exporter]
services:
  mysql:
    scheme: tcp
    port: 3306
",
        );

        assert_eq!(component.name, "mysql");
        assert_eq!(component.version, "8.0");
        assert_eq!(component.resolved_roles(), vec!["mysql", "exporter"]);
        let service = &component.services["mysql"];
        assert_eq!(service.component_name, "mysql");
        assert_eq!(service.name, "mysql");
        assert_eq!(service.port, 3306);
    }

    #[test]
    fn test_null_declaration() {
        let component = Component::from_declaration("redis", &Value::Null).unwrap();
        assert_eq!(component.form, ComponentForm::Server);
        assert_eq!(component.resolved_roles(), vec!["redis"]);
    }

    #[test]
    fn test_role_name_defaults() {
        let mut component = Component::new("web");
        assert_eq!(component.role_name(), "web");
        component.role_name = "nginx".to_string();
        assert_eq!(component.resolved_roles(), vec!["nginx"]);
    }

    #[test]
    fn test_computed_input_is_ignored() {
        let component = decode(
            "web",
            "computed:\n  http:\n    host: 1.2.3.4\nservices:\n  http: {port: 80}\n",
        );
        assert!(component.computed().is_empty());
    }

    #[test]
    fn test_override_wins_with_zero_values() {
        let mut component = decode(
            "web",
            "version: '1.0'\nenabled: true\nroles: [a, b]\nservices:\n  http: {port: 80, scheme: http}\n",
        );

        patch("version: ''\nenabled: false\nroles: []\nservices:\n  http: {port: 0}\n")
            .apply_to(&mut component);

        assert_eq!(component.version, "");
        assert!(!component.enabled);
        assert!(component.roles.is_empty());
        assert_eq!(component.services["http"].port, 0);
        assert_eq!(component.services["http"].scheme, "http");
    }

    #[test]
    fn test_absent_fields_keep_defaults() {
        let mut component = decode("web", "version: '1.0'\nform: pod\nvars: {a: 1}\n");
        patch("enabled: true").apply_to(&mut component);

        assert_eq!(component.version, "1.0");
        assert_eq!(component.form, ComponentForm::Pod);
        assert_eq!(component.vars.get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn test_maps_merge_by_key() {
        let mut component = decode(
            "web",
            "vars: {a: 1, b: 2}\nservices:\n  http: {port: 80}\n  admin: {port: 81}\n",
        );

        patch("vars: {b: 3, c: 4}\nservices:\n  metrics: {port: 9100}\n").apply_to(&mut component);

        assert_eq!(component.vars.len(), 3);
        assert_eq!(component.vars.get("b"), Some(&Value::from(3)));
        assert_eq!(component.services.len(), 3);
        assert_eq!(component.services["metrics"].component_name, "web");
    }

    #[test]
    fn test_explicit_empty_map_clears() {
        let mut component = decode("web", "vars: {a: 1}\nservices:\n  http: {port: 80}\n");
        patch("vars: {}\nservices: {}\n").apply_to(&mut component);
        assert!(component.vars.is_empty());
        assert!(component.services.is_empty());
    }

    #[test]
    fn test_group_empty_clears() {
        let mut component = decode("web", "group: frontends");
        assert_eq!(component.group.as_deref(), Some("frontends"));
        patch("group: ''").apply_to(&mut component);
        assert!(component.group.is_none());
    }

    #[test]
    fn test_normalize_activation() {
        let mut component = decode("web", "enabled: true\nexternal: true\n");
        assert!(component.normalize_activation());
        assert!(!component.enabled);
        assert!(component.external);
        assert!(!component.normalize_activation());
    }

    #[test]
    fn test_set_flags_are_exclusive() {
        let mut component = Component::new("web");
        component.set_enabled(true);
        component.set_external(true);
        assert!(!component.enabled);

        component.set_enabled(true);
        assert!(!component.external);

        component.set_enabled(false);
        assert!(!component.enabled && !component.external);
    }

    #[test]
    fn test_invalid_form() {
        let value: Value = serde_yaml::from_str("form: vm").unwrap();
        assert!(Component::from_declaration("web", &value).is_err());
    }

    #[test]
    fn test_check_skips_external() {
        let mut component = decode("db", "services:\n  sql: {}\n");
        assert_eq!(component.check().len(), 2);
        component.set_external(true);
        assert!(component.check().is_empty());
    }
}
