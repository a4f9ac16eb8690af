//! Zones: a product resolved against one environment.
//!
//! A zone owns a working copy of its product, the CMDB of the environment
//! and the metadata naming the product and the chart deployment mode.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::cmdb::{Cmdb, K8s};
use crate::error::{ComponentError, LoadError, MergeError, PatchParseError, Result, SailError};
use crate::hostpatch::{CLUSTER_GROUP, HostsPatch};
use crate::inventory::{Inventory, Vars};
use crate::model::{CheckReport, ComponentFilter, FilterMode, Product, string_var};
use crate::playbook::{Playbook, generate_playbook};

/// Zone variable naming the product.
pub const PRODUCT_METAVAR: &str = "_sail_product";
/// Zone variable naming the chart deployment mode.
pub const HELM_MODE_METAVAR: &str = "_sail_helm_mode";

/// How pod components are released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelmMode {
    /// One release per pod component.
    #[default]
    Component,
    /// One release for the whole product.
    Product,
}

impl fmt::Display for HelmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Component => "component",
            Self::Product => "product",
        };
        write!(f, "{s}")
    }
}

impl FromStr for HelmMode {
    type Err = LoadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "component" => Ok(Self::Component),
            "product" => Ok(Self::Product),
            _ => Err(LoadError::InvalidHelmMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Zone metadata stored in the zone variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMeta {
    /// Product name.
    pub product: String,
    /// Chart deployment mode.
    pub helm_mode: HelmMode,
}

impl ZoneMeta {
    /// Reads the metadata from zone variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata key is missing, not a string, or the
    /// helm mode is unknown.
    pub fn from_vars(vars: &Vars) -> std::result::Result<Self, LoadError> {
        let required = |key: &str| {
            string_var(vars, key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| LoadError::MissingZoneMeta {
                    key: key.to_string(),
                })
        };
        Ok(Self {
            product: required(PRODUCT_METAVAR)?.to_string(),
            helm_mode: required(HELM_MODE_METAVAR)?.parse()?,
        })
    }

    /// Writes the metadata into zone variables.
    pub fn write_to(&self, vars: &mut Vars) {
        vars.insert(PRODUCT_METAVAR.to_string(), Value::from(self.product.as_str()));
        vars.insert(
            HELM_MODE_METAVAR.to_string(),
            Value::from(self.helm_mode.to_string()),
        );
    }
}

/// A planned chart release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelmRelease {
    /// Release name.
    pub name: String,
    /// Released component, `None` for a product release.
    pub component: Option<String>,
    /// Target cluster, if bound.
    pub k8s: Option<K8s>,
}

impl HelmRelease {
    /// Returns the arguments of an install-or-upgrade of this release.
    #[must_use]
    pub fn upgrade_args(&self, chart_dir: &Path, values_files: &[PathBuf]) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            self.name.clone(),
            chart_dir.display().to_string(),
            "--install".to_string(),
        ];
        if let Some(k8s) = &self.k8s {
            if !k8s.kube_context.is_empty() {
                args.extend(["--kube-context".to_string(), k8s.kube_context.clone()]);
            }
            if let Some(path) = k8s.kube_config_path() {
                args.extend(["--kubeconfig".to_string(), path.display().to_string()]);
            }
            if !k8s.namespace.is_empty() {
                args.extend(["--namespace".to_string(), k8s.namespace.clone()]);
            }
        }
        for file in values_files {
            args.extend(["--values".to_string(), file.display().to_string()]);
        }
        args
    }
}

/// Rendered zone artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneArtifacts {
    /// Resolved variable tree.
    pub vars: String,
    /// Inventory tree.
    pub hosts: String,
    /// Computed services of every component.
    pub computed: String,
}

/// A product resolved against one environment.
#[derive(Debug, Clone)]
pub struct Zone {
    /// Target the zone belongs to.
    pub target: String,
    /// Zone name.
    pub name: String,
    /// Zone metadata.
    pub meta: ZoneMeta,
    /// Working copy of the product.
    pub product: Product,
    /// Zone CMDB.
    pub cmdb: Cmdb,
}

impl Zone {
    /// Creates a zone over a fresh copy of `product`'s defaults with an
    /// empty CMDB.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        name: impl Into<String>,
        product: &Product,
        helm_mode: HelmMode,
    ) -> Self {
        let mut product = product.clone();
        product.reset_to_defaults();
        let meta = ZoneMeta {
            product: product.name.clone(),
            helm_mode,
        };
        meta.write_to(&mut product.vars);

        Self {
            target: target.into(),
            name: name.into(),
            meta,
            product,
            cmdb: Cmdb::new(),
        }
    }

    /// Replaces the zone inventory.
    pub fn set_inventory(&mut self, inventory: Inventory) {
        self.cmdb.inventory = inventory;
        self.cmdb.inventory.fill_all();
    }

    /// Applies the zone override file on top of the product defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a component override cannot be decoded.
    pub fn apply_overrides(&mut self, overrides: &Vars) -> std::result::Result<(), MergeError> {
        self.product.apply_zone_overrides(overrides)?;
        self.meta.write_to(&mut self.product.vars);
        Ok(())
    }

    /// Applies host patches to the zone inventory.
    ///
    /// # Errors
    ///
    /// Returns an error, without touching the inventory, if a patch targets a
    /// group that is neither a component nor the cluster group.
    pub fn patch_hosts(&mut self, patch: &HostsPatch) -> std::result::Result<(), PatchParseError> {
        if let Some(group) = patch
            .groups()
            .find(|g| *g != CLUSTER_GROUP && !self.product.has_component(g))
        {
            let mut supported = self.product.component_list();
            supported.push(CLUSTER_GROUP.to_string());
            return Err(PatchParseError::UnknownTarget {
                group: group.to_string(),
                supported: supported.join(","),
            });
        }
        patch.apply(&self.cmdb.inventory);
        debug!("Patched hosts of zone {}/{}", self.target, self.name);
        Ok(())
    }

    /// Sets the version of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not declare the component.
    pub fn set_component_version(
        &mut self,
        name: &str,
        version: &str,
    ) -> std::result::Result<(), ComponentError> {
        self.product.set_component_version(name, version)
    }

    /// Reconciles the inventory with the components, then computes every
    /// service.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be reconciled or a service
    /// cannot be computed. Neither the inventory nor the computed services
    /// are changed on error.
    pub fn compute(&mut self) -> Result<()> {
        let cmdb = self.cmdb.clone();
        cmdb.compute(self.product.components.values())?;
        self.product.compute(&cmdb)?;
        self.cmdb = cmdb;
        info!("Computed zone {}/{}", self.target, self.name);
        Ok(())
    }

    /// Checks the resolved product.
    #[must_use]
    pub fn check(&self) -> CheckReport {
        self.product.check(&self.cmdb)
    }

    /// Checks the resolved product and fails on any violated invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SailError::CheckFailed`] if the report holds errors.
    pub fn validate(&self) -> Result<CheckReport> {
        let report = self.check();
        if report.is_valid() {
            Ok(report)
        } else {
            Err(SailError::CheckFailed {
                errors: report.error_count(),
            })
        }
    }

    /// Generates the playbook of the zone's product.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    pub fn playbook(&self) -> Result<Playbook> {
        Ok(generate_playbook(&self.product)?)
    }

    /// Plans the chart releases of the zone.
    #[must_use]
    pub fn helm_releases(&self) -> Vec<HelmRelease> {
        match self.meta.helm_mode {
            HelmMode::Component => self
                .product
                .component_list_with_filter(
                    &[ComponentFilter::Enabled, ComponentFilter::FormPod],
                    FilterMode::And,
                )
                .into_iter()
                .map(|component| HelmRelease {
                    name: format!("{}-{component}", self.meta.product),
                    k8s: self
                        .cmdb
                        .platform_for_component(&component)
                        .and_then(|p| p.k8s.clone()),
                    component: Some(component),
                })
                .collect(),
            HelmMode::Product => vec![HelmRelease {
                name: self.meta.product.clone(),
                component: None,
                k8s: self.cmdb.platform_for_product().and_then(|p| p.k8s.clone()),
            }],
        }
    }

    /// Renders the variable tree, the inventory and the computed services.
    ///
    /// # Errors
    ///
    /// Returns an error if a tree cannot be serialized.
    pub fn render(&self) -> Result<ZoneArtifacts> {
        let to_yaml = |tree: &Vars| {
            serde_yaml::to_string(tree)
                .map_err(|e| SailError::internal(format!("Failed to render zone: {e}")))
        };
        let render_err = |e: serde_yaml::Error| SailError::internal(format!("Failed to render zone: {e}"));

        let vars = self.product.render_vars().map_err(render_err)?;
        let computed = self.product.render_computed().map_err(render_err)?;

        Ok(ZoneArtifacts {
            vars: to_yaml(&vars)?,
            hosts: self.cmdb.inventory.to_yaml()?,
            computed: to_yaml(&computed)?,
        })
    }
}
