//! Directory layout of products and targets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default products directory.
pub const DEFAULT_PRODUCTS_DIR: &str = "products";
/// Default targets directory.
pub const DEFAULT_TARGETS_DIR: &str = "targets";
/// Default packages directory.
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

const VARS_FILE: &str = "vars.yaml";
const COMPONENTS_FILE: &str = "components.yaml";
const COMPONENTS_DIR: &str = "components";
const ORDER_FILE: &str = "order.yaml";
const HOSTS_FILE: &str = "hosts.yaml";
const COMPUTED_FILE: &str = "_computed.yaml";
const PLATFORMS_FILE: &str = "platforms.yaml";

/// Root directories of a sail workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SailOption {
    /// Directory holding one subdirectory per product.
    pub products_dir: PathBuf,
    /// Directory holding `<target>/<zone>` subdirectories.
    pub targets_dir: PathBuf,
    /// Directory holding component packages.
    pub packages_dir: PathBuf,
}

impl Default for SailOption {
    fn default() -> Self {
        Self {
            products_dir: PathBuf::from(DEFAULT_PRODUCTS_DIR),
            targets_dir: PathBuf::from(DEFAULT_TARGETS_DIR),
            packages_dir: PathBuf::from(DEFAULT_PACKAGES_DIR),
        }
    }
}

/// Files of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPaths {
    /// Product directory.
    pub dir: PathBuf,
    /// Default variables, required.
    pub vars_file: PathBuf,
    /// Component declarations, optional.
    pub components_file: PathBuf,
    /// Directory of further component declarations, optional.
    pub components_dir: PathBuf,
    /// Deployment order, optional.
    pub order_file: PathBuf,
}

/// Files of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonePaths {
    /// Zone directory.
    pub dir: PathBuf,
    /// Zone variables and overrides.
    pub vars_file: PathBuf,
    /// Inventory.
    pub hosts_file: PathBuf,
    /// Computed services.
    pub computed_file: PathBuf,
    /// Platform bindings, optional.
    pub platforms_file: PathBuf,
}

impl SailOption {
    /// Creates an option rooted at `base`, with the default subdirectories.
    #[must_use]
    pub fn with_base_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            products_dir: base.join(DEFAULT_PRODUCTS_DIR),
            targets_dir: base.join(DEFAULT_TARGETS_DIR),
            packages_dir: base.join(DEFAULT_PACKAGES_DIR),
        }
    }

    /// Returns the files of product `name`.
    #[must_use]
    pub fn product_paths(&self, name: &str) -> ProductPaths {
        let dir = self.products_dir.join(name);
        ProductPaths {
            vars_file: dir.join(VARS_FILE),
            components_file: dir.join(COMPONENTS_FILE),
            components_dir: dir.join(COMPONENTS_DIR),
            order_file: dir.join(ORDER_FILE),
            dir,
        }
    }

    /// Returns the files of zone `zone` of target `target`.
    #[must_use]
    pub fn zone_paths(&self, target: &str, zone: &str) -> ZonePaths {
        let dir = self.targets_dir.join(target).join(zone);
        ZonePaths {
            vars_file: dir.join(VARS_FILE),
            hosts_file: dir.join(HOSTS_FILE),
            computed_file: dir.join(COMPUTED_FILE),
            platforms_file: dir.join(PLATFORMS_FILE),
            dir,
        }
    }

    /// Returns the path of a package file.
    #[must_use]
    pub fn package_path(&self, file: &str) -> PathBuf {
        self.packages_dir.join(file)
    }
}
