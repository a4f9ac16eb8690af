//! Loading and dumping of products and zones.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::hash::ArtifactHasher;
use super::option::SailOption;
use crate::cmdb::Platform;
use crate::error::{LoadError, Result, SailError};
use crate::inventory::{Inventory, Vars};
use crate::model::Product;
use crate::zone::{HelmMode, Zone, ZoneArtifacts, ZoneMeta};

/// Outcome of writing a zone to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// Digest of the written artifacts.
    pub hash: String,
    /// Digest of the artifacts found on disk before writing.
    pub previous_hash: String,
}

impl DumpReport {
    /// Returns true if the written artifacts differ from the previous ones.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.hash != self.previous_hash
    }
}

/// Reads products and zones from a sail workspace and writes zones back.
#[derive(Debug, Clone, Default)]
pub struct ZoneLoader {
    option: SailOption,
}

impl ZoneLoader {
    /// Creates a loader over the given workspace layout.
    #[must_use]
    pub const fn new(option: SailOption) -> Self {
        Self { option }
    }

    /// Returns the workspace layout.
    #[must_use]
    pub const fn option(&self) -> &SailOption {
        &self.option
    }

    /// Loads a product: default variables, component declarations and
    /// deployment order.
    ///
    /// `components.yaml` is read first, then every `*.yaml`/`*.yml` file
    /// under `components/` in path order. Hidden files and directories are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `vars.yaml` is missing, a file cannot be parsed,
    /// a component is declared twice or the order names an unknown
    /// component.
    pub fn load_product(&self, name: &str) -> Result<Product> {
        let paths = self.option.product_paths(name);
        if !paths.vars_file.exists() {
            return Err(LoadError::FileNotFound {
                path: paths.vars_file,
            }
            .into());
        }

        let mut product = Product::new(name);
        product.load_default_vars(read_yaml::<Vars>(&paths.vars_file)?.unwrap_or_default());

        let mut sources = Vec::new();
        if paths.components_file.is_file() {
            sources.push(paths.components_file.clone());
        }
        collect_yaml_files(&paths.components_dir, &mut sources)?;
        for source in &sources {
            let content = read_file(source)?;
            product.load_components_yaml(&source.display().to_string(), &content)?;
        }

        if paths.order_file.is_file() {
            let order = read_yaml::<Vec<String>>(&paths.order_file)?.unwrap_or_default();
            product.set_order(order)?;
        }

        info!(
            "Loaded product {} with {} component(s)",
            name,
            product.components.len()
        );
        Ok(product)
    }

    /// Loads a zone.
    ///
    /// The zone variables name the product; the product defaults are then
    /// overridden by the zone variables, and the inventory and platform
    /// bindings are read from the zone directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone variables are missing, carry no valid
    /// metadata, or any zone or product file cannot be read.
    pub fn load_zone(&self, target: &str, zone: &str) -> Result<Zone> {
        let paths = self.option.zone_paths(target, zone);
        if !paths.vars_file.exists() {
            return Err(LoadError::FileNotFound {
                path: paths.vars_file,
            }
            .into());
        }

        let vars = read_yaml::<Vars>(&paths.vars_file)?.unwrap_or_default();
        let meta = ZoneMeta::from_vars(&vars)?;
        let product = self.load_product(&meta.product)?;

        let mut loaded = Zone::new(target, zone, &product, meta.helm_mode);
        if paths.hosts_file.is_file() {
            loaded.set_inventory(Inventory::from_yaml(&read_file(&paths.hosts_file)?)?);
        }
        if paths.platforms_file.is_file() {
            loaded.cmdb.platforms =
                read_yaml::<BTreeMap<String, Platform>>(&paths.platforms_file)?.unwrap_or_default();
        }
        loaded.apply_overrides(&vars)?;

        info!("Loaded zone {}/{} of product {}", target, zone, meta.product);
        Ok(loaded)
    }

    /// Creates a new zone of `product` in memory.
    ///
    /// Nothing is written until [`ZoneLoader::dump_zone`].
    ///
    /// # Errors
    ///
    /// Returns an error if the zone directory already holds a zone or the
    /// product cannot be loaded.
    pub fn create_zone(
        &self,
        target: &str,
        zone: &str,
        product: &str,
        helm_mode: HelmMode,
    ) -> Result<Zone> {
        let paths = self.option.zone_paths(target, zone);
        if paths.vars_file.exists() {
            return Err(LoadError::ZoneExists { path: paths.dir }.into());
        }
        let product = self.load_product(product)?;
        debug!("Creating zone {}/{} of product {}", target, zone, product.name);
        Ok(Zone::new(target, zone, &product, helm_mode))
    }

    /// Computes a zone and writes its variables, inventory and computed
    /// services.
    ///
    /// Each file is written to a temporary sibling, synced and renamed over
    /// the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone cannot be computed or rendered, or a
    /// file cannot be written.
    pub fn dump_zone(&self, zone: &mut Zone) -> Result<DumpReport> {
        zone.compute()?;
        let artifacts = zone.render()?;
        let paths = self.option.zone_paths(&zone.target, &zone.name);

        let hasher = ArtifactHasher::new();
        let previous = ZoneArtifacts {
            vars: read_existing(&paths.vars_file)?,
            hosts: read_existing(&paths.hosts_file)?,
            computed: read_existing(&paths.computed_file)?,
        };
        let report = DumpReport {
            hash: hasher.hash_artifacts(&artifacts),
            previous_hash: hasher.hash_artifacts(&previous),
        };

        fs::create_dir_all(&paths.dir)?;
        write_atomic(&paths.vars_file, &artifacts.vars)?;
        write_atomic(&paths.hosts_file, &artifacts.hosts)?;
        write_atomic(&paths.computed_file, &artifacts.computed)?;

        info!(
            "Wrote zone {}/{} ({})",
            zone.target,
            zone.name,
            hasher.short_hash(&report.hash)
        );
        Ok(report)
    }
}

/// Loads environment variables from a `.env` file in `dir`, or in the
/// current directory.
///
/// A missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(dir: Option<&Path>) -> Result<()> {
    let env_path = dir.map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            SailError::Load(LoadError::parse(
                format!("Failed to load .env file: {e}"),
                Some(env_path.display().to_string()),
            ))
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    debug!("Reading {}", path.display());
    fs::read_to_string(path).map_err(|e| {
        LoadError::parse(
            format!("Failed to read file: {e}"),
            Some(path.display().to_string()),
        )
        .into()
    })
}

// An empty or null document yields `None`.
fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = read_file(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str::<Option<T>>(&content).map_err(|e| {
        let location = e.location().map_or_else(
            || path.display().to_string(),
            |loc| format!("{}:{}:{}", path.display(), loc.line(), loc.column()),
        );
        LoadError::parse(e.to_string(), Some(location)).into()
    })
}

fn read_existing(path: &Path) -> Result<String> {
    if path.is_file() {
        Ok(fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}

fn collect_yaml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_yaml_files(&path, files)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            files.push(path);
        }
    }
    Ok(())
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
