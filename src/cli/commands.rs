//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_PACKAGES_DIR, DEFAULT_PRODUCTS_DIR, DEFAULT_TARGETS_DIR, SailOption};
use crate::zone::HelmMode;

/// Sail - Resolve products against deployment zones.
#[derive(Parser, Debug)]
#[command(name = "sail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the products.
    #[arg(long, global = true, env = "SAIL_PRODUCTS_DIR", default_value = DEFAULT_PRODUCTS_DIR)]
    pub products_dir: PathBuf,

    /// Directory holding the targets.
    #[arg(long, global = true, env = "SAIL_TARGETS_DIR", default_value = DEFAULT_TARGETS_DIR)]
    pub targets_dir: PathBuf,

    /// Directory holding the packages.
    #[arg(long, global = true, env = "SAIL_PACKAGES_DIR", default_value = DEFAULT_PACKAGES_DIR)]
    pub packages_dir: PathBuf,

    /// Target the zone belongs to.
    #[arg(short, long, global = true, env = "SAIL_TARGET", default_value = "default")]
    pub target: String,

    /// Zone name.
    #[arg(short, long, global = true, env = "SAIL_ZONE", default_value = "default")]
    pub zone: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a zone of a product.
    ConfCreate {
        /// Product deployed by the zone.
        #[arg(short, long)]
        product: String,

        /// How pod components are released.
        #[arg(long, default_value = "component")]
        helm_mode: HelmModeArg,

        /// Host patches, e.g. `10.0.0.1,10.0.0.2` or `db/10.0.0.3`.
        #[arg(long, num_args = 1..)]
        hosts: Vec<String>,
    },

    /// Update a zone and recompute it.
    ConfUpdate {
        /// Host patches, e.g. `+web/10.0.0.4` or `-10.0.0.1`. Values may
        /// start with `-`, so pass this option last.
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        hosts: Vec<String>,

        /// Components to enable.
        #[arg(long, num_args = 1..)]
        enable: Vec<String>,

        /// Components to disable.
        #[arg(long, num_args = 1..)]
        disable: Vec<String>,

        /// Components provided outside the zone.
        #[arg(long, num_args = 1..)]
        external: Vec<String>,

        /// Component versions, as `name/version`.
        #[arg(short, long, num_args = 1..)]
        component: Vec<String>,
    },

    /// List the components of the zone.
    ListComponents {
        /// Only list enabled components.
        #[arg(long)]
        enabled: bool,
    },

    /// Print the playbook of the zone's product.
    GenSail,

    /// Print the play tags of the zone's product.
    Tags {
        /// First component whose play is run.
        #[arg(long)]
        start_at: Option<String>,
    },

    /// Check the services of the zone.
    Check,

    /// Print the planned chart releases of the zone.
    Releases,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Chart deployment mode options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum HelmModeArg {
    /// One release per pod component.
    #[default]
    Component,
    /// One release for the whole product.
    Product,
}

impl From<HelmModeArg> for HelmMode {
    fn from(arg: HelmModeArg) -> Self {
        match arg {
            HelmModeArg::Component => Self::Component,
            HelmModeArg::Product => Self::Product,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the workspace layout selected by the arguments.
    #[must_use]
    pub fn sail_option(&self) -> SailOption {
        SailOption {
            products_dir: self.products_dir.clone(),
            targets_dir: self.targets_dir.clone(),
            packages_dir: self.packages_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conf_update() {
        let cli = Cli::try_parse_from([
            "sail",
            "-t",
            "prod",
            "-z",
            "eu",
            "conf-update",
            "--component",
            "web/2.0",
            "--hosts",
            "-10.0.0.1",
            "+web/10.0.0.2",
        ])
        .unwrap();

        assert_eq!(cli.target, "prod");
        assert_eq!(cli.zone, "eu");
        match cli.command {
            Commands::ConfUpdate {
                hosts, component, ..
            } => {
                assert_eq!(hosts, vec!["-10.0.0.1", "+web/10.0.0.2"]);
                assert_eq!(component, vec!["web/2.0"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_conf_create() {
        let cli = Cli::try_parse_from([
            "sail",
            "conf-create",
            "--product",
            "shop",
            "--helm-mode",
            "product",
        ])
        .unwrap();

        match cli.command {
            Commands::ConfCreate {
                product, helm_mode, hosts,
            } => {
                assert_eq!(product, "shop");
                assert_eq!(HelmMode::from(helm_mode), HelmMode::Product);
                assert!(hosts.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
