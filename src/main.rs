//! Sail CLI entrypoint.
//!
//! This is the main entrypoint for the sail command-line tool.

use std::process::ExitCode;

use sail_deploy_zones::cli::{Cli, Commands, HelmModeArg, OutputFormatter};
use sail_deploy_zones::config::{ZoneLoader, load_dotenv};
use sail_deploy_zones::error::Result;
use sail_deploy_zones::hostpatch::HostsPatch;
use sail_deploy_zones::model::{ComponentSelection, split_list};
use sail_deploy_zones::zone::Zone;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Environment first, so SAIL_* variables reach the argument defaults
    let dotenv = load_dotenv(None);

    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(e) = dotenv {
        warn!("{e}");
    }

    let formatter = OutputFormatter::new(cli.output);
    match run(cli, &formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            if e.is_user_input() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches a parsed command.
fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let loader = ZoneLoader::new(cli.sail_option());
    let (target, zone) = (cli.target.as_str(), cli.zone.as_str());

    match cli.command {
        Commands::ConfCreate {
            product,
            helm_mode,
            hosts,
        } => cmd_conf_create(&loader, target, zone, &product, helm_mode, &hosts, formatter),
        Commands::ConfUpdate {
            hosts,
            enable,
            disable,
            external,
            component,
        } => {
            let update = ZoneUpdate {
                hosts,
                enable,
                disable,
                external,
                component,
            };
            cmd_conf_update(&loader, target, zone, &update, formatter)
        }
        Commands::ListComponents { enabled } => {
            let zone = loader.load_zone(target, zone)?;
            print!("{}", formatter.format_components(&zone, enabled));
            Ok(())
        }
        Commands::GenSail => cmd_gen_sail(&loader, target, zone),
        Commands::Tags { start_at } => cmd_tags(&loader, target, zone, start_at.as_deref(), formatter),
        Commands::Check => cmd_check(&loader, target, zone, formatter),
        Commands::Releases => {
            let zone = loader.load_zone(target, zone)?;
            print!("{}", formatter.format_releases(&zone.helm_releases()));
            Ok(())
        }
    }
}

/// Create a zone and write it.
fn cmd_conf_create(
    loader: &ZoneLoader,
    target: &str,
    zone: &str,
    product: &str,
    helm_mode: HelmModeArg,
    hosts: &[String],
    formatter: &OutputFormatter,
) -> Result<()> {
    info!("Creating zone {target}/{zone} of product {product}");

    let mut created = loader.create_zone(target, zone, product, helm_mode.into())?;
    if !hosts.is_empty() {
        created.patch_hosts(&HostsPatch::parse(hosts)?)?;
    }

    let report = loader.dump_zone(&mut created)?;
    print!("{}", formatter.format_dump(&created, &report));
    Ok(())
}

/// Edits requested by `conf-update`.
struct ZoneUpdate {
    hosts: Vec<String>,
    enable: Vec<String>,
    disable: Vec<String>,
    external: Vec<String>,
    component: Vec<String>,
}

/// Update a zone, recompute it and write it.
fn cmd_conf_update(
    loader: &ZoneLoader,
    target: &str,
    zone: &str,
    update: &ZoneUpdate,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut loaded = loader.load_zone(target, zone)?;
    apply_update(&mut loaded, update)?;

    let report = loader.dump_zone(&mut loaded)?;
    let check = loaded.check();
    if !check.is_valid() || check.warning_count() > 0 {
        eprint!("{}", formatter.format_check(&check));
    }
    print!("{}", formatter.format_dump(&loaded, &report));
    Ok(())
}

fn apply_update(zone: &mut Zone, update: &ZoneUpdate) -> Result<()> {
    if !update.hosts.is_empty() {
        zone.patch_hosts(&HostsPatch::parse(&update.hosts)?)?;
    }
    for name in split_list(&update.enable) {
        debug!("Enabling {name}");
        zone.product.set_component_enabled(&name, true)?;
    }
    for name in split_list(&update.disable) {
        debug!("Disabling {name}");
        zone.product.set_component_enabled(&name, false)?;
    }
    for name in split_list(&update.external) {
        debug!("Marking {name} as external");
        zone.product.set_component_external_enabled(&name, true)?;
    }
    if !update.component.is_empty() {
        ComponentSelection::parse(&update.component)?.apply_versions(&mut zone.product)?;
    }
    Ok(())
}

/// Print the playbook of the zone's product.
fn cmd_gen_sail(loader: &ZoneLoader, target: &str, zone: &str) -> Result<()> {
    let zone = loader.load_zone(target, zone)?;
    print!("{}", zone.playbook()?.to_yaml()?);
    Ok(())
}

/// Print the play tags, optionally starting at one component.
fn cmd_tags(
    loader: &ZoneLoader,
    target: &str,
    zone: &str,
    start_at: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let zone = loader.load_zone(target, zone)?;
    let playbook = zone.playbook()?;
    let tags = match start_at {
        Some(component) => playbook.plays_tags_start_at(component),
        None => playbook.plays_tags(),
    };
    if tags.is_empty() {
        if let Some(component) = start_at {
            eprintln!("{}", formatter.warning(&format!("No play for component {component}")));
        }
    }
    print!("{}", formatter.format_tags(&tags));
    Ok(())
}

/// Compute a zone in memory, report its checks and fail on any error.
fn cmd_check(loader: &ZoneLoader, target: &str, zone: &str, formatter: &OutputFormatter) -> Result<()> {
    let mut zone = loader.load_zone(target, zone)?;
    zone.compute()?;
    print!("{}", formatter.format_check(&zone.check()));
    zone.validate()?;
    Ok(())
}
