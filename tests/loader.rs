//! Loading and dumping zones through the workspace layout.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use sail_deploy_zones::config::{SailOption, ZoneLoader};
use sail_deploy_zones::error::{LoadError, SailError};
use sail_deploy_zones::hostpatch::HostsPatch;
use sail_deploy_zones::inventory::Vars;
use sail_deploy_zones::zone::HelmMode;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn create_test_workspace() -> (TempDir, ZoneLoader) {
    let temp_dir = TempDir::new().unwrap();
    let option = SailOption::with_base_dir(temp_dir.path());
    let product = option.product_paths("shop");

    write(&product.vars_file, "region: eu\n");
    write(
        &product.components_file,
        "web:\n  enabled: true\n  services:\n    http: {scheme: http, port: 80}\n",
    );
    write(
        &product.components_dir.join("data/cache.yaml"),
        "cache:\n  enabled: true\n  form: pod\n",
    );
    write(&product.order_file, "- cache\n- web\n");

    (temp_dir, ZoneLoader::new(option))
}

#[test]
fn test_zone_lifecycle() {
    let (_temp_dir, loader) = create_test_workspace();

    let mut zone = loader
        .create_zone("prod", "eu", "shop", HelmMode::Component)
        .unwrap();
    zone.patch_hosts(&HostsPatch::parse(&["10.0.0.1"]).unwrap())
        .unwrap();
    let created = loader.dump_zone(&mut zone).unwrap();
    assert!(created.changed());

    let paths = loader.option().zone_paths("prod", "eu");
    assert!(paths.hosts_file.is_file());
    assert!(paths.computed_file.is_file());
    let vars: Vars = serde_yaml::from_str(&fs::read_to_string(&paths.vars_file).unwrap()).unwrap();
    assert_eq!(vars["_sail_product"].as_str(), Some("shop"));
    assert_eq!(vars["_sail_helm_mode"].as_str(), Some("component"));

    let mut reloaded = loader.load_zone("prod", "eu").unwrap();
    reloaded.set_component_version("web", "1.2.0").unwrap();
    let updated = loader.dump_zone(&mut reloaded).unwrap();
    assert!(updated.changed());

    let reloaded = loader.load_zone("prod", "eu").unwrap();
    assert_eq!(reloaded.product.component("web").unwrap().version, "1.2.0");
    assert_eq!(reloaded.cmdb.hosts_for_component("web"), vec!["10.0.0.1"]);

    let tags = reloaded.playbook().unwrap().plays_tags();
    assert_eq!(tags, vec!["play-cache", "play-web"]);
}

#[test]
fn test_platform_bindings() {
    let (_temp_dir, loader) = create_test_workspace();
    let mut zone = loader
        .create_zone("prod", "eu", "shop", HelmMode::Component)
        .unwrap();
    loader.dump_zone(&mut zone).unwrap();

    let paths = loader.option().zone_paths("prod", "eu");
    write(
        &paths.platforms_file,
        "all:\n  k8s: {kubeContext: prod, namespace: shop}\ncache:\n  k8s: {namespace: cache}\n",
    );

    let zone = loader.load_zone("prod", "eu").unwrap();
    let releases = zone.helm_releases();

    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].name, "shop-cache");
    let k8s = releases[0].k8s.as_ref().unwrap();
    assert_eq!(k8s.namespace, "cache");
    assert!(k8s.kube_context.is_empty());
}

#[test]
fn test_unknown_order_entry() {
    let (_temp_dir, loader) = create_test_workspace();
    let paths = loader.option().product_paths("shop");
    write(&paths.order_file, "- ghost\n");

    assert!(matches!(
        loader.load_product("shop"),
        Err(SailError::Load(LoadError::UnknownOrderEntry { .. }))
    ));
}

#[test]
fn test_malformed_declaration() {
    let (_temp_dir, loader) = create_test_workspace();
    let paths = loader.option().product_paths("shop");
    write(&paths.components_dir.join("bad.yaml"), "bad: {enabled: [1, 2]}\n");

    assert!(matches!(
        loader.load_product("shop"),
        Err(SailError::Load(LoadError::InvalidDeclaration { .. }))
    ));
}
