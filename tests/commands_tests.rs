//! Command handler tests against a temporary data directory.

use std::path::Path;

use winpersona::catalog::{Catalog, CatalogEntry};
use winpersona::commands::{self, Context};
use winpersona::config::{AppConfig, CONFIG_FILE};
use winpersona::error::Result;
use winpersona::persona::default_personas;
use winpersona::winget::{CommandOutput, InstallArgs, PackageManager, PackageRow};

fn context(dir: &Path, dry_run: bool) -> Context {
    let path = dir.join(CONFIG_FILE);
    let config = AppConfig::load_or_default(&path).unwrap();
    Context::new(config, path, dry_run)
}

#[test]
fn test_init_writes_defaults_once() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), false);

    commands::init(&ctx, false).unwrap();
    assert!(dir.path().join(CONFIG_FILE).exists());
    assert!(dir.path().join("catalog.json").exists());
    assert_eq!(ctx.personas().list().unwrap().len(), default_personas().len());

    // A second run keeps edits
    ctx.personas().delete("Gamer").unwrap();
    std::fs::write(dir.path().join("catalog.json"), r#"{ "Git": "Git.Git" }"#).unwrap();
    commands::init(&ctx, false).unwrap();
    assert_eq!(ctx.catalog().unwrap().len(), 1);
    assert!(ctx.personas().exists("Gamer"));

    // --force restores everything
    commands::init(&ctx, true).unwrap();
    assert!(ctx.catalog().unwrap().len() > 1);
}

#[test]
fn test_default_personas_validate_against_default_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), false);
    commands::init(&ctx, false).unwrap();
    commands::persona_validate(&ctx, None).unwrap();

    commands::persona_add_app(&ctx, "Minimal", "Ghost", true).unwrap();
    assert!(commands::persona_validate(&ctx, Some("Minimal")).is_err());
    assert!(commands::persona_validate(&ctx, Some("Gamer")).is_ok());

    commands::persona_remove_app(&ctx, "Minimal", "Ghost").unwrap();
    commands::persona_validate(&ctx, Some("Minimal")).unwrap();
}

#[test]
fn test_catalog_add_and_guarded_remove() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), false);

    commands::catalog_add(&ctx, CatalogEntry::simple("Git", "Git.Git")).unwrap();
    commands::catalog_add(
        &ctx,
        CatalogEntry::simple("GitHub CLI", "GitHub.cli").with_dependencies(["Git"]),
    )
    .unwrap();

    assert!(commands::catalog_remove(&ctx, "Git", false).is_err());
    commands::catalog_remove(&ctx, "Git", true).unwrap();

    let catalog = Catalog::load(ctx.config.catalog_path()).unwrap();
    assert_eq!(catalog.names(), vec!["GitHub CLI"]);
}

#[test]
fn test_persona_create_delete_and_backup() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path(), false);

    commands::persona_create(&ctx, "Research Lab", "Notebooks").unwrap();
    assert!(commands::persona_create(&ctx, "Research Lab", "again").is_err());
    commands::backup_create(&ctx).unwrap();

    commands::persona_delete(&ctx, "Research Lab").unwrap();
    assert!(!ctx.personas().exists("Research Lab"));

    let backups = ctx.backups().list().unwrap();
    assert_eq!(backups.len(), 1);
    commands::backup_restore(&ctx, &backups[0].name, false).unwrap();
    assert_eq!(ctx.personas().load("research lab").unwrap().description, "Notebooks");
}

/// Upgrade source with two outdated packages; upgrades of `fails` exit 1.
struct Upgrades {
    fails: &'static str,
    upgraded: std::cell::RefCell<Vec<String>>,
}

impl PackageManager for Upgrades {
    fn program(&self) -> &Path {
        Path::new("winget")
    }

    fn install(&self, _args: &InstallArgs) -> Result<CommandOutput> {
        unreachable!("updates never installs")
    }

    fn is_installed(&self, _package_id: &str) -> Result<bool> {
        Ok(true)
    }

    fn list_installed(&self) -> Result<Vec<PackageRow>> {
        Ok(Vec::new())
    }

    fn list_upgrades(&self) -> Result<Vec<PackageRow>> {
        let row = |name: &str, id: &str| PackageRow {
            name: name.into(),
            id: id.into(),
            version: "1.0".into(),
            available: Some("2.0".into()),
            source: Some("winget".into()),
        };
        Ok(vec![row("Git", "Git.Git"), row("VLC", "VideoLAN.VLC")])
    }

    fn upgrade(&self, package_id: &str) -> Result<CommandOutput> {
        self.upgraded.borrow_mut().push(package_id.to_string());
        Ok(CommandOutput {
            exit_code: Some(if package_id == self.fails { 1 } else { 0 }),
            ..Default::default()
        })
    }
}

#[test]
fn test_updates_apply_counts_failures() {
    let dir = tempfile::tempdir().unwrap();
    let pm = Upgrades {
        fails: "VideoLAN.VLC",
        upgraded: Default::default(),
    };

    let listed = commands::updates(&context(dir.path(), false), &pm, false, None).unwrap();
    assert_eq!(listed, 0);
    assert!(pm.upgraded.borrow().is_empty());

    let failed = commands::updates(&context(dir.path(), false), &pm, true, None).unwrap();
    assert_eq!(failed, 1);
    assert_eq!(*pm.upgraded.borrow(), vec!["Git.Git", "VideoLAN.VLC"]);
}

#[test]
fn test_updates_dry_run_and_id_filter() {
    let dir = tempfile::tempdir().unwrap();
    let pm = Upgrades {
        fails: "",
        upgraded: Default::default(),
    };

    let failed = commands::updates(&context(dir.path(), true), &pm, true, Some("git.git")).unwrap();
    assert_eq!(failed, 0);
    assert!(pm.upgraded.borrow().is_empty());
}
