//! Command handlers shared by the CLI and the interactive menu.
//!
//! Handlers print their results and return `anyhow::Result`. Anything that
//! talks to winget is generic over [`PackageManager`] so it can run against a
//! fake in tests.

use anyhow::{Context as _, Result, bail};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::backup::BackupManager;
use crate::catalog::{Catalog, CatalogEntry, default_catalog};
use crate::config::AppConfig;
use crate::error::WinPersonaError;
use crate::display;
use crate::history::History;
use crate::host::HostInfo;
use crate::install_engine::{CancelFlag, InstallEngine, InstallOptions, InstallPlan, InstallReport};
use crate::logic::recommend::{Recommendation, recommend};
use crate::logic::requirements::check_requirements;
use crate::logic::resolver::resolve;
use crate::persona::{Persona, PersonaStore, default_personas};
use crate::theme::Styles;
use crate::winget::{CommandOutput, ExitOutcome, PackageManager, UpgradeArgs, Winget, command_line};

/// Everything a command needs: loaded config plus global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub dry_run: bool,
    pub cancel: CancelFlag,
}

impl Context {
    pub fn new(config: AppConfig, config_path: PathBuf, dry_run: bool) -> Self {
        Self {
            config,
            config_path,
            dry_run,
            cancel: CancelFlag::new(),
        }
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::load_or_default(self.config.catalog_path())?)
    }

    pub fn personas(&self) -> PersonaStore {
        PersonaStore::new(self.config.personas_dir())
    }

    pub fn history(&self) -> History {
        History::new(self.config.history_path())
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::new(self.config.backups_dir())
    }

    pub fn winget(&self) -> Winget {
        Winget::new(self.config.winget_path.clone())
    }

    /// Clear a Ctrl-C left over from an idle prompt before starting an action.
    pub fn begin_action(&self) {
        self.cancel.reset();
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            dry_run: self.dry_run,
            skip_installed: self.config.skip_installed,
            retry_delay: self.config.retry_delay(),
            scope: self.config.install_scope,
            show_progress: std::io::stderr().is_terminal(),
        }
    }
}

// ============================================================================
// init
// ============================================================================

/// Write the default config, catalog, and personas. Existing files are kept
/// unless `force` is set.
pub fn init(ctx: &Context, force: bool) -> Result<()> {
    let mut written = 0;

    if force || !ctx.config_path.exists() {
        ctx.config.save_to_file(&ctx.config_path)?;
        println!("{} {}", Styles::success("✓"), ctx.config_path.display());
        written += 1;
    }

    let catalog_path = ctx.config.catalog_path();
    if force || !catalog_path.exists() {
        default_catalog().save(&catalog_path)?;
        println!("{} {}", Styles::success("✓"), catalog_path.display());
        written += 1;
    }

    let store = ctx.personas();
    for persona in default_personas() {
        if force || !store.exists(&persona.name) {
            store.save(&persona)?;
            println!("{} persona {}", Styles::success("✓"), persona.name);
            written += 1;
        }
    }

    if written == 0 {
        println!("Already initialized in {}", ctx.config.data_dir.display());
    }
    Ok(())
}

// ============================================================================
// install
// ============================================================================

/// Parameters of one persona install.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub persona: String,
    pub optional: Vec<String>,
    pub all_optional: bool,
    pub no_deps: bool,
    /// Proceed without asking when issues are found
    pub yes: bool,
}

/// Install a persona with the configured winget.
pub fn install(ctx: &Context, request: &InstallRequest) -> Result<InstallReport> {
    let winget = ctx.winget();
    install_with(ctx, &winget, request, &HostInfo::detect(), &mut confirm_prompt)
}

/// Install a persona through `pm`.
///
/// `confirm` is asked whether to continue when the plan has resolver or
/// requirement issues; answering no aborts before anything is installed.
pub fn install_with<P: PackageManager>(
    ctx: &Context,
    pm: &P,
    request: &InstallRequest,
    host: &HostInfo,
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<InstallReport> {
    let catalog = ctx.catalog()?;
    let persona = ctx.personas().load(&request.persona)?;

    let optional: Vec<String> = if request.all_optional {
        persona.optional_apps.clone()
    } else {
        for app in &request.optional {
            if !persona.optional_apps.contains(app) {
                tracing::warn!(persona = %persona.name, app = %app, "Not an optional app of this persona, ignoring");
            }
        }
        request.optional.clone()
    };

    let resolve_deps = ctx.config.resolve_dependencies && !request.no_deps;
    let plan = InstallPlan::for_persona(&persona, &optional, &catalog, resolve_deps);
    print!("{}", display::plan(&plan));

    let requirement_issues = check_requirements(&plan.order, &catalog, host);
    print!("{}", display::requirement_issues(&requirement_issues));

    if plan.is_empty() {
        bail!("Nothing to install for persona {}", persona.name);
    }
    if (plan.has_issues() || !requirement_issues.is_empty())
        && !request.yes
        && !confirm("Issues were found. Continue with the installation?")?
    {
        bail!("Installation aborted");
    }

    let history = ctx.history();
    let engine = InstallEngine::new(pm, &catalog, ctx.install_options())
        .with_history(&history)
        .with_cancel_flag(ctx.cancel.clone());
    let report = engine.run(&plan)?;
    print!("{}", display::report(&report));
    Ok(report)
}

/// Ask on the terminal; refuse when there is no terminal to ask on.
pub fn confirm_prompt(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("{} (pass --yes to proceed without a terminal)", prompt);
    }
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(WinPersonaError::from)?)
}

// ============================================================================
// resolve
// ============================================================================

pub fn resolve_apps(ctx: &Context, apps: &[String], json: bool) -> Result<()> {
    let catalog = ctx.catalog()?;
    let result = resolve(apps, &catalog);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", display::resolution(&result));
    }
    Ok(())
}

// ============================================================================
// persona
// ============================================================================

pub fn persona_list(ctx: &Context) -> Result<()> {
    print!("{}", display::persona_list(&ctx.personas().list()?));
    Ok(())
}

pub fn persona_show(ctx: &Context, name: &str) -> Result<()> {
    let persona = ctx.personas().load(name)?;
    print!("{}", display::persona(&persona, &ctx.catalog()?));
    Ok(())
}

pub fn persona_create(ctx: &Context, name: &str, description: &str) -> Result<()> {
    ctx.personas().create(&Persona::new(name, description))?;
    println!("{} Created persona {}", Styles::success("✓"), name);
    Ok(())
}

pub fn persona_delete(ctx: &Context, name: &str) -> Result<()> {
    ctx.personas().delete(name)?;
    println!("{} Deleted persona {}", Styles::success("✓"), name);
    Ok(())
}

/// Add an app, warning (not failing) when the catalog doesn't know it.
pub fn persona_add_app(ctx: &Context, name: &str, app: &str, optional: bool) -> Result<()> {
    if !ctx.catalog()?.contains(app) {
        println!("{} {} is not in the catalog", Styles::warning("!"), app);
    }
    let persona = ctx.personas().add_app(name, app, optional)?;
    println!(
        "{} Added {} to {} ({})",
        Styles::success("✓"),
        app,
        persona.name,
        if optional { "optional" } else { "base" }
    );
    Ok(())
}

pub fn persona_remove_app(ctx: &Context, name: &str, app: &str) -> Result<()> {
    let persona = ctx.personas().remove_app(name, app)?;
    println!("{} Removed {} from {}", Styles::success("✓"), app, persona.name);
    Ok(())
}

/// Check one or all personas for apps the catalog doesn't know.
pub fn persona_validate(ctx: &Context, name: Option<&str>) -> Result<()> {
    let catalog = ctx.catalog()?;
    let store = ctx.personas();
    let personas = match name {
        Some(name) => vec![store.load(name)?],
        None => store.list()?,
    };

    let mut problems = 0;
    for persona in &personas {
        let unknown = persona.unknown_apps(&catalog);
        if unknown.is_empty() {
            println!("{} {}", Styles::success("✓"), persona.name);
        } else {
            problems += unknown.len();
            println!("{} {}: unknown apps {}", Styles::error("✗"), persona.name, unknown.join(", "));
        }
    }
    if problems > 0 {
        bail!("{} unknown app reference(s)", problems);
    }
    Ok(())
}

// ============================================================================
// catalog
// ============================================================================

pub fn catalog_list(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog()?;
    print!("{}", display::catalog(&catalog));
    println!("{}", Styles::muted(format!("{} applications", catalog.len())));
    Ok(())
}

pub fn catalog_show(ctx: &Context, name: &str) -> Result<()> {
    let catalog = ctx.catalog()?;
    let entry = catalog
        .get(name)
        .with_context(|| format!("Unknown application: {}", name))?;
    print!("{}", display::catalog_entry(entry));
    let dependents = catalog.dependents_of(name);
    if !dependents.is_empty() {
        println!("  required by:  {}", dependents.join(", "));
    }
    Ok(())
}

/// Add or replace an entry and save the catalog.
pub fn catalog_add(ctx: &Context, entry: CatalogEntry) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let missing: Vec<&String> = entry
        .dependencies
        .iter()
        .filter(|d| !catalog.contains(d) && **d != entry.name)
        .collect();
    for dep in &missing {
        println!("{} dependency {} is not in the catalog", Styles::warning("!"), dep);
    }

    let name = entry.name.clone();
    let replaced = catalog.upsert(entry).is_some();
    catalog.save(ctx.config.catalog_path())?;
    println!(
        "{} {} {}",
        Styles::success("✓"),
        if replaced { "Updated" } else { "Added" },
        name
    );
    Ok(())
}

pub fn catalog_remove(ctx: &Context, name: &str, force: bool) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    catalog.remove(name, force)?;
    catalog.save(ctx.config.catalog_path())?;
    println!("{} Removed {}", Styles::success("✓"), name);
    Ok(())
}

// ============================================================================
// history
// ============================================================================

pub fn history(ctx: &Context, limit: usize, app: Option<&str>, summary: bool, clear: bool) -> Result<()> {
    let history = ctx.history();
    if clear {
        history.clear()?;
        println!("{} History cleared", Styles::success("✓"));
        return Ok(());
    }
    if summary {
        print!("{}", display::history_summary(&history.summary()?));
        return Ok(());
    }

    let records = match app {
        Some(app) => {
            let mut records = history.for_app(app)?;
            records.truncate(limit);
            records
        }
        None => history.recent(limit)?,
    };
    if records.is_empty() {
        println!("{}", Styles::muted("No history yet."));
    }
    for record in &records {
        println!("{}", display::record(record));
    }
    Ok(())
}

// ============================================================================
// backup
// ============================================================================

pub fn backup_create(ctx: &Context) -> Result<()> {
    let info = ctx.backups().backup(&ctx.personas())?;
    println!(
        "{} Backed up {} persona(s) to {}",
        Styles::success("✓"),
        info.manifest.personas.len(),
        info.path.display()
    );
    Ok(())
}

pub fn backup_list(ctx: &Context) -> Result<()> {
    print!("{}", display::backups(&ctx.backups().list()?));
    Ok(())
}

pub fn backup_restore(ctx: &Context, name: &str, overwrite: bool) -> Result<()> {
    let report = ctx.backups().restore(name, &ctx.personas(), overwrite)?;
    for persona in &report.restored {
        println!("{} restored {}", Styles::success("✓"), persona);
    }
    for persona in &report.skipped {
        println!("{} kept existing {} (use --overwrite)", Styles::warning("-"), persona);
    }
    Ok(())
}

// ============================================================================
// updates
// ============================================================================

/// List upgradable packages, optionally upgrading them.
///
/// Returns the number of failed upgrades.
pub fn updates<P: PackageManager>(ctx: &Context, pm: &P, apply: bool, id: Option<&str>) -> Result<usize> {
    let mut rows = pm.list_upgrades()?;
    if let Some(id) = id {
        rows.retain(|row| row.id.eq_ignore_ascii_case(id));
    }
    print!("{}", display::package_rows(&rows));
    if !apply {
        return Ok(0);
    }

    let mut failed = 0;
    for row in &rows {
        if ctx.cancel.is_cancelled() {
            println!("{} Cancelled", Styles::warning("-"));
            break;
        }
        if ctx.dry_run {
            let args = UpgradeArgs {
                package_id: Some(row.id.clone()),
            };
            println!("→ {}", command_line(pm.program(), &args));
            continue;
        }
        let output: CommandOutput = pm.upgrade(&row.id)?;
        match output.outcome() {
            ExitOutcome::Success | ExitOutcome::AlreadyInstalled => {
                println!("{} {}", Styles::success("✓"), row.name);
            }
            _ => {
                failed += 1;
                tracing::warn!(package_id = %row.id, exit_code = ?output.exit_code, "Upgrade failed");
                println!(
                    "{} {}: {}",
                    Styles::error("✗"),
                    row.name,
                    output.summary().unwrap_or_else(|| "upgrade failed".into())
                );
            }
        }
    }
    Ok(failed)
}

// ============================================================================
// recommend
// ============================================================================

/// Score personas against what `pm` reports as installed.
pub fn recommendations<P: PackageManager>(ctx: &Context, pm: &P) -> Result<Vec<Recommendation>> {
    let installed: Vec<String> = pm.list_installed()?.into_iter().map(|row| row.id).collect();
    let personas = ctx.personas().list()?;
    let recs = recommend(&personas, &installed, &ctx.catalog()?);
    print!("{}", display::recommendations(&recs));
    Ok(recs)
}
