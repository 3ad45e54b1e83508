//! winpersona - main entry point
//!
//! Parses the command line, loads configuration, installs logging and the
//! Ctrl-C handler, then dispatches to a command or the interactive menu.

use anyhow::{Context as _, Result, bail};

use winpersona::catalog::CatalogEntry;
use winpersona::cli::{BackupCommands, CatalogCommands, Cli, Commands, PersonaCommands};
use winpersona::commands::{self, Context, InstallRequest};
use winpersona::config::{AppConfig, CONFIG_FILE};
use winpersona::theme::Styles;
use winpersona::{logging, menu};

fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        eprintln!("{} {:#}", Styles::error("✗"), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppConfig::default_data_dir().join(CONFIG_FILE));
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration {:?}", config_path))?;
    config.validate().context("Invalid configuration")?;

    let log_path = logging::init(cli.verbose, Some(config.log_dir().as_path()))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        log = ?log_path,
        dry_run = cli.dry_run,
        "winpersona starting"
    );

    let ctx = Context::new(config, config_path, cli.dry_run);
    let cancel = ctx.cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current application...");
        cancel.cancel();
    }) {
        tracing::warn!("Failed to install Ctrl-C handler: {}", e);
    }

    match cli.command {
        None => menu::run(&ctx),
        Some(command) => dispatch(&ctx, command),
    }
}

fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Init { force } => commands::init(ctx, force),
        Commands::Install {
            persona,
            optional,
            all_optional,
            no_deps,
            yes,
        } => {
            let request = InstallRequest {
                persona,
                optional,
                all_optional,
                no_deps,
                yes,
            };
            let report = commands::install(ctx, &request)?;
            if report.cancelled {
                bail!("Installation cancelled");
            }
            let failed = report.failed().count();
            if failed > 0 {
                bail!("{} application(s) failed to install", failed);
            }
            Ok(())
        }
        Commands::Resolve { apps, json } => commands::resolve_apps(ctx, &apps, json),
        Commands::Persona { action } => match action {
            PersonaCommands::List => commands::persona_list(ctx),
            PersonaCommands::Show { name } => commands::persona_show(ctx, &name),
            PersonaCommands::Create { name, description } => {
                commands::persona_create(ctx, &name, &description)
            }
            PersonaCommands::Delete { name } => commands::persona_delete(ctx, &name),
            PersonaCommands::AddApp {
                persona,
                app,
                optional,
            } => commands::persona_add_app(ctx, &persona, &app, optional),
            PersonaCommands::RemoveApp { persona, app } => {
                commands::persona_remove_app(ctx, &persona, &app)
            }
            PersonaCommands::Validate { name } => commands::persona_validate(ctx, name.as_deref()),
        },
        Commands::Catalog { action } => match action {
            CatalogCommands::List => commands::catalog_list(ctx),
            CatalogCommands::Show { name } => commands::catalog_show(ctx, &name),
            CatalogCommands::Add {
                name,
                id,
                depends,
                conflicts,
                category,
                description,
            } => {
                let mut entry = CatalogEntry::simple(name, id)
                    .with_dependencies(depends)
                    .with_conflicts(conflicts);
                entry.category = category;
                entry.description = description;
                commands::catalog_add(ctx, entry)
            }
            CatalogCommands::Remove { name, force } => commands::catalog_remove(ctx, &name, force),
        },
        Commands::History {
            limit,
            app,
            summary,
            clear,
        } => commands::history(ctx, limit, app.as_deref(), summary, clear),
        Commands::Backup { action } => match action {
            BackupCommands::Create => commands::backup_create(ctx),
            BackupCommands::List => commands::backup_list(ctx),
            BackupCommands::Restore { name, overwrite } => {
                commands::backup_restore(ctx, &name, overwrite)
            }
        },
        Commands::Updates { apply, id } => {
            let winget = ctx.winget();
            winget.version().context("winget is required for update checks")?;
            let failed = commands::updates(ctx, &winget, apply, id.as_deref())?;
            if failed > 0 {
                bail!("{} upgrade(s) failed", failed);
            }
            Ok(())
        }
        Commands::Recommend => commands::recommendations(ctx, &ctx.winget()).map(|_| ()),
    }
}
