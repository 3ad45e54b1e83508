use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// winpersona - persona-based Windows application installer
#[derive(Parser)]
#[command(name = "winpersona")]
#[command(about = "Install curated sets of Windows applications through winget")]
#[command(version)]
pub struct Cli {
    /// Path to config.json (default: data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show info-level logs on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dry-run mode: show the winget commands without running them.
    ///
    /// Install-state checks (`winget list`) still run so the preview matches
    /// what a real run would do.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default config, catalog, and personas
    Init {
        /// Replace files that already exist
        #[arg(long)]
        force: bool,
    },
    /// Install a persona's applications
    Install {
        /// Persona name
        persona: String,
        /// Optional app to include (repeatable)
        #[arg(short, long = "optional", value_name = "APP")]
        optional: Vec<String>,
        /// Include every optional app
        #[arg(long, conflicts_with = "optional")]
        all_optional: bool,
        /// Skip dependency resolution and install exactly the listed apps
        #[arg(long)]
        no_deps: bool,
        /// Don't ask for confirmation when issues are found
        #[arg(short, long)]
        yes: bool,
    },
    /// Resolve dependencies for apps and print the result
    Resolve {
        /// Application names
        #[arg(required = true)]
        apps: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage personas
    Persona {
        #[command(subcommand)]
        action: PersonaCommands,
    },
    /// Manage the application catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },
    /// Show installation history
    History {
        /// Number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only records for this app
        #[arg(long)]
        app: Option<String>,
        /// Show counts per status instead of records
        #[arg(long)]
        summary: bool,
        /// Delete the history file
        #[arg(long, conflicts_with_all = ["app", "summary"])]
        clear: bool,
    },
    /// Back up and restore personas
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// List available upgrades for installed packages
    Updates {
        /// Upgrade the listed packages
        #[arg(long)]
        apply: bool,
        /// Only this package id
        #[arg(long)]
        id: Option<String>,
    },
    /// Rank personas by how much of each is already installed
    Recommend,
}

#[derive(Subcommand)]
pub enum PersonaCommands {
    /// List personas
    List,
    /// Show one persona
    Show { name: String },
    /// Create an empty persona
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Delete a persona
    Delete { name: String },
    /// Add an app to a persona
    AddApp {
        persona: String,
        app: String,
        /// Add as optional instead of base
        #[arg(long)]
        optional: bool,
    },
    /// Remove an app from a persona
    RemoveApp { persona: String, app: String },
    /// Check personas for apps missing from the catalog
    Validate {
        /// Persona name (default: all)
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List catalog entries
    List,
    /// Show one entry
    Show { name: String },
    /// Add or replace an entry
    Add {
        name: String,
        /// winget package id
        #[arg(long)]
        id: String,
        /// Dependency name (repeatable)
        #[arg(long = "depends", value_name = "APP")]
        depends: Vec<String>,
        /// Conflicting app name (repeatable)
        #[arg(long = "conflicts", value_name = "APP")]
        conflicts: Vec<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove an entry
    Remove {
        name: String,
        /// Remove even if other entries depend on it
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Back up all personas
    Create,
    /// List backups, newest first
    List,
    /// Restore personas from a backup
    Restore {
        /// Backup name as shown by `backup list`
        name: String,
        /// Replace personas that already exist
        #[arg(long)]
        overwrite: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
