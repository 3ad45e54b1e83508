//! winpersona library
//!
//! Persona-based application installation for Windows on top of winget:
//! catalog, personas, dependency resolution, and the install engine.

pub mod backup;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod host;
pub mod install_engine;
pub mod logging;
pub mod logic;
pub mod menu;
pub mod persona;
pub mod theme;
pub mod types;
pub mod winget;

// Re-export main types for convenience
pub use catalog::{Catalog, CatalogEntry, SystemRequirements};
pub use config::AppConfig;
pub use error::{Result, WinPersonaError};
pub use history::{History, InstallRecord};
pub use install_engine::{CancelFlag, InstallEngine, InstallOptions, InstallPlan, InstallReport};
pub use persona::{Persona, PersonaStore};
pub use types::{InstallScope, InstallStatus, RetryStrategy};
pub use winget::{CommandOutput, PackageManager, Winget};

// Dependency resolution
pub use logic::resolver::{ResolutionResult, resolve};
