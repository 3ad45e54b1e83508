//! Application catalog: the master mapping from display name to winget metadata.
//!
//! The catalog file is a JSON object keyed by application name. Each value is
//! either a bare string (legacy form: the winget package id, nothing else) or
//! an object carrying the id plus dependency, conflict, and requirement
//! metadata. Both shapes are normalized into [`CatalogEntry`] at load time so
//! the resolver only ever sees one shape.
//!
//! ```json
//! {
//!   "Git": "Git.Git",
//!   "GitHub CLI": { "id": "GitHub.cli", "dependencies": ["Git"] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, WinPersonaError};

/// Constraints an application places on the host. Checked by
/// `logic::requirements`, never by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_memory_gb: Option<f64>,
    /// Minimum Windows build number (e.g. 19041 for WSL2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_os_build: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_admin: bool,
}

impl SystemRequirements {
    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.min_memory_gb.is_none() && self.min_os_build.is_none() && !self.requires_admin
    }
}

/// Metadata half of the enhanced catalog entry, exactly as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "SystemRequirements::is_empty")]
    pub system_requirements: SystemRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One catalog value as it appears in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCatalogEntry {
    /// Legacy entry: the name maps directly to a package id
    Simple(String),
    /// Enhanced entry with dependency metadata
    WithMetadata(EntryMetadata),
}

/// Normalized catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub package_id: String,
    pub dependencies: Vec<String>,
    pub conflicts: Vec<String>,
    pub system_requirements: SystemRequirements,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl CatalogEntry {
    /// Entry with a package id and no metadata.
    pub fn simple(name: impl Into<String>, package_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_id: package_id.into(),
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            system_requirements: SystemRequirements::default(),
            category: None,
            description: None,
        }
    }

    /// Builder-style helper to declare dependencies.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style helper to declare conflicts.
    pub fn with_conflicts<I, S>(mut self, conflicts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts = conflicts.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style helper to set requirements.
    pub fn with_requirements(mut self, requirements: SystemRequirements) -> Self {
        self.system_requirements = requirements;
        self
    }

    /// Builder-style helper to set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// True if the entry carries anything beyond the package id.
    pub fn has_metadata(&self) -> bool {
        !self.dependencies.is_empty()
            || !self.conflicts.is_empty()
            || !self.system_requirements.is_empty()
            || self.category.is_some()
            || self.description.is_some()
    }

    fn from_raw(name: String, raw: RawCatalogEntry) -> Self {
        match raw {
            RawCatalogEntry::Simple(package_id) => Self::simple(name, package_id),
            RawCatalogEntry::WithMetadata(meta) => Self {
                name,
                package_id: meta.id,
                dependencies: meta.dependencies,
                conflicts: meta.conflicts,
                system_requirements: meta.system_requirements,
                category: meta.category,
                description: meta.description,
            },
        }
    }

    fn to_raw(&self) -> RawCatalogEntry {
        if !self.has_metadata() {
            return RawCatalogEntry::Simple(self.package_id.clone());
        }
        RawCatalogEntry::WithMetadata(EntryMetadata {
            id: self.package_id.clone(),
            dependencies: self.dependencies.clone(),
            conflicts: self.conflicts.clone(),
            system_requirements: self.system_requirements.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
        })
    }
}

/// The application catalog, keyed by display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse catalog JSON, accepting both entry shapes.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawCatalogEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(name, entry)| (name.clone(), CatalogEntry::from_raw(name, entry)))
            .collect();
        Ok(Self { entries })
    }

    /// Serialize to pretty JSON. Entries without metadata use the legacy string form.
    pub fn to_json(&self) -> Result<String> {
        let raw: BTreeMap<&str, RawCatalogEntry> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.to_raw()))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Load the catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WinPersonaError::catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), entries = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Load the catalog, or return an empty one if the file does not exist yet.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Catalog file not found, starting empty");
            return Ok(Self::new());
        }
        Self::load(path)
    }

    /// Save the catalog to a JSON file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), entries = self.len(), "Catalog saved");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Find the display name that owns a winget package id (case-insensitive).
    pub fn find_by_package_id(&self, package_id: &str) -> Option<&CatalogEntry> {
        self.entries
            .values()
            .find(|e| e.package_id.eq_ignore_ascii_case(package_id))
    }

    /// Insert or replace an entry. Returns the previous entry, if any.
    pub fn upsert(&mut self, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Names of entries that declare `name` as a dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.entries
            .values()
            .filter(|e| e.dependencies.iter().any(|d| d == name))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Remove an entry.
    ///
    /// Refuses when other entries still depend on it, unless `force` is set.
    pub fn remove(&mut self, name: &str, force: bool) -> Result<CatalogEntry> {
        if !self.contains(name) {
            return Err(WinPersonaError::catalog(format!("Unknown application: {}", name)));
        }
        let dependents = self.dependents_of(name);
        if !dependents.is_empty() && !force {
            return Err(WinPersonaError::catalog(format!(
                "{} is required by: {}",
                name,
                dependents.join(", ")
            )));
        }
        // contains() checked above
        self.entries
            .remove(name)
            .ok_or_else(|| WinPersonaError::catalog(format!("Unknown application: {}", name)))
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }
}

/// Catalog written by `winpersona init`.
pub fn default_catalog() -> Catalog {
    let dev = |name: &str, id: &str| CatalogEntry::simple(name, id).with_category("Development");
    [
        dev("Git", "Git.Git"),
        dev("GitHub CLI", "GitHub.cli").with_dependencies(["Git"]),
        dev("Visual Studio Code", "Microsoft.VisualStudioCode"),
        dev("Windows Terminal", "Microsoft.WindowsTerminal"),
        dev("PowerShell", "Microsoft.PowerShell"),
        dev("Node.js LTS", "OpenJS.NodeJS.LTS"),
        dev("Python 3", "Python.Python.3.12"),
        dev("WSL2", "Microsoft.WSL").with_requirements(SystemRequirements {
            min_os_build: Some(19041),
            requires_admin: true,
            ..Default::default()
        }),
        dev("Docker Desktop", "Docker.DockerDesktop")
            .with_dependencies(["WSL2"])
            .with_conflicts(["Rancher Desktop"])
            .with_requirements(SystemRequirements {
                min_memory_gb: Some(4.0),
                min_os_build: Some(19041),
                requires_admin: true,
            }),
        dev("Rancher Desktop", "SUSE.RancherDesktop")
            .with_dependencies(["WSL2"])
            .with_conflicts(["Docker Desktop"]),
        CatalogEntry::simple("7-Zip", "7zip.7zip").with_category("Utilities"),
        CatalogEntry::simple("PowerToys", "Microsoft.PowerToys").with_category("Utilities"),
        CatalogEntry::simple("Everything", "voidtools.Everything").with_category("Utilities"),
        CatalogEntry::simple("Firefox", "Mozilla.Firefox").with_category("Browsers"),
        CatalogEntry::simple("Google Chrome", "Google.Chrome").with_category("Browsers"),
        CatalogEntry::simple("VLC", "VideoLAN.VLC").with_category("Media"),
        CatalogEntry::simple("OBS Studio", "OBSProject.OBSStudio")
            .with_category("Media")
            .with_requirements(SystemRequirements {
                min_memory_gb: Some(4.0),
                ..Default::default()
            }),
        CatalogEntry::simple("GIMP", "GIMP.GIMP").with_category("Media"),
        CatalogEntry::simple("Spotify", "Spotify.Spotify").with_category("Media"),
        CatalogEntry::simple("Discord", "Discord.Discord").with_category("Communication"),
        CatalogEntry::simple("Slack", "SlackTechnologies.Slack").with_category("Communication"),
        CatalogEntry::simple("Zoom", "Zoom.Zoom").with_category("Communication"),
        CatalogEntry::simple("Steam", "Valve.Steam").with_category("Gaming"),
        CatalogEntry::simple("LibreOffice", "TheDocumentFoundation.LibreOffice")
            .with_category("Office"),
        CatalogEntry::simple("Notion", "Notion.Notion").with_category("Office"),
    ]
    .into_iter()
    .collect()
}
