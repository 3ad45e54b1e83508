//! Persona management.
//!
//! A persona is a named bundle of applications: `base_apps` are always
//! installed, `optional_apps` are offered for selection. Each persona lives in
//! its own JSON file inside the personas directory:
//!
//! ```json
//! {
//!   "name": "Developer",
//!   "description": "Source control, editors and containers",
//!   "baseApps": ["Git", "Visual Studio Code"],
//!   "optionalApps": ["Docker Desktop"]
//! }
//! ```
//!
//! App names refer to catalog entries. The store does not require them to
//! exist; [`Persona::unknown_apps`] reports the ones that don't.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::error::{Result, WinPersonaError};

const MAX_NAME_LEN: usize = 64;

/// A named bundle of applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_apps: Vec<String>,
    #[serde(default)]
    pub optional_apps: Vec<String>,
}

impl Persona {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            base_apps: Vec::new(),
            optional_apps: Vec::new(),
        }
    }

    /// Base apps followed by the chosen optional apps, without duplicates.
    ///
    /// Selected names that are not among this persona's optional apps are ignored.
    pub fn requested_apps<S: AsRef<str>>(&self, selected_optional: &[S]) -> Vec<String> {
        let mut apps: Vec<String> = Vec::new();
        let chosen = self
            .optional_apps
            .iter()
            .filter(|app| selected_optional.iter().any(|s| s.as_ref() == app.as_str()));
        for app in self.base_apps.iter().chain(chosen) {
            if !apps.contains(app) {
                apps.push(app.clone());
            }
        }
        apps
    }

    /// True if the app is listed as base or optional.
    pub fn contains(&self, app: &str) -> bool {
        self.base_apps.iter().chain(&self.optional_apps).any(|a| a == app)
    }

    /// Add an app to the base or optional list. Moving between lists is allowed.
    pub fn add_app(&mut self, app: impl Into<String>, optional: bool) {
        let app = app.into();
        self.base_apps.retain(|a| *a != app);
        self.optional_apps.retain(|a| *a != app);
        if optional {
            self.optional_apps.push(app);
        } else {
            self.base_apps.push(app);
        }
    }

    /// Remove an app from both lists. Returns false if it was not present.
    pub fn remove_app(&mut self, app: &str) -> bool {
        let before = self.base_apps.len() + self.optional_apps.len();
        self.base_apps.retain(|a| a != app);
        self.optional_apps.retain(|a| a != app);
        before != self.base_apps.len() + self.optional_apps.len()
    }

    /// Apps (base or optional) that the catalog doesn't know.
    pub fn unknown_apps<'a>(&'a self, catalog: &Catalog) -> Vec<&'a str> {
        self.base_apps
            .iter()
            .chain(&self.optional_apps)
            .filter(|app| !catalog.contains(app))
            .map(String::as_str)
            .collect()
    }
}

/// Check a persona name: 1-64 chars of letters, digits, space, `-` or `_`.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WinPersonaError::validation("Persona name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(WinPersonaError::validation(format!(
            "Persona name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(WinPersonaError::validation(
            "Persona name can only contain letters, numbers, spaces, '-' and '_'",
        ));
    }
    Ok(())
}

/// File stem used for a persona name: lowercase, spaces become `-`.
pub fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == ' ' { '-' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Directory of persona JSON files.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    dir: PathBuf,
}

impl PersonaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for a persona name. Names that fail [`validate_name`] never map
    /// to a path, so lookups cannot leave the store directory.
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", slug(name))))
    }

    /// All persona files, sorted by persona name. Unreadable files are
    /// skipped with a warning so one bad file does not hide the rest.
    pub fn list(&self) -> Result<Vec<Persona>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut personas = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_persona(&path) {
                Ok(persona) => personas.push(persona),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping persona file: {}", e),
            }
        }
        personas.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(personas)
    }

    /// Persona file paths, for backup.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|path| path.exists())
    }

    /// Load a persona by name (case-insensitive through the slug).
    pub fn load(&self, name: &str) -> Result<Persona> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(WinPersonaError::persona(format!("Unknown persona: {}", name)));
        }
        read_persona(&path)
    }

    /// Write a persona, replacing any existing file.
    pub fn save(&self, persona: &Persona) -> Result<()> {
        let path = self.path_for(&persona.name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(persona)?)?;
        tracing::info!(persona = %persona.name, path = %path.display(), "Persona saved");
        Ok(())
    }

    /// Save a new persona; fails if one with the same name exists.
    pub fn create(&self, persona: &Persona) -> Result<()> {
        if self.exists(&persona.name) {
            return Err(WinPersonaError::persona(format!(
                "Persona already exists: {}",
                persona.name
            )));
        }
        self.save(persona)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(WinPersonaError::persona(format!("Unknown persona: {}", name)));
        }
        fs::remove_file(&path)?;
        tracing::info!(persona = %name, "Persona deleted");
        Ok(())
    }

    /// Load, add an app, save.
    pub fn add_app(&self, name: &str, app: &str, optional: bool) -> Result<Persona> {
        let mut persona = self.load(name)?;
        persona.add_app(app, optional);
        self.save(&persona)?;
        Ok(persona)
    }

    /// Load, remove an app, save. Fails if the app was not in the persona.
    pub fn remove_app(&self, name: &str, app: &str) -> Result<Persona> {
        let mut persona = self.load(name)?;
        if !persona.remove_app(app) {
            return Err(WinPersonaError::persona(format!(
                "{} is not part of persona {}",
                app, persona.name
            )));
        }
        self.save(&persona)?;
        Ok(persona)
    }
}

fn read_persona(path: &Path) -> Result<Persona> {
    let content = fs::read_to_string(path)?;
    let persona: Persona = serde_json::from_str(&content)
        .map_err(|e| WinPersonaError::persona(format!("{}: {}", path.display(), e)))?;
    Ok(persona)
}

/// Personas written by `winpersona init`. Every app exists in
/// `catalog::default_catalog()`.
pub fn default_personas() -> Vec<Persona> {
    let persona = |name: &str, description: &str, base: &[&str], optional: &[&str]| Persona {
        name: name.to_string(),
        description: description.to_string(),
        base_apps: base.iter().map(|s| s.to_string()).collect(),
        optional_apps: optional.iter().map(|s| s.to_string()).collect(),
    };

    vec![
        persona(
            "Developer",
            "Source control, editors, runtimes and containers",
            &["Git", "GitHub CLI", "Visual Studio Code", "Windows Terminal", "PowerShell"],
            &["Node.js LTS", "Python 3", "Docker Desktop", "Rancher Desktop", "PowerToys"],
        ),
        persona(
            "Content Creator",
            "Recording, editing and publishing",
            &["OBS Studio", "GIMP", "VLC", "7-Zip"],
            &["Spotify", "Discord"],
        ),
        persona(
            "Gamer",
            "Game launchers and voice chat",
            &["Steam", "Discord"],
            &["OBS Studio", "Spotify"],
        ),
        persona(
            "Office Worker",
            "Documents, meetings and browsing",
            &["LibreOffice", "Firefox", "Zoom", "7-Zip"],
            &["Slack", "Notion", "Google Chrome"],
        ),
        persona(
            "Minimal",
            "Essentials only",
            &["7-Zip", "Firefox"],
            &["Everything", "VLC"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    #[test]
    fn test_requested_apps_base_then_selected_optional() {
        let persona = &default_personas()[0];
        let apps = persona.requested_apps(&["Docker Desktop", "Not Listed"]);

        assert_eq!(apps.first().map(String::as_str), Some("Git"));
        assert_eq!(apps.last().map(String::as_str), Some("Docker Desktop"));
        assert!(!apps.contains(&"Not Listed".to_string()));
        assert!(!apps.contains(&"Python 3".to_string()));
    }

    #[test]
    fn test_add_app_moves_between_lists() {
        let mut persona = Persona::new("Test", "");
        persona.add_app("Git", false);
        persona.add_app("Git", true);
        assert!(persona.base_apps.is_empty());
        assert_eq!(persona.optional_apps, vec!["Git"]);
    }

    #[test]
    fn test_remove_app() {
        let mut persona = Persona::new("Test", "");
        persona.add_app("Git", false);
        assert!(persona.remove_app("Git"));
        assert!(!persona.remove_app("Git"));
    }

    #[test]
    fn test_default_personas_only_use_catalog_apps() {
        let catalog = default_catalog();
        for persona in default_personas() {
            assert!(
                persona.unknown_apps(&catalog).is_empty(),
                "{} has unknown apps",
                persona.name
            );
            validate_name(&persona.name).unwrap();
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Data Scientist").is_ok());
        assert!(validate_name("dev_ops-2").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Content Creator"), "content-creator");
        assert_eq!(slug(" Gamer "), "gamer");
    }

    #[test]
    fn test_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersonaStore::new(dir.path().join("personas"));
        assert!(store.list().unwrap().is_empty());

        let persona = Persona::new("Data Scientist", "Notebooks");
        store.create(&persona).unwrap();
        assert!(store.create(&persona).is_err(), "duplicate create must fail");

        let loaded = store.load("data scientist").unwrap();
        assert_eq!(loaded, persona);

        store.add_app("Data Scientist", "Python 3", false).unwrap();
        store.add_app("Data Scientist", "VLC", true).unwrap();
        let loaded = store.load("Data Scientist").unwrap();
        assert_eq!(loaded.base_apps, vec!["Python 3"]);
        assert_eq!(loaded.optional_apps, vec!["VLC"]);

        assert!(store.remove_app("Data Scientist", "Steam").is_err());
        store.remove_app("Data Scientist", "VLC").unwrap();

        store.delete("Data Scientist").unwrap();
        assert!(store.load("Data Scientist").is_err());
        assert!(store.delete("Data Scientist").is_err());
    }

    #[test]
    fn test_store_rejects_names_outside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersonaStore::new(dir.path().join("personas"));
        store.save(&Persona::new("Gamer", "")).unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, "{}").unwrap();

        assert!(store.delete("../config").is_err());
        assert!(store.load("../config").is_err());
        assert!(store.add_app("../config", "Git", false).is_err());
        assert!(store.remove_app("../config", "Git").is_err());
        assert!(!store.exists("../config"));
        assert!(store.save(&Persona::new("../config", "")).is_err());

        assert_eq!(fs::read_to_string(&config).unwrap(), "{}");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_skips_bad_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersonaStore::new(dir.path());
        store.save(&Persona::new("Zeta", "")).unwrap();
        store.save(&Persona::new("alpha", "")).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alpha", "Zeta"]);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let mut persona = Persona::new("Gamer", "");
        persona.add_app("Steam", false);
        let json = serde_json::to_value(&persona).unwrap();
        assert_eq!(json["baseApps"][0], "Steam");
        assert!(json["optionalApps"].as_array().unwrap().is_empty());
    }
}
