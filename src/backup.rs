//! Persona backup and restore.
//!
//! A backup is a directory `personas-<YYYYmmdd-HHMMSS>` under the backups
//! directory holding a copy of every persona file plus `manifest.json`.
//! Restoring copies the files back into the persona store.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, WinPersonaError};
use crate::persona::{PersonaStore, validate_name};

const PREFIX: &str = "personas-";
const MANIFEST: &str = "manifest.json";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub created_at: DateTime<Utc>,
    pub personas: Vec<String>,
}

/// A backup found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    /// Directory name, used to refer to the backup
    pub name: String,
    pub path: PathBuf,
    pub manifest: BackupManifest,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    /// Files left alone because they already existed
    pub skipped: Vec<String>,
}

/// Backups directory manager.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copy every persona file into a new timestamped backup.
    pub fn backup(&self, store: &PersonaStore) -> Result<BackupInfo> {
        self.backup_at(store, Local::now().naive_local())
    }

    fn backup_at(&self, store: &PersonaStore, when: NaiveDateTime) -> Result<BackupInfo> {
        let files = store.files()?;
        if files.is_empty() {
            return Err(WinPersonaError::backup("There are no personas to back up"));
        }

        let name = format!("{}{}", PREFIX, when.format(STAMP_FORMAT));
        let path = self.dir.join(&name);
        if path.exists() {
            return Err(WinPersonaError::backup(format!("Backup {} already exists", name)));
        }
        fs::create_dir_all(&path)?;

        let mut personas = Vec::new();
        for file in &files {
            let Some(file_name) = file.file_name() else {
                continue;
            };
            fs::copy(file, path.join(file_name))?;
            personas.push(file_name.to_string_lossy().trim_end_matches(".json").to_string());
        }

        let created_at = Local
            .from_local_datetime(&when)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let manifest = BackupManifest { created_at, personas };
        fs::write(path.join(MANIFEST), serde_json::to_string_pretty(&manifest)?)?;

        tracing::info!(backup = %name, personas = manifest.personas.len(), "Personas backed up");
        Ok(BackupInfo { name, path, manifest })
    }

    /// Backups on disk, newest first. Directories without a readable
    /// manifest are ignored.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(PREFIX) || !entry.path().is_dir() {
                continue;
            }
            match read_manifest(&entry.path()) {
                Ok(manifest) => backups.push(BackupInfo {
                    name,
                    path: entry.path(),
                    manifest,
                }),
                Err(e) => tracing::warn!(backup = %name, "Ignoring backup: {}", e),
            }
        }
        backups.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(backups)
    }

    /// Copy a backup's persona files into the store.
    ///
    /// Existing personas are kept unless `overwrite` is set.
    pub fn restore(&self, name: &str, store: &PersonaStore, overwrite: bool) -> Result<RestoreReport> {
        validate_backup_name(name)?;
        let path = self.dir.join(name);
        if !path.is_dir() {
            return Err(WinPersonaError::backup(format!("Unknown backup: {}", name)));
        }
        let manifest = read_manifest(&path)?;
        // Entries are file stems; anything else could point outside the store
        if let Some(bad) = manifest.personas.iter().find(|p| validate_name(p).is_err()) {
            return Err(WinPersonaError::backup(format!(
                "Invalid persona entry in {}/{}: {}",
                name, MANIFEST, bad
            )));
        }

        fs::create_dir_all(store.dir())?;
        let mut report = RestoreReport::default();
        for persona in &manifest.personas {
            let file_name = format!("{}.json", persona);
            let source = path.join(&file_name);
            let target = store.dir().join(&file_name);
            if !source.exists() {
                tracing::warn!(backup = %name, file = %file_name, "Listed in manifest but missing");
                continue;
            }
            if target.exists() && !overwrite {
                report.skipped.push(persona.clone());
                continue;
            }
            fs::copy(&source, &target)?;
            report.restored.push(persona.clone());
        }

        tracing::info!(
            backup = %name,
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            "Personas restored"
        );
        Ok(report)
    }
}

/// Backup names are single directory names created by `backup()`.
fn validate_backup_name(name: &str) -> Result<()> {
    if !name.starts_with(PREFIX)
        || name.contains(['/', '\\'])
        || name.contains("..")
        || Path::new(name).components().count() != 1
    {
        return Err(WinPersonaError::backup(format!("Invalid backup name: {}", name)));
    }
    Ok(())
}

fn read_manifest(dir: &Path) -> Result<BackupManifest> {
    let content = fs::read_to_string(dir.join(MANIFEST))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn setup() -> (tempfile::TempDir, PersonaStore, BackupManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = PersonaStore::new(dir.path().join("personas"));
        let backups = BackupManager::new(dir.path().join("backups"));
        (dir, store, backups)
    }

    #[test]
    fn test_backup_and_restore_round_trip() {
        let (_dir, store, backups) = setup();
        let mut dev = Persona::new("Developer", "dev tools");
        dev.add_app("Git", false);
        store.save(&dev).unwrap();
        store.save(&Persona::new("Gamer", "")).unwrap();

        let info = backups.backup_at(&store, at(9)).unwrap();
        assert_eq!(info.name, "personas-20261019-093000");
        assert_eq!(info.manifest.personas, vec!["developer", "gamer"]);

        store.delete("Developer").unwrap();
        store.save(&Persona::new("Gamer", "changed")).unwrap();

        let report = backups.restore(&info.name, &store, false).unwrap();
        assert_eq!(report.restored, vec!["developer"]);
        assert_eq!(report.skipped, vec!["gamer"]);
        assert_eq!(store.load("Developer").unwrap(), dev);
        assert_eq!(store.load("Gamer").unwrap().description, "changed");

        let report = backups.restore(&info.name, &store, true).unwrap();
        assert_eq!(report.restored.len(), 2);
        assert_eq!(store.load("Gamer").unwrap().description, "");
    }

    #[test]
    fn test_backup_requires_personas() {
        let (_dir, store, backups) = setup();
        assert!(backups.backup(&store).is_err());
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store, backups) = setup();
        store.save(&Persona::new("Minimal", "")).unwrap();
        backups.backup_at(&store, at(8)).unwrap();
        backups.backup_at(&store, at(14)).unwrap();
        assert!(backups.backup_at(&store, at(14)).is_err(), "same timestamp twice");

        let names: Vec<String> = backups.list().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["personas-20261019-143000", "personas-20261019-083000"]);
    }

    #[test]
    fn test_restore_rejects_bad_manifest_entries() {
        let (dir, store, backups) = setup();
        store.save(&Persona::new("Gamer", "")).unwrap();
        let info = backups.backup_at(&store, at(10)).unwrap();
        fs::write(info.path.join("../x.json"), "{}").unwrap();
        let manifest = BackupManifest {
            created_at: info.manifest.created_at,
            personas: vec!["gamer".into(), "../x".into()],
        };
        fs::write(info.path.join(MANIFEST), serde_json::to_string(&manifest).unwrap()).unwrap();
        store.delete("Gamer").unwrap();

        assert!(backups.restore(&info.name, &store, true).is_err());
        assert!(!dir.path().join("x.json").exists());
        assert!(!store.exists("Gamer"), "nothing restored from a bad manifest");
    }

    #[test]
    fn test_restore_rejects_path_traversal() {
        let (_dir, store, backups) = setup();
        assert!(backups.restore("../personas", &store, true).is_err());
        assert!(backups.restore("personas-x/../../etc", &store, true).is_err());
        assert!(backups.restore("personas-19990101-000000", &store, true).is_err());
    }
}
