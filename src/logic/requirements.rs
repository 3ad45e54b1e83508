//! System requirement checks
//!
//! Compares each resolved application's `system_requirements` against the
//! detected [`HostInfo`]. Runs after resolution and never changes the order;
//! issues are shown next to the resolver's and the user may proceed anyway.

use std::fmt;

use crate::catalog::Catalog;
use crate::host::HostInfo;

/// One unmet requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementIssue {
    InsufficientMemory {
        app: String,
        required_gb: f64,
        available_gb: f64,
    },
    OsTooOld {
        app: String,
        required_build: u32,
        current_build: u32,
    },
    ElevationRequired {
        app: String,
    },
}

impl RequirementIssue {
    /// Application the issue belongs to.
    pub fn app(&self) -> &str {
        match self {
            Self::InsufficientMemory { app, .. }
            | Self::OsTooOld { app, .. }
            | Self::ElevationRequired { app } => app,
        }
    }
}

impl fmt::Display for RequirementIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientMemory {
                app,
                required_gb,
                available_gb,
            } => write!(
                f,
                "{} needs {:.1} GB of memory ({:.1} GB installed)",
                app, required_gb, available_gb
            ),
            Self::OsTooOld {
                app,
                required_build,
                current_build,
            } => write!(
                f,
                "{} needs Windows build {} or newer (this is {})",
                app, required_build, current_build
            ),
            Self::ElevationRequired { app } => {
                write!(f, "{} must be installed from an elevated (administrator) session", app)
            }
        }
    }
}

/// Check every name in `order` that exists in `catalog`.
///
/// Facts the host could not determine are skipped rather than reported.
pub fn check_requirements<S: AsRef<str>>(
    order: &[S],
    catalog: &Catalog,
    host: &HostInfo,
) -> Vec<RequirementIssue> {
    let mut issues = Vec::new();

    for name in order {
        let Some(entry) = catalog.get(name.as_ref()) else {
            continue;
        };
        let req = &entry.system_requirements;

        if let (Some(required_gb), Some(available_gb)) = (req.min_memory_gb, host.total_memory_gb) {
            // Installed RAM is reported slightly under its nominal size
            if available_gb + 0.5 < required_gb {
                issues.push(RequirementIssue::InsufficientMemory {
                    app: entry.name.clone(),
                    required_gb,
                    available_gb,
                });
            }
        }

        if let (Some(required_build), Some(current_build)) = (req.min_os_build, host.os_build) {
            if current_build < required_build {
                issues.push(RequirementIssue::OsTooOld {
                    app: entry.name.clone(),
                    required_build,
                    current_build,
                });
            }
        }

        if req.requires_admin && host.is_elevated == Some(false) {
            issues.push(RequirementIssue::ElevationRequired {
                app: entry.name.clone(),
            });
        }
    }

    for issue in &issues {
        tracing::warn!(app = issue.app(), "{}", issue);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, SystemRequirements};

    fn catalog() -> Catalog {
        [
            CatalogEntry::simple("Git", "Git.Git"),
            CatalogEntry::simple("Docker Desktop", "Docker.DockerDesktop").with_requirements(
                SystemRequirements {
                    min_memory_gb: Some(4.0),
                    min_os_build: Some(19041),
                    requires_admin: true,
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_all_requirements_met() {
        let host = HostInfo {
            total_memory_gb: Some(15.8),
            os_build: Some(22631),
            is_elevated: Some(true),
        };
        assert!(check_requirements(&["Git", "Docker Desktop"], &catalog(), &host).is_empty());
    }

    #[test]
    fn test_all_requirements_unmet() {
        let host = HostInfo {
            total_memory_gb: Some(2.0),
            os_build: Some(18363),
            is_elevated: Some(false),
        };
        let issues = check_requirements(&["Docker Desktop"], &catalog(), &host);

        assert_eq!(issues.len(), 3);
        assert!(matches!(issues[0], RequirementIssue::InsufficientMemory { .. }));
        assert!(matches!(issues[1], RequirementIssue::OsTooOld { current_build: 18363, .. }));
        assert!(matches!(issues[2], RequirementIssue::ElevationRequired { .. }));
        assert!(issues.iter().all(|i| i.app() == "Docker Desktop"));
    }

    #[test]
    fn test_nominal_memory_tolerance() {
        // A "4 GB" machine typically reports about 3.8 GB
        let host = HostInfo {
            total_memory_gb: Some(3.8),
            ..Default::default()
        };
        assert!(check_requirements(&["Docker Desktop"], &catalog(), &host).is_empty());
    }

    #[test]
    fn test_unknown_host_facts_are_skipped() {
        let issues = check_requirements(&["Docker Desktop"], &catalog(), &HostInfo::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_apps_ignored() {
        let host = HostInfo {
            is_elevated: Some(false),
            ..Default::default()
        };
        assert!(check_requirements(&["Nope"], &catalog(), &host).is_empty());
    }

    #[test]
    fn test_issue_display() {
        let issue = RequirementIssue::OsTooOld {
            app: "WSL2".into(),
            required_build: 19041,
            current_build: 18363,
        };
        assert_eq!(
            issue.to_string(),
            "WSL2 needs Windows build 19041 or newer (this is 18363)"
        );
    }
}
