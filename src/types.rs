//! Shared enums for winpersona
//!
//! Status and strategy values are proper enums instead of strings so the
//! history file, the CLI, and the install engine agree on spelling.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Outcome of installing one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InstallStatus {
    /// winget reported a successful install
    Installed,
    /// The package was present before this run
    AlreadyInstalled,
    /// Every retry strategy failed
    Failed,
    /// Not attempted (unknown to the catalog, or the run was cancelled)
    Skipped,
    /// Dry run: the command was shown but not executed
    DryRun,
}

/// How a single `winget install` attempt is issued.
///
/// The engine always tries `Standard` first and falls back to `ForceSource`
/// once; there is no other sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RetryStrategy {
    /// `--exact --silent` against the default sources
    Standard,
    /// Pins `--source winget` and adds `--force`
    ForceSource,
}

impl RetryStrategy {
    /// The fixed attempt sequence.
    pub const SEQUENCE: [RetryStrategy; 2] = [RetryStrategy::Standard, RetryStrategy::ForceSource];
}

/// Optional `--scope` passed to winget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallScope {
    User,
    Machine,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_install_status_display() {
        assert_eq!(InstallStatus::AlreadyInstalled.to_string(), "already-installed");
        assert_eq!(InstallStatus::DryRun.to_string(), "dry-run");
    }

    #[test]
    fn test_install_status_serde_matches_display() {
        for status in InstallStatus::iter() {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_retry_sequence_order() {
        assert_eq!(
            RetryStrategy::SEQUENCE,
            [RetryStrategy::Standard, RetryStrategy::ForceSource]
        );
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("machine".parse::<InstallScope>().unwrap(), InstallScope::Machine);
        assert!("global".parse::<InstallScope>().is_err());
    }
}
