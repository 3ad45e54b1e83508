//! winget integration
//!
//! Everything that touches the `winget` executable lives here:
//!
//! - [`WingetArgs`]: typed argument contracts, one struct per subcommand, so
//!   flag spelling is fixed in one place
//! - [`PackageManager`]: the trait the install engine and update flow talk to.
//!   Tests substitute a fake; production uses [`Winget`]
//! - Exit-code classification and the fixed-width table parser used for
//!   `winget list` and `winget upgrade` output
//!
//! # Failure Modes
//!
//! - winget missing or not launchable: `WinPersonaError::PackageManager`
//! - winget ran but reported failure: returned as [`CommandOutput`] with the
//!   exit code; the caller decides whether to retry

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Result, WinPersonaError};
use crate::types::{InstallScope, RetryStrategy};

/// `APPINSTALLER_CLI_ERROR_PACKAGE_ALREADY_INSTALLED` (0x8A150061)
pub const EXIT_ALREADY_INSTALLED: i32 = 0x8A15_0061_u32 as i32;
/// `APPINSTALLER_CLI_ERROR_UPDATE_NOT_APPLICABLE` (0x8A15002B)
pub const EXIT_UPDATE_NOT_APPLICABLE: i32 = 0x8A15_002B_u32 as i32;
/// `APPINSTALLER_CLI_ERROR_NO_APPLICATIONS_FOUND` (0x8A150014)
pub const EXIT_NO_APPLICATIONS_FOUND: i32 = 0x8A15_0014_u32 as i32;

const AGREEMENT_FLAGS: [&str; 2] = ["--accept-source-agreements", "--disable-interactivity"];

// ============================================================================
// Argument contracts
// ============================================================================

/// Typed winget arguments.
///
/// `to_cli_args()` returns the full argument vector, subcommand first,
/// exactly as it is passed to the process.
pub trait WingetArgs {
    fn to_cli_args(&self) -> Vec<String>;
}

/// `winget install`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallArgs {
    pub package_id: String,
    pub strategy: RetryStrategy,
    pub scope: Option<InstallScope>,
}

impl WingetArgs for InstallArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["install", "--id", &self.package_id, "--exact", "--silent"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push("--accept-package-agreements".into());
        args.extend(AGREEMENT_FLAGS.iter().map(|s| s.to_string()));
        if let Some(scope) = self.scope {
            args.push("--scope".into());
            args.push(scope.to_string());
        }
        if self.strategy == RetryStrategy::ForceSource {
            args.extend(["--source", "winget", "--force"].iter().map(|s| s.to_string()));
        }
        args
    }
}

/// `winget list`, optionally narrowed to one exact id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    pub package_id: Option<String>,
}

impl WingetArgs for ListArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["list".to_string()];
        if let Some(id) = &self.package_id {
            args.extend(["--id".to_string(), id.clone(), "--exact".to_string()]);
        }
        args.extend(AGREEMENT_FLAGS.iter().map(|s| s.to_string()));
        args
    }
}

/// `winget upgrade`: lists upgrades when `package_id` is `None`, otherwise
/// upgrades that package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeArgs {
    pub package_id: Option<String>,
}

impl WingetArgs for UpgradeArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["upgrade".to_string()];
        if let Some(id) = &self.package_id {
            args.extend(
                ["--id", id, "--exact", "--silent", "--accept-package-agreements"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        args.extend(AGREEMENT_FLAGS.iter().map(|s| s.to_string()));
        args
    }
}

/// Render a command line for display (dry run, logs).
pub fn command_line(program: &Path, args: &impl WingetArgs) -> String {
    let rendered: Vec<String> = args
        .to_cli_args()
        .into_iter()
        .map(|a| if a.contains(' ') { format!("\"{}\"", a) } else { a })
        .collect();
    format!("{} {}", program.display(), rendered.join(" "))
}

// ============================================================================
// Process output
// ============================================================================

/// Captured result of one winget invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated without one)
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn outcome(&self) -> ExitOutcome {
        classify_exit_code(self.exit_code)
    }

    /// Last non-empty line of stderr, else stdout. Used as a failure summary.
    pub fn summary(&self) -> Option<String> {
        let pick = |s: &str| {
            s.lines()
                .map(|l| l.rsplit('\r').next().unwrap_or(l).trim())
                .filter(|l| !l.is_empty())
                .last()
                .map(str::to_string)
        };
        pick(&self.stderr).or_else(|| pick(&self.stdout))
    }
}

/// What an exit code means for the install engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    AlreadyInstalled,
    /// No package matched the id; retrying cannot help
    NotFound,
    /// Any other failure; the next strategy may succeed
    Retryable,
}

pub fn classify_exit_code(code: Option<i32>) -> ExitOutcome {
    match code {
        Some(0) => ExitOutcome::Success,
        Some(EXIT_ALREADY_INSTALLED) | Some(EXIT_UPDATE_NOT_APPLICABLE) => ExitOutcome::AlreadyInstalled,
        Some(EXIT_NO_APPLICATIONS_FOUND) => ExitOutcome::NotFound,
        _ => ExitOutcome::Retryable,
    }
}

// ============================================================================
// Table parsing
// ============================================================================

/// One row of `winget list` / `winget upgrade` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub name: String,
    pub id: String,
    pub version: String,
    pub available: Option<String>,
    pub source: Option<String>,
}

const COLUMNS: [&str; 5] = ["Name", "Id", "Version", "Available", "Source"];

/// Parse winget's fixed-width table output.
///
/// Spinner frames written with `\r` before the header are discarded. Parsing
/// stops at the first blank line or summary footer (`3 upgrades available.`).
/// Output without a recognizable header yields no rows.
pub fn parse_table(output: &str) -> Vec<PackageRow> {
    // Keep only what remains visible after carriage-return overwrites
    let lines: Vec<&str> = output
        .lines()
        .map(|l| l.rsplit('\r').next().unwrap_or(l).trim_end())
        .collect();

    let Some(header_idx) = lines
        .iter()
        .position(|l| l.trim_start().starts_with("Name") && l.contains(" Id "))
    else {
        return Vec::new();
    };

    let offsets = column_offsets(lines[header_idx]);
    let (Some(_), Some(id_col)) = (offsets[0], offsets[1]) else {
        return Vec::new();
    };

    // Sorted (column index, start offset) pairs for slicing
    let mut present: Vec<(usize, usize)> = offsets
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.map(|o| (i, o)))
        .collect();
    present.sort_by_key(|&(_, o)| o);

    let mut rows = Vec::new();
    for line in lines.iter().skip(header_idx + 1) {
        if line.trim_start().starts_with('-') && line.trim().chars().all(|c| c == '-') {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || is_footer(trimmed) {
            break;
        }

        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= id_col {
            continue;
        }

        let mut fields: [Option<String>; 5] = Default::default();
        for (pos, &(col, start)) in present.iter().enumerate() {
            let end = present.get(pos + 1).map(|&(_, o)| o).unwrap_or(chars.len());
            let start = start.min(chars.len());
            let end = end.min(chars.len()).max(start);
            let value: String = chars[start..end].iter().collect::<String>().trim().to_string();
            if !value.is_empty() {
                fields[col] = Some(value);
            }
        }

        let [name, id, version, available, source] = fields;
        let (Some(name), Some(id)) = (name, id) else {
            continue;
        };
        rows.push(PackageRow {
            name,
            id,
            version: version.unwrap_or_default(),
            available,
            source,
        });
    }
    rows
}

/// Char offsets of each known column in the header line.
fn column_offsets(header: &str) -> [Option<usize>; 5] {
    let mut offsets = [None; 5];
    let mut word_start = None;
    let chars: Vec<char> = header.chars().collect();

    for i in 0..=chars.len() {
        let is_space = chars.get(i).is_none_or(|c| c.is_whitespace());
        match (word_start, is_space) {
            (None, false) => word_start = Some(i),
            (Some(start), true) => {
                let word: String = chars[start..i].iter().collect();
                if let Some(col) = COLUMNS.iter().position(|c| *c == word) {
                    offsets[col].get_or_insert(start);
                }
                word_start = None;
            }
            _ => {}
        }
    }
    offsets
}

fn is_footer(line: &str) -> bool {
    line.ends_with("available.")
        || line.starts_with("The following packages")
        || line.starts_with("No installed package")
}

// ============================================================================
// PackageManager trait and winget implementation
// ============================================================================

/// Operations the rest of the crate needs from a package manager.
pub trait PackageManager {
    /// Program path shown in dry-run command lines.
    fn program(&self) -> &Path;

    /// Run one install attempt. A non-zero exit is `Ok` with the exit code.
    fn install(&self, args: &InstallArgs) -> Result<CommandOutput>;

    /// Whether a package with this exact id is installed.
    fn is_installed(&self, package_id: &str) -> Result<bool>;

    /// All installed packages.
    fn list_installed(&self) -> Result<Vec<PackageRow>>;

    /// Packages with an available upgrade.
    fn list_upgrades(&self) -> Result<Vec<PackageRow>>;

    /// Upgrade one package.
    fn upgrade(&self, package_id: &str) -> Result<CommandOutput>;
}

/// The real winget executable.
#[derive(Debug, Clone)]
pub struct Winget {
    program: PathBuf,
}

impl Winget {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Spawn winget with typed args and capture its output.
    pub fn run(&self, args: &impl WingetArgs) -> Result<CommandOutput> {
        let cli_args = args.to_cli_args();
        tracing::debug!(program = %self.program.display(), args = ?cli_args, "Running winget");

        let output = Command::new(&self.program)
            .args(&cli_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                WinPersonaError::package_manager(format!(
                    "Failed to launch {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };
        tracing::debug!(exit_code = ?result.exit_code, "winget finished");
        Ok(result)
    }

    /// Check that the executable can be launched (`winget --version`).
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                WinPersonaError::package_manager(format!(
                    "winget is not available ({}): {}",
                    self.program.display(),
                    e
                ))
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl PackageManager for Winget {
    fn program(&self) -> &Path {
        &self.program
    }

    fn install(&self, args: &InstallArgs) -> Result<CommandOutput> {
        self.run(args)
    }

    fn is_installed(&self, package_id: &str) -> Result<bool> {
        let output = self.run(&ListArgs {
            package_id: Some(package_id.to_string()),
        })?;
        if output.exit_code != Some(0) {
            return Ok(false);
        }
        Ok(parse_table(&output.stdout)
            .iter()
            .any(|row| row.id.eq_ignore_ascii_case(package_id)))
    }

    fn list_installed(&self) -> Result<Vec<PackageRow>> {
        let output = self.run(&ListArgs::default())?;
        if output.exit_code != Some(0) {
            return Err(WinPersonaError::package_manager(format!(
                "winget list failed: {}",
                output.summary().unwrap_or_else(|| format!("exit code {:?}", output.exit_code))
            )));
        }
        Ok(parse_table(&output.stdout))
    }

    fn list_upgrades(&self) -> Result<Vec<PackageRow>> {
        let output = self.run(&UpgradeArgs::default())?;
        // winget exits non-zero when there is nothing to upgrade
        Ok(parse_table(&output.stdout))
    }

    fn upgrade(&self, package_id: &str) -> Result<CommandOutput> {
        self.run(&UpgradeArgs {
            package_id: Some(package_id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPGRADE_OUTPUT: &str = "   - \r   \\ \r\
Name                        Id                         Version      Available    Source\r\n\
---------------------------------------------------------------------------------------\r\n\
Git                         Git.Git                    2.42.0       2.43.0       winget\r\n\
Microsoft Visual Studio Co… Microsoft.VisualStudioCode 1.84.2       1.85.1       winget\r\n\
7-Zip 23.01 (x64)           7zip.7zip                  23.01        24.05        winget\r\n\
3 upgrades available.\r\n";

    const LIST_OUTPUT: &str = "\
Name                Id                   Version   Source\n\
-------------------------------------------------------\n\
Git                 Git.Git              2.43.0    winget\n\
Some MSI App        {1234-ABCD}          1.0\n";

    #[test]
    fn test_install_args_standard() {
        let args = InstallArgs {
            package_id: "Git.Git".into(),
            strategy: RetryStrategy::Standard,
            scope: None,
        };
        assert_eq!(
            args.to_cli_args(),
            vec![
                "install",
                "--id",
                "Git.Git",
                "--exact",
                "--silent",
                "--accept-package-agreements",
                "--accept-source-agreements",
                "--disable-interactivity",
            ]
        );
    }

    #[test]
    fn test_install_args_force_source_with_scope() {
        let args = InstallArgs {
            package_id: "Git.Git".into(),
            strategy: RetryStrategy::ForceSource,
            scope: Some(InstallScope::Machine),
        };
        let cli = args.to_cli_args();
        assert!(cli.windows(2).any(|w| w == ["--scope", "machine"]));
        assert!(cli.windows(2).any(|w| w == ["--source", "winget"]));
        assert_eq!(cli.last().map(String::as_str), Some("--force"));
    }

    #[test]
    fn test_list_and_upgrade_args() {
        assert_eq!(ListArgs::default().to_cli_args()[0], "list");
        let upgrade = UpgradeArgs {
            package_id: Some("Git.Git".into()),
        };
        let cli = upgrade.to_cli_args();
        assert_eq!(cli[0], "upgrade");
        assert!(cli.windows(2).any(|w| w == ["--id", "Git.Git"]));
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let line = command_line(
            Path::new("winget"),
            &ListArgs {
                package_id: Some("Some Id".into()),
            },
        );
        assert!(line.starts_with("winget list --id \"Some Id\" --exact"));
    }

    #[test]
    fn test_classify_exit_codes() {
        assert_eq!(classify_exit_code(Some(0)), ExitOutcome::Success);
        assert_eq!(classify_exit_code(Some(-1978335135)), ExitOutcome::AlreadyInstalled);
        assert_eq!(classify_exit_code(Some(-1978335189)), ExitOutcome::AlreadyInstalled);
        assert_eq!(classify_exit_code(Some(-1978335212)), ExitOutcome::NotFound);
        assert_eq!(classify_exit_code(Some(1)), ExitOutcome::Retryable);
        assert_eq!(classify_exit_code(None), ExitOutcome::Retryable);
    }

    #[test]
    fn test_parse_upgrade_table() {
        let rows = parse_table(UPGRADE_OUTPUT);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].name, "Git");
        assert_eq!(rows[0].id, "Git.Git");
        assert_eq!(rows[0].version, "2.42.0");
        assert_eq!(rows[0].available.as_deref(), Some("2.43.0"));
        assert_eq!(rows[0].source.as_deref(), Some("winget"));

        assert_eq!(rows[1].id, "Microsoft.VisualStudioCode");
        assert_eq!(rows[2].name, "7-Zip 23.01 (x64)");
    }

    #[test]
    fn test_parse_list_table_without_available_column() {
        let rows = parse_table(LIST_OUTPUT);
        assert_eq!(rows[0].id, "Git.Git");
        assert_eq!(rows[0].available, None);
        assert_eq!(rows[0].source.as_deref(), Some("winget"));
        assert_eq!(rows.last().map(|r| r.id.as_str()), Some("{1234-ABCD}"));
        assert_eq!(rows.last().and_then(|r| r.source.clone()), None);
    }

    #[test]
    fn test_parse_no_header() {
        assert!(parse_table("No installed package found matching input criteria.\n").is_empty());
        assert!(parse_table("").is_empty());
    }

    #[test]
    fn test_summary_prefers_stderr() {
        let out = CommandOutput {
            stdout: "Found Git [Git.Git]\nInstalling...\n".into(),
            stderr: "Installer failed with exit code: 1603\n\n".into(),
            exit_code: Some(1),
        };
        assert_eq!(out.summary().as_deref(), Some("Installer failed with exit code: 1603"));
        assert_eq!(out.outcome(), ExitOutcome::Retryable);
    }
}
