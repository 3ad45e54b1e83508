//! Install engine
//!
//! Turns a persona (or an explicit app list) into an [`InstallPlan`] and drives
//! the package manager through it, one application at a time.
//!
//! # Retry Policy
//!
//! Each application gets at most two attempts, always in the same order:
//! [`RetryStrategy::Standard`], then, after `retry_delay`,
//! [`RetryStrategy::ForceSource`]. "Already installed" and "no package found"
//! exit codes end the sequence early.
//!
//! # Failure Policy
//!
//! A failed install is a [`InstallStatus::Failed`] record, not an error. Only
//! a package manager that cannot be launched at all aborts the run.
//!
//! # Cancellation
//!
//! [`CancelFlag`] is checked between applications. Once set, the remaining
//! applications are recorded as skipped.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::Result;
use crate::history::{History, InstallRecord};
use crate::logic::resolver::{ResolutionResult, resolve};
use crate::persona::Persona;
use crate::types::{InstallScope, InstallStatus, RetryStrategy};
use crate::winget::{ExitOutcome, InstallArgs, PackageManager, command_line};

// ============================================================================
// Plan
// ============================================================================

/// What will be installed, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallPlan {
    pub persona: Option<String>,
    pub order: Vec<String>,
    /// Present when the dependency resolver was used
    pub resolution: Option<ResolutionResult>,
    /// Requested names the catalog doesn't know (unresolved plans only)
    pub unknown: Vec<String>,
}

impl InstallPlan {
    /// Plan for an explicit list of names.
    ///
    /// With `resolve_deps` the order is the resolver's `installation_order`.
    /// Without it the request is de-duplicated in place; unknown names stay in
    /// the order (they are skipped at run time) and are listed in `unknown`.
    pub fn for_apps<S: AsRef<str>>(requested: &[S], catalog: &Catalog, resolve_deps: bool) -> Self {
        if resolve_deps {
            let resolution = resolve(requested, catalog);
            return Self {
                persona: None,
                order: resolution.installation_order.clone(),
                resolution: Some(resolution),
                unknown: Vec::new(),
            };
        }

        let mut order: Vec<String> = Vec::new();
        for name in requested {
            let name = name.as_ref();
            if !order.iter().any(|n| n == name) {
                order.push(name.to_string());
            }
        }
        let unknown = order.iter().filter(|n| !catalog.contains(n)).cloned().collect();
        Self {
            persona: None,
            order,
            resolution: None,
            unknown,
        }
    }

    /// Plan for a persona's base apps plus the chosen optional apps.
    pub fn for_persona<S: AsRef<str>>(
        persona: &Persona,
        selected_optional: &[S],
        catalog: &Catalog,
        resolve_deps: bool,
    ) -> Self {
        let requested = persona.requested_apps(selected_optional);
        Self {
            persona: Some(persona.name.clone()),
            ..Self::for_apps(&requested, catalog, resolve_deps)
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.unknown.is_empty() || self.resolution.as_ref().is_some_and(|r| r.has_issues())
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ============================================================================
// Options and cancellation
// ============================================================================

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Show commands instead of running them
    pub dry_run: bool,
    /// Query the package manager first and skip present packages
    pub skip_installed: bool,
    pub retry_delay: Duration,
    pub scope: Option<InstallScope>,
    /// Draw the progress bar (off for tests and non-interactive output)
    pub show_progress: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_installed: true,
            retry_delay: Duration::from_secs(5),
            scope: None,
            show_progress: true,
        }
    }
}

/// Shared stop request, set from the Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the next run starts fresh.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Report
// ============================================================================

/// Result of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallReport {
    pub records: Vec<InstallRecord>,
    pub cancelled: bool,
}

impl InstallReport {
    pub fn count(&self, status: InstallStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &InstallRecord> {
        self.records.iter().filter(|r| r.status == InstallStatus::Failed)
    }

    /// True when nothing failed and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.count(InstallStatus::Failed) == 0
    }
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} installed, {} already present, {} failed, {} skipped",
            self.count(InstallStatus::Installed),
            self.count(InstallStatus::AlreadyInstalled),
            self.count(InstallStatus::Failed),
            self.count(InstallStatus::Skipped),
        )?;
        let dry = self.count(InstallStatus::DryRun);
        if dry > 0 {
            write!(f, ", {} dry-run", dry)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Drives a [`PackageManager`] through an [`InstallPlan`].
pub struct InstallEngine<'a, P: PackageManager> {
    pm: &'a P,
    catalog: &'a Catalog,
    history: Option<&'a History>,
    options: InstallOptions,
    cancel: CancelFlag,
}

/// Outcome of installing one app, before it becomes a record.
struct Attempt {
    status: InstallStatus,
    attempts: u32,
    message: Option<String>,
}

impl<'a, P: PackageManager> InstallEngine<'a, P> {
    pub fn new(pm: &'a P, catalog: &'a Catalog, options: InstallOptions) -> Self {
        Self {
            pm,
            catalog,
            history: None,
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Record finished attempts to this history file.
    pub fn with_history(mut self, history: &'a History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Install every app in `plan.order`.
    pub fn run(&self, plan: &InstallPlan) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        let progress = self.progress_bar(plan.order.len() as u64);

        tracing::info!(
            persona = plan.persona.as_deref().unwrap_or("-"),
            apps = plan.order.len(),
            dry_run = self.options.dry_run,
            "Starting installation"
        );

        for app in &plan.order {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
            }

            let started = Instant::now();
            let entry = self.catalog.get(app);
            let attempt = match entry {
                _ if report.cancelled => Attempt {
                    status: InstallStatus::Skipped,
                    attempts: 0,
                    message: Some("Cancelled".into()),
                },
                None => Attempt {
                    status: InstallStatus::Skipped,
                    attempts: 0,
                    message: Some("Not in catalog".into()),
                },
                Some(entry) => {
                    progress.set_message(app.clone());
                    self.install_app(entry)?
                }
            };

            let record = InstallRecord {
                timestamp: Utc::now(),
                persona: plan.persona.clone(),
                app: app.clone(),
                package_id: entry.map(|e| e.package_id.clone()).unwrap_or_default(),
                status: attempt.status,
                attempts: attempt.attempts,
                duration_ms: started.elapsed().as_millis() as u64,
                message: attempt.message,
            };

            if let Err(e) = print_status(&progress, &status_line(&record), &mut io::stdout().lock()) {
                tracing::debug!("Failed to print status line: {}", e);
            }
            progress.inc(1);
            self.record(&record);
            report.records.push(record);
        }

        progress.finish_and_clear();
        tracing::info!(summary = %report, "Installation finished");
        Ok(report)
    }

    fn install_app(&self, entry: &CatalogEntry) -> Result<Attempt> {
        let app = entry.name.as_str();
        let package_id = entry.package_id.as_str();

        if self.options.skip_installed {
            match self.pm.is_installed(package_id) {
                Ok(true) => {
                    tracing::info!(app, package_id, "Already installed, skipping");
                    return Ok(Attempt {
                        status: InstallStatus::AlreadyInstalled,
                        attempts: 0,
                        message: None,
                    });
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(app, package_id, "Could not check install state: {}", e),
            }
        }

        if self.options.dry_run {
            let args = self.install_args(package_id, RetryStrategy::Standard);
            return Ok(Attempt {
                status: InstallStatus::DryRun,
                attempts: 0,
                message: Some(command_line(self.pm.program(), &args)),
            });
        }

        let mut attempts = 0;
        let mut last_message = None;
        for (i, strategy) in RetryStrategy::SEQUENCE.into_iter().enumerate() {
            if i > 0 {
                if self.cancel.is_cancelled() {
                    break;
                }
                tracing::info!(app, delay_secs = self.options.retry_delay.as_secs(), "Retrying");
                std::thread::sleep(self.options.retry_delay);
            }

            attempts += 1;
            let output = self.pm.install(&self.install_args(package_id, strategy))?;
            tracing::debug!(
                app,
                package_id,
                attempt = attempts,
                %strategy,
                exit_code = ?output.exit_code,
                "Install attempt finished"
            );

            match output.outcome() {
                ExitOutcome::Success => {
                    tracing::info!(app, package_id, attempt = attempts, "Installed");
                    return Ok(Attempt {
                        status: InstallStatus::Installed,
                        attempts,
                        message: None,
                    });
                }
                ExitOutcome::AlreadyInstalled => {
                    return Ok(Attempt {
                        status: InstallStatus::AlreadyInstalled,
                        attempts,
                        message: None,
                    });
                }
                ExitOutcome::NotFound => {
                    tracing::error!(app, package_id, "No package found for id");
                    return Ok(Attempt {
                        status: InstallStatus::Failed,
                        attempts,
                        message: Some(format!("No package found matching {}", package_id)),
                    });
                }
                ExitOutcome::Retryable => {
                    last_message = output
                        .summary()
                        .or_else(|| output.exit_code.map(|c| format!("exit code {}", c)));
                    tracing::warn!(
                        app,
                        package_id,
                        attempt = attempts,
                        %strategy,
                        exit_code = ?output.exit_code,
                        "Install attempt failed"
                    );
                }
            }
        }

        tracing::error!(app, package_id, attempts, "Installation failed");
        Ok(Attempt {
            status: InstallStatus::Failed,
            attempts,
            message: last_message,
        })
    }

    fn install_args(&self, package_id: &str, strategy: RetryStrategy) -> InstallArgs {
        InstallArgs {
            package_id: package_id.to_string(),
            strategy,
            scope: self.options.scope,
        }
    }

    fn record(&self, record: &InstallRecord) {
        if record.status == InstallStatus::DryRun {
            return;
        }
        if let Some(history) = self.history {
            if let Err(e) = history.append(record) {
                tracing::warn!(app = %record.app, "Failed to write history: {}", e);
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

/// Print above a visible progress bar, or straight to `out` when the bar is
/// hidden (no terminal, or progress turned off).
fn print_status(progress: &ProgressBar, line: &str, out: &mut impl Write) -> io::Result<()> {
    if progress.is_hidden() {
        writeln!(out, "{}", line)
    } else {
        progress.println(line);
        Ok(())
    }
}

/// One line per finished app.
fn status_line(record: &InstallRecord) -> String {
    let mark = match record.status {
        InstallStatus::Installed => "✓",
        InstallStatus::AlreadyInstalled => "•",
        InstallStatus::Failed => "✗",
        InstallStatus::Skipped => "-",
        InstallStatus::DryRun => "→",
    };
    match &record.message {
        Some(msg) => format!("{} {} ({}): {}", mark, record.app, record.status, msg),
        None => format!("{} {} ({})", mark, record.app, record.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_printed_without_progress_bar() {
        let mut out = Vec::new();
        print_status(&ProgressBar::hidden(), "✓ Git (Installed)", &mut out).unwrap();
        print_status(&ProgressBar::hidden(), "✗ VLC (Failed)", &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "✓ Git (Installed)\n✗ VLC (Failed)\n"
        );
    }

    #[test]
    fn test_plan_with_resolution() {
        let catalog: Catalog = [
            CatalogEntry::simple("Git", "Git.Git"),
            CatalogEntry::simple("GitHub CLI", "GitHub.cli").with_dependencies(["Git"]),
        ]
        .into_iter()
        .collect();
        let plan = InstallPlan::for_apps(&["GitHub CLI"], &catalog, true);
        assert_eq!(plan.order, vec!["Git", "GitHub CLI"]);
        assert!(!plan.has_issues());
    }

    #[test]
    fn test_plan_without_resolution_keeps_request_order() {
        let catalog: Catalog = [
            CatalogEntry::simple("Git", "Git.Git"),
            CatalogEntry::simple("GitHub CLI", "GitHub.cli").with_dependencies(["Git"]),
        ]
        .into_iter()
        .collect();
        let plan = InstallPlan::for_apps(&["GitHub CLI", "Nope", "GitHub CLI"], &catalog, false);
        assert_eq!(plan.order, vec!["GitHub CLI", "Nope"]);
        assert_eq!(plan.unknown, vec!["Nope"]);
        assert!(plan.has_issues());
    }

    #[test]
    fn test_report_display() {
        let report = InstallReport {
            records: Vec::new(),
            cancelled: true,
        };
        assert_eq!(
            report.to_string(),
            "0 installed, 0 already present, 0 failed, 0 skipped (cancelled)"
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_cancel_flag_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!other.is_cancelled());
    }
}
