//! Console rendering for command output.
//!
//! Every function returns a `String` so the CLI and the interactive menu print
//! the same text.

use std::fmt::Write;

use crate::backup::BackupInfo;
use crate::catalog::{Catalog, CatalogEntry};
use crate::history::{HistorySummary, InstallRecord};
use crate::install_engine::{InstallPlan, InstallReport};
use crate::logic::recommend::Recommendation;
use crate::logic::requirements::RequirementIssue;
use crate::logic::resolver::ResolutionResult;
use crate::persona::Persona;
use crate::theme::{Styles, Theme};
use crate::types::InstallStatus;
use crate::winget::PackageRow;

/// Numbered install order followed by one section per issue kind.
pub fn resolution(result: &ResolutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", Styles::header("Installation order"));
    if result.installation_order.is_empty() {
        let _ = writeln!(out, "  {}", Styles::muted("(nothing to install)"));
    }
    for (i, app) in result.installation_order.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {}", i + 1, app);
    }

    issue_section(&mut out, "Conflicts", &result.conflicts);
    issue_section(&mut out, "Missing dependencies", &result.missing_dependencies);
    issue_section(&mut out, "Circular dependencies", &result.circular_dependencies);
    out
}

fn issue_section<D: std::fmt::Display>(out: &mut String, title: &str, items: &[D]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", Styles::warning(format!("{} ({})", title, items.len())));
    for item in items {
        let _ = writeln!(out, "  {} {}", Styles::warning("!"), item);
    }
}

pub fn requirement_issues(issues: &[RequirementIssue]) -> String {
    let mut out = String::new();
    issue_section(&mut out, "System requirements", issues);
    out
}

/// Plan preview: the resolution when there is one, else the literal order.
pub fn plan(plan: &InstallPlan) -> String {
    if let Some(result) = &plan.resolution {
        return resolution(result);
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}", Styles::header("Installation order (no dependency resolution)"));
    for (i, app) in plan.order.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {}", i + 1, app);
    }
    issue_section(&mut out, "Not in catalog", &plan.unknown);
    out
}

pub fn persona(persona: &Persona, catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", Styles::name(&persona.name));
    if !persona.description.is_empty() {
        let _ = writeln!(out, "  {}", persona.description);
    }
    for (title, apps) in [("Base apps", &persona.base_apps), ("Optional apps", &persona.optional_apps)] {
        let _ = writeln!(out, "{}", Styles::header(title));
        if apps.is_empty() {
            let _ = writeln!(out, "  {}", Styles::muted("(none)"));
        }
        for app in apps {
            match catalog.get(app) {
                Some(entry) => {
                    let _ = writeln!(out, "  - {} {}", app, Styles::muted(&entry.package_id));
                }
                None => {
                    let _ = writeln!(out, "  - {} {}", app, Styles::error("(not in catalog)"));
                }
            }
        }
    }
    out
}

/// One line per persona: name, app counts, description.
pub fn persona_list(personas: &[Persona]) -> String {
    let mut out = String::new();
    if personas.is_empty() {
        let _ = writeln!(out, "{}", Styles::muted("No personas. Run `winpersona init` to create the defaults."));
    }
    for p in personas {
        let _ = writeln!(
            out,
            "{:<20} {} {}",
            p.name,
            Styles::muted(format!("{} base, {} optional", p.base_apps.len(), p.optional_apps.len())),
            p.description
        );
    }
    out
}

pub fn catalog_entry(entry: &CatalogEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", Styles::name(&entry.name), Styles::muted(&entry.package_id));
    if let Some(description) = &entry.description {
        let _ = writeln!(out, "  {}", description);
    }
    if let Some(category) = &entry.category {
        let _ = writeln!(out, "  category:     {}", category);
    }
    if !entry.dependencies.is_empty() {
        let _ = writeln!(out, "  depends on:   {}", entry.dependencies.join(", "));
    }
    if !entry.conflicts.is_empty() {
        let _ = writeln!(out, "  conflicts:    {}", entry.conflicts.join(", "));
    }
    let req = &entry.system_requirements;
    if let Some(gb) = req.min_memory_gb {
        let _ = writeln!(out, "  min memory:   {} GB", gb);
    }
    if let Some(build) = req.min_os_build {
        let _ = writeln!(out, "  min build:    {}", build);
    }
    if req.requires_admin {
        let _ = writeln!(out, "  requires administrator");
    }
    out
}

/// Catalog grouped by category, uncategorized entries last.
pub fn catalog(catalog: &Catalog) -> String {
    let mut groups: std::collections::BTreeMap<&str, Vec<&CatalogEntry>> = Default::default();
    let mut other = Vec::new();
    for entry in catalog.iter() {
        match entry.category.as_deref() {
            Some(category) => groups.entry(category).or_default().push(entry),
            None => other.push(entry),
        }
    }

    let mut out = String::new();
    let sections = groups.into_iter().chain((!other.is_empty()).then_some(("Other", other)));
    for (category, entries) in sections {
        let _ = writeln!(out, "{}", Styles::header(category));
        for entry in entries {
            let deps = if entry.dependencies.is_empty() {
                String::new()
            } else {
                format!(" (needs {})", entry.dependencies.join(", "))
            };
            let _ = writeln!(out, "  {:<24} {}{}", entry.name, Styles::muted(&entry.package_id), deps);
        }
    }
    out
}

pub fn record(record: &InstallRecord) -> String {
    let mut line = format!(
        "{} {:<24} {}",
        Styles::muted(record.timestamp.format("%Y-%m-%d %H:%M")),
        record.app,
        Theme::status(record.status)
    );
    if let Some(persona) = &record.persona {
        let _ = write!(line, " {}", Styles::muted(format!("[{}]", persona)));
    }
    if let Some(message) = &record.message {
        let _ = write!(line, " {}", message);
    }
    line
}

pub fn history_summary(summary: &HistorySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", Styles::header("Records:"), summary.total);
    for (status, count) in &summary.by_status {
        let _ = writeln!(out, "  {:<18} {}", status, count);
    }
    if let Some(last) = summary.last_run {
        let _ = writeln!(out, "{} {}", Styles::header("Last run:"), last.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

pub fn report(report: &InstallReport) -> String {
    let mut out = String::new();
    let mark = if report.is_success() {
        Styles::success("✓")
    } else {
        Styles::error("✗")
    };
    let _ = writeln!(out, "{} {}", mark, report);
    for failed in report.failed() {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            Theme::status(InstallStatus::Failed),
            failed.app,
            failed.message.as_deref().unwrap_or("unknown error")
        );
    }
    out
}

pub fn recommendations(recs: &[Recommendation]) -> String {
    let mut out = String::new();
    for rec in recs {
        let _ = writeln!(
            out,
            "{:>3}%  {:<20} {}",
            rec.score,
            rec.persona,
            Styles::muted(format!("{} missing", rec.missing.len()))
        );
    }
    out
}

pub fn package_rows(rows: &[PackageRow]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        let _ = writeln!(out, "{}", Styles::success("Everything is up to date."));
    }
    for row in rows {
        let _ = writeln!(
            out,
            "{:<32} {:<36} {} -> {}",
            row.name,
            Styles::muted(&row.id),
            row.version,
            row.available.as_deref().unwrap_or("?")
        );
    }
    out
}

pub fn backups(backups: &[BackupInfo]) -> String {
    let mut out = String::new();
    if backups.is_empty() {
        let _ = writeln!(out, "{}", Styles::muted("No backups."));
    }
    for b in backups {
        let _ = writeln!(
            out,
            "{:<28} {} {}",
            b.name,
            Styles::muted(b.manifest.created_at.format("%Y-%m-%d %H:%M UTC")),
            b.manifest.personas.join(", ")
        );
    }
    out
}
