//! Dependency Resolver
//!
//! Expands a requested list of application names into an ordered installation
//! sequence in which every dependency precedes its dependents.
//!
//! # Design
//!
//! - **Pure logic**: No I/O, no side effects beyond tracing events
//! - **Report, don't fail**: Missing entries, cycles, and conflicts are
//!   collected into [`ResolutionResult`]; the caller decides whether to proceed
//! - **Depth-first, pre-order**: Dependencies are visited in declaration order
//!   before the app that declares them. A shared dependency is placed once, at
//!   its first encounter, and never moved afterwards
//!
//! # Cycle Detection
//!
//! Names on the active DFS path are tracked explicitly. Re-entering one of
//! them is a cycle and is reported as the path that closed it
//! (`A -> B -> A`). There is no depth limit, so long acyclic chains resolve
//! normally. The walk keeps its own frame stack instead of recursing, so a
//! chain of thousands of links does not touch the thread stack.
//!
//! # Conflicts
//!
//! A conflict is reported when an app declares a conflict with a name that has
//! already been resolved. The check only looks backwards: if the earlier app
//! declares the conflict and the later one does not, the pair goes unreported.

use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::{Catalog, CatalogEntry};

// ============================================================================
// Resolution Result
// ============================================================================

/// Output of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Names in install order, dependencies first, each exactly once.
    pub installation_order: Vec<String>,
    /// `"<name> conflicts with <other>"` messages.
    pub conflicts: Vec<String>,
    /// Referenced names absent from the catalog.
    pub missing_dependencies: Vec<String>,
    /// Cycles as readable paths, e.g. `"A -> B -> A"`.
    pub circular_dependencies: Vec<String>,
}

impl ResolutionResult {
    /// True iff any conflict, missing dependency, or cycle was found.
    pub fn has_issues(&self) -> bool {
        !self.conflicts.is_empty()
            || !self.missing_dependencies.is_empty()
            || !self.circular_dependencies.is_empty()
    }

    /// Total number of reported issues.
    pub fn issue_count(&self) -> usize {
        self.conflicts.len() + self.missing_dependencies.len() + self.circular_dependencies.len()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve `requested` against `catalog`.
///
/// Duplicates in `requested` are skipped. Unknown names, dangling dependency
/// references, cycles, and conflicts never abort the walk.
pub fn resolve<S: AsRef<str>>(requested: &[S], catalog: &Catalog) -> ResolutionResult {
    let mut walk = Walk::new(catalog);
    for name in requested {
        walk.visit(name.as_ref());
    }

    let result = walk.result;
    tracing::debug!(
        requested = requested.len(),
        resolved = result.installation_order.len(),
        issues = result.issue_count(),
        "Dependency resolution finished"
    );
    for msg in &result.conflicts {
        tracing::warn!(conflict = %msg, "Conflicting applications");
    }
    for name in &result.missing_dependencies {
        tracing::warn!(app = %name, "Missing from catalog");
    }
    for path in &result.circular_dependencies {
        tracing::warn!(cycle = %path, "Circular dependency");
    }
    result
}

/// Accumulators for one resolution run.
struct Walk<'c> {
    catalog: &'c Catalog,
    /// Fully processed names (black).
    visited: HashSet<String>,
    /// Active DFS path, in visit order (gray).
    current_path: Vec<String>,
    /// Same names as `current_path`, for constant-time membership.
    on_path: HashSet<String>,
    result: ResolutionResult,
}

/// An entered app and the index of its next dependency to visit.
struct Frame<'c> {
    entry: &'c CatalogEntry,
    next_dep: usize,
}

impl<'c> Walk<'c> {
    fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            visited: HashSet::new(),
            current_path: Vec::new(),
            on_path: HashSet::new(),
            result: ResolutionResult::default(),
        }
    }

    /// Depth-first walk from `root` on an explicit stack, so chain length is
    /// bounded by memory rather than by the thread's stack size.
    fn visit(&mut self, root: &str) {
        let mut stack: Vec<Frame<'c>> = Vec::new();
        if let Some(frame) = self.enter(root) {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let entry = frame.entry;
            match entry.dependencies.get(frame.next_dep) {
                Some(dep) => {
                    frame.next_dep += 1;
                    if let Some(child) = self.enter(dep) {
                        stack.push(child);
                    }
                }
                None => {
                    stack.pop();
                    self.leave(entry.name.clone());
                }
            }
        }
    }

    /// Start visiting `name`. Returns a frame when its dependencies still need
    /// walking; visited, gray, and missing names are handled here.
    fn enter(&mut self, name: &str) -> Option<Frame<'c>> {
        if self.visited.contains(name) {
            return None;
        }

        if self.on_path.contains(name) {
            let start = self.current_path.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle: Vec<&str> = self.current_path[start..].iter().map(String::as_str).collect();
            cycle.push(name);
            let cycle = cycle.join(" -> ");
            if !self.result.circular_dependencies.contains(&cycle) {
                self.result.circular_dependencies.push(cycle);
            }
            return None;
        }

        let Some(entry) = self.catalog.get(name) else {
            if !self.result.missing_dependencies.iter().any(|m| m == name) {
                self.result.missing_dependencies.push(name.to_string());
            }
            return None;
        };

        for conflict in &entry.conflicts {
            if self.visited.contains(conflict.as_str()) {
                self.result
                    .conflicts
                    .push(format!("{} conflicts with {}", name, conflict));
            }
        }

        self.current_path.push(name.to_string());
        self.on_path.insert(name.to_string());
        Some(Frame { entry, next_dep: 0 })
    }

    /// All dependencies done: take `name` off the path and place it.
    fn leave(&mut self, name: String) {
        self.current_path.pop();
        self.on_path.remove(&name);
        if self.visited.insert(name.clone()) {
            self.result.installation_order.push(name);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
