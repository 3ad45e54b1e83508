//! Persona recommendations
//!
//! Ranks personas by how much of each one the machine already has. A persona
//! whose base apps are mostly installed is probably the one its user wants.

use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::persona::Persona;

/// Score for one persona.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub persona: String,
    /// Percentage of base apps already installed (0-100)
    pub score: u8,
    pub installed: Vec<String>,
    pub missing: Vec<String>,
}

/// Score every persona against the installed package ids.
///
/// Ids compare case-insensitively, as winget treats them. Base apps the
/// catalog doesn't know count as missing. Personas without base apps score 0.
pub fn recommend<S: AsRef<str>>(
    personas: &[Persona],
    installed_ids: &[S],
    catalog: &Catalog,
) -> Vec<Recommendation> {
    let installed_ids: HashSet<String> = installed_ids
        .iter()
        .map(|id| id.as_ref().to_ascii_lowercase())
        .collect();

    let mut recommendations: Vec<Recommendation> = personas
        .iter()
        .map(|persona| {
            let (installed, missing): (Vec<String>, Vec<String>) =
                persona.base_apps.iter().cloned().partition(|app| {
                    catalog
                        .get(app)
                        .is_some_and(|e| installed_ids.contains(&e.package_id.to_ascii_lowercase()))
                });
            let total = installed.len() + missing.len();
            let score = if total == 0 {
                0
            } else {
                (installed.len() * 100 / total) as u8
            };
            Recommendation {
                persona: persona.name.clone(),
                score,
                installed,
                missing,
            }
        })
        .collect();

    recommendations.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.persona.cmp(&b.persona)));
    tracing::debug!(personas = recommendations.len(), "Scored personas");
    recommendations
}
