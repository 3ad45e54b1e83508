//! Console colors and styles
//!
//! One place for the palette used by command output and the interactive menu.
//! Everything returns `crossterm` styled content, which implements `Display`
//! and degrades to plain text when styling is disabled.
//!
//! # Usage
//! ```rust
//! use winpersona::theme::Styles;
//!
//! println!("{} {}", Styles::success("✓"), "Git installed");
//! ```

use crossterm::style::{Color, StyledContent, Stylize, style};
use std::fmt::Display;

use crate::types::InstallStatus;

// =============================================================================
// COLOR PALETTE
// =============================================================================

/// Core color palette
pub struct Colors;

impl Colors {
    /// Titles and section headers
    pub const HEADER: Color = Color::Cyan;

    /// Numbers, ids, and other secondary detail
    pub const MUTED: Color = Color::DarkGrey;

    /// Persona and app names
    pub const NAME: Color = Color::White;

    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
    pub const INFO: Color = Color::Blue;
}

// =============================================================================
// STYLES
// =============================================================================

/// Pre-built styles
pub struct Styles;

impl Styles {
    pub fn header<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::HEADER).bold()
    }

    pub fn name<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::NAME).bold()
    }

    pub fn muted<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::MUTED)
    }

    pub fn success<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::SUCCESS)
    }

    pub fn warning<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::WARNING)
    }

    pub fn error<D: Display>(content: D) -> StyledContent<D> {
        style(content).with(Colors::ERROR).bold()
    }
}

// =============================================================================
// SEMANTIC HELPERS
// =============================================================================

pub struct Theme;

impl Theme {
    /// Color for an install outcome.
    pub fn status_color(status: InstallStatus) -> Color {
        match status {
            InstallStatus::Installed => Colors::SUCCESS,
            InstallStatus::AlreadyInstalled => Colors::INFO,
            InstallStatus::Failed => Colors::ERROR,
            InstallStatus::Skipped => Colors::WARNING,
            InstallStatus::DryRun => Colors::MUTED,
        }
    }

    /// Status rendered in its color.
    pub fn status(status: InstallStatus) -> StyledContent<String> {
        style(status.to_string()).with(Self::status_color(status))
    }
}
