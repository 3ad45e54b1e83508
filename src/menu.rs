//! Interactive menu, shown when no command is given.
//!
//! A `dialoguer` loop over the same handlers the CLI uses. Escape on any
//! prompt returns to the main menu.

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

use crate::commands::{self, Context, InstallRequest};
use crate::error::WinPersonaError;
use crate::theme::Styles;

const ITEMS: &[&str] = &[
    "Install a persona",
    "Show a persona",
    "Resolve applications",
    "Browse the catalog",
    "Installation history",
    "Check for updates",
    "Recommend a persona",
    "Back up personas",
    "Exit",
];

/// Run the menu until the user exits.
pub fn run(ctx: &Context) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("{}", Styles::header("winpersona"));

    loop {
        let Some(choice) = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(ITEMS)
            .default(0)
            .interact_opt()
            .map_err(WinPersonaError::from)?
        else {
            break;
        };

        ctx.begin_action();
        let result = match choice {
            0 => install(ctx, &theme),
            1 => pick_persona(ctx, &theme)
                .and_then(|name| name.map_or(Ok(()), |n| commands::persona_show(ctx, &n))),
            2 => resolve(ctx, &theme),
            3 => commands::catalog_list(ctx),
            4 => commands::history(ctx, 20, None, false, false),
            5 => commands::updates(ctx, &ctx.winget(), false, None).map(|_| ()),
            6 => commands::recommendations(ctx, &ctx.winget()).map(|_| ()),
            7 => commands::backup_create(ctx),
            _ => break,
        };

        // Errors end the action, not the menu
        if let Err(e) = result {
            tracing::debug!("Menu action failed: {:#}", e);
            eprintln!("{} {:#}", Styles::error("✗"), e);
        }
        println!();
    }
    Ok(())
}

fn pick_persona(ctx: &Context, theme: &ColorfulTheme) -> Result<Option<String>> {
    let personas = ctx.personas().list()?;
    if personas.is_empty() {
        anyhow::bail!("No personas found. Run `winpersona init` first.");
    }
    let labels: Vec<String> = personas
        .iter()
        .map(|p| {
            if p.description.is_empty() {
                p.name.clone()
            } else {
                format!("{} - {}", p.name, p.description)
            }
        })
        .collect();

    let choice = Select::with_theme(theme)
        .with_prompt("Persona")
        .items(&labels)
        .default(0)
        .interact_opt()
        .map_err(WinPersonaError::from)?;
    Ok(choice.map(|i| personas[i].name.clone()))
}

fn install(ctx: &Context, theme: &ColorfulTheme) -> Result<()> {
    let Some(name) = pick_persona(ctx, theme)? else {
        return Ok(());
    };
    let persona = ctx.personas().load(&name)?;

    let optional = if persona.optional_apps.is_empty() {
        Vec::new()
    } else {
        let Some(picked) = MultiSelect::with_theme(theme)
            .with_prompt("Optional apps (space to toggle)")
            .items(&persona.optional_apps)
            .interact_opt()
            .map_err(WinPersonaError::from)?
        else {
            return Ok(());
        };
        picked.into_iter().map(|i| persona.optional_apps[i].clone()).collect()
    };

    let request = InstallRequest {
        persona: persona.name.clone(),
        optional,
        ..Default::default()
    };

    let winget = ctx.winget();
    let host = crate::host::HostInfo::detect();
    let mut confirm = |prompt: &str| -> Result<bool> {
        Ok(Confirm::with_theme(theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(WinPersonaError::from)?)
    };
    commands::install_with(ctx, &winget, &request, &host, &mut confirm)?;
    Ok(())
}

fn resolve(ctx: &Context, theme: &ColorfulTheme) -> Result<()> {
    let input: String = Input::with_theme(theme)
        .with_prompt("Applications (comma separated)")
        .interact_text()
        .map_err(WinPersonaError::from)?;
    let apps: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if apps.is_empty() {
        return Ok(());
    }
    commands::resolve_apps(ctx, &apps, false)
}
