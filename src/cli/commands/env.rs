use anyhow::{Context, Result};

use crate::cli::app::GlobalArgs;
use crate::ui::Ui;

use super::{load_config, open_session};

/// `environment`: probe the current environment and show its Director info.
pub async fn environment(global: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
    let session = open_session(global)?;
    let environment = session.environment()?;
    let info = session.director().await?.info().await?;

    ui.print_line(&format!("Environment '{}'", environment));
    ui.print_line(&format!("  Name    {}", info.name));
    ui.print_line(&format!("  UUID    {}", info.uuid));
    ui.print_line(&format!("  Version {}", info.version));
    match info.user {
        Some(user) => ui.print_line(&format!("  User    {}", user)),
        None => ui.print_line("  User    (not logged in)"),
    }
    Ok(())
}

/// `environments`: list every known environment with its alias.
pub fn environments(global: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
    let config = load_config(global)?;

    let environments = config.environments();
    if environments.is_empty() {
        ui.print_line("No environments");
        return Ok(());
    }

    for env in environments {
        if env.alias.is_empty() {
            ui.print_line(&env.url);
        } else {
            ui.print_line(&format!("{}\t{}", env.url, env.alias));
        }
    }
    Ok(())
}

/// `alias-env ALIAS -e URL`: remember the environment under an alias and
/// make it the current one.
pub fn alias_env(global: &GlobalArgs, alias: &str, ui: &dyn Ui) -> Result<()> {
    let url = global
        .environment
        .as_deref()
        .context("Expected an environment URL (-e) to alias")?;
    let ca_cert = global.ca_cert.as_deref().unwrap_or("");

    let config = load_config(global)?.set_environment(url, alias, ca_cert);
    config.save()?;

    ui.print_line(&format!("Environment '{}' aliased as '{}'", config.environment(), alias));
    Ok(())
}

/// `deployment [NAME]`: show or set the remembered deployment.
pub fn deployment(global: &GlobalArgs, name: Option<&str>, ui: &dyn Ui) -> Result<()> {
    let session = open_session(global)?;
    let environment = session.environment()?;

    match name {
        None => {
            let current = session.config().deployment(&environment);
            if current.is_empty() {
                ui.print_line(&format!("No deployment set for '{}'", environment));
            } else {
                ui.print_line(&current);
            }
        }
        Some(name) => {
            let updated = session.config().set_deployment(&environment, name);
            updated.save()?;
            ui.print_line(&format!("Deployment set to '{}'", name));
        }
    }
    Ok(())
}
