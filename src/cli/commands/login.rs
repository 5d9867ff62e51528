use anyhow::{Context, Result};

use crate::auth::{BasicLoginStrategy, IdentityLoginStrategy, LoginStrategy};
use crate::cli::app::GlobalArgs;
use crate::ui::Ui;

use super::open_session;

/// `log-in`: pick a login strategy from the Director's advertised auth
/// scheme and run it to completion.
pub async fn log_in(global: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
    let session = open_session(global)?;
    let environment = session.environment()?;
    let skip_ssl_validation = session.skip_ssl_validation()?;

    let info = session.anonymous_director()?.info().await?;

    if info.auth.scheme == "uaa" {
        let identity_url = info
            .auth
            .url()
            .context("Director advertised a token-based auth scheme without an identity service URL")?;
        let identity = session.identity_client(&identity_url)?;
        let creds = session.credentials()?;

        let strategy = IdentityLoginStrategy::new(
            &identity,
            session.config().clone(),
            environment,
            creds,
            skip_ssl_validation,
            ui,
        );
        strategy.try_login().await?;
    } else {
        let verifier = session.verifier()?;
        let strategy = BasicLoginStrategy::new(
            &verifier,
            session.config().clone(),
            environment,
            skip_ssl_validation,
            ui,
        );
        strategy.try_login().await?;
    }

    Ok(())
}

/// `log-out`: clear the saved credentials for the current environment.
pub fn log_out(global: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
    let session = open_session(global)?;
    let environment = session.environment()?;

    let updated = session.config().unset_credentials(&environment);
    updated.save()?;

    ui.print_line(&format!("Logged out of '{}'", environment));
    Ok(())
}
