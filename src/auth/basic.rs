use async_trait::async_trait;

use crate::config::{Config, Creds};
use crate::error::{Error, Result};
use crate::ui::Ui;

use super::{CredentialVerifier, LoginStrategy};

/// Username/password login.
///
/// Credentials that were already complete before the attempt fail fast:
/// re-prompting cannot improve them. Incomplete credentials are prompted
/// for and retried until the Director accepts a pair.
pub struct BasicLoginStrategy<'a> {
    verifier: &'a dyn CredentialVerifier,
    config: Config,
    environment: String,
    skip_ssl_validation: bool,
    ui: &'a dyn Ui,
}

impl<'a> BasicLoginStrategy<'a> {
    pub fn new(
        verifier: &'a dyn CredentialVerifier,
        config: Config,
        environment: String,
        skip_ssl_validation: bool,
        ui: &'a dyn Ui,
    ) -> Self {
        Self {
            verifier,
            config,
            environment,
            skip_ssl_validation,
            ui,
        }
    }

    async fn try_once(&self, creds: &Creds) -> Result<bool> {
        if !self.verifier.verify(creds).await? {
            self.ui
                .error_line(&format!("Failed to log in to '{}'", self.environment));
            return Ok(false);
        }

        let updated = self
            .config
            .set_credentials(&self.environment, creds.clone())
            .set_skip_ssl_validation(&self.environment, self.skip_ssl_validation);
        updated.save()?;

        self.ui.print_line(&format!("Logged in to '{}'", self.environment));
        Ok(true)
    }

    fn ask_for_creds(&self, initial: &Creds) -> Result<Creds> {
        let mut creds = initial.clone();

        if creds.username.is_empty() {
            creds.username = self.ui.ask_for_text("Username")?;
        }
        if creds.password.is_empty() {
            creds.password = self.ui.ask_for_password("Password")?;
        }

        Ok(creds)
    }
}

#[async_trait]
impl LoginStrategy for BasicLoginStrategy<'_> {
    async fn try_login(&self) -> Result<()> {
        let initial = self.config.credentials(&self.environment);

        loop {
            let creds = self.ask_for_creds(&initial)?;

            if self.try_once(&creds).await? {
                return Ok(());
            }

            // Complete credentials that were rejected stay rejected;
            // anything prompted for gets asked again.
            if initial.is_basic_complete() {
                return Err(Error::AuthRejected("Invalid credentials".into()));
            }
        }
    }
}
