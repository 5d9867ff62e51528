use async_trait::async_trait;

use crate::api::models::{AccessToken, Prompt, PromptAnswer, PromptKind};
use crate::config::{Config, Creds};
use crate::error::Result;
use crate::ui::Ui;

use super::LoginStrategy;

/// What the OAuth login flow needs from the identity service. Implemented
/// by [`crate::api::IdentityClient`]; faked in tests.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn prompts(&self) -> Result<Vec<Prompt>>;
    async fn client_credentials_grant(&self) -> Result<AccessToken>;
    async fn owner_password_grant(&self, answers: &[PromptAnswer]) -> Result<AccessToken>;
}

/// Login against the Director's identity service.
///
/// With a configured client id/secret this is a non-interactive
/// service-account login: one client-credentials grant, nothing saved.
/// Otherwise the user is taken through the service's declared prompts
/// until a password grant succeeds, and the granted refresh token is
/// persisted as the environment's credentials.
pub struct IdentityLoginStrategy<'a> {
    identity: &'a dyn IdentityService,
    config: Config,
    environment: String,
    creds: Creds,
    skip_ssl_validation: bool,
    ui: &'a dyn Ui,
}

impl<'a> IdentityLoginStrategy<'a> {
    pub fn new(
        identity: &'a dyn IdentityService,
        config: Config,
        environment: String,
        creds: Creds,
        skip_ssl_validation: bool,
        ui: &'a dyn Ui,
    ) -> Self {
        Self {
            identity,
            config,
            environment,
            creds,
            skip_ssl_validation,
            ui,
        }
    }

    async fn try_client_login(&self) -> Result<()> {
        match self.identity.client_credentials_grant().await {
            Ok(_) => {
                // short-lived token, re-derived on every run; nothing to save
                self.ui.print_line(&format!(
                    "Successfully authenticated with '{}'",
                    self.environment
                ));
                Ok(())
            }
            Err(err) => {
                self.ui.error_line(&format!(
                    "Failed to authenticate with '{}'",
                    self.environment
                ));
                Err(err)
            }
        }
    }

    async fn try_interactive_login(&self) -> Result<()> {
        loop {
            let prompts = self.identity.prompts().await?;
            let answers = self.collect_answers(&prompts)?;

            match self.identity.owner_password_grant(&answers).await {
                Ok(token) => return self.persist(token),
                Err(_) => self.ui.error_line(&format!(
                    "Failed to authenticate with '{}'",
                    self.environment
                )),
            }
        }
    }

    fn collect_answers(&self, prompts: &[Prompt]) -> Result<Vec<PromptAnswer>> {
        let mut answers = Vec::with_capacity(prompts.len());

        for prompt in prompts {
            let value = match prompt.kind {
                PromptKind::Text => self.ui.ask_for_text(&prompt.label)?,
                PromptKind::Password => self.ui.ask_for_password(&prompt.label)?,
            };
            answers.push(PromptAnswer {
                key: prompt.key.clone(),
                value,
            });
        }

        Ok(answers)
    }

    fn persist(&self, token: AccessToken) -> Result<()> {
        let creds = Creds {
            refresh_token: token.refresh_token.unwrap_or_default(),
            ..Creds::default()
        };

        let updated = self
            .config
            .set_credentials(&self.environment, creds)
            .set_skip_ssl_validation(&self.environment, self.skip_ssl_validation);
        updated.save()?;

        self.ui.print_line(&format!(
            "Successfully authenticated with '{}'",
            self.environment
        ));
        Ok(())
    }
}

#[async_trait]
impl LoginStrategy for IdentityLoginStrategy<'_> {
    async fn try_login(&self) -> Result<()> {
        if self.creds.is_client_configured() {
            self.try_client_login().await
        } else {
            self.try_interactive_login().await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::ui::test_support::FakeUi;

    const ENV: &str = "https://director:25555";

    struct FakeIdentity {
        prompts: Result<Vec<Prompt>>,
        client_grants: Mutex<VecDeque<Result<AccessToken>>>,
        password_grants: Mutex<VecDeque<Result<AccessToken>>>,
        answers_seen: Mutex<Vec<Vec<PromptAnswer>>>,
    }

    impl FakeIdentity {
        fn new() -> Self {
            Self {
                prompts: Ok(vec![
                    Prompt {
                        key: "username".into(),
                        kind: PromptKind::Text,
                        label: "Email".into(),
                    },
                    Prompt {
                        key: "password".into(),
                        kind: PromptKind::Password,
                        label: "Password".into(),
                    },
                ]),
                client_grants: Mutex::new(VecDeque::new()),
                password_grants: Mutex::new(VecDeque::new()),
                answers_seen: Mutex::new(Vec::new()),
            }
        }

        fn token(refresh: Option<&str>) -> AccessToken {
            AccessToken {
                token_type: "bearer".into(),
                access_token: "at-1".into(),
                refresh_token: refresh.map(|s| s.to_string()),
            }
        }
    }

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn prompts(&self) -> Result<Vec<Prompt>> {
            match &self.prompts {
                Ok(prompts) => Ok(prompts.clone()),
                Err(_) => Err(Error::UnexpectedStatus {
                    url: "https://uaa/login".into(),
                    status: 500,
                }),
            }
        }

        async fn client_credentials_grant(&self) -> Result<AccessToken> {
            self.client_grants.lock().unwrap().pop_front().unwrap()
        }

        async fn owner_password_grant(&self, answers: &[PromptAnswer]) -> Result<AccessToken> {
            self.answers_seen.lock().unwrap().push(answers.to_vec());
            self.password_grants.lock().unwrap().pop_front().unwrap()
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        Config::load(dir.path().join("config.toml")).unwrap()
    }

    fn client_creds() -> Creds {
        Creds {
            client: "ops-client".into(),
            client_secret: "ops-secret".into(),
            ..Creds::default()
        }
    }

    #[tokio::test]
    async fn a_configured_client_logs_in_without_prompting_or_saving() {
        let dir = TempDir::new().unwrap();
        let identity = FakeIdentity::new();
        identity
            .client_grants
            .lock()
            .unwrap()
            .push_back(Ok(FakeIdentity::token(None)));
        let ui = FakeUi::default();

        let strategy = IdentityLoginStrategy::new(
            &identity,
            config_in(&dir),
            ENV.into(),
            client_creds(),
            false,
            &ui,
        );
        strategy.try_login().await.unwrap();

        assert!(ui.asked_text_labels.lock().unwrap().is_empty());
        assert!(ui.asked_password_labels.lock().unwrap().is_empty());
        assert_eq!(
            *ui.lines.lock().unwrap(),
            vec![format!("Successfully authenticated with '{ENV}'")]
        );
        assert!(!dir.path().join("config.toml").exists());
    }

    #[tokio::test]
    async fn a_failed_client_grant_is_fatal_without_prompting_or_saving() {
        let dir = TempDir::new().unwrap();
        let identity = FakeIdentity::new();
        identity
            .client_grants
            .lock()
            .unwrap()
            .push_back(Err(Error::AuthRejected("bad client".into())));
        let ui = FakeUi::default();

        let strategy = IdentityLoginStrategy::new(
            &identity,
            config_in(&dir),
            ENV.into(),
            client_creds(),
            false,
            &ui,
        );
        let err = strategy.try_login().await.unwrap_err();

        assert!(matches!(err, Error::AuthRejected(_)));
        assert!(ui.asked_text_labels.lock().unwrap().is_empty());
        assert_eq!(
            *ui.errors.lock().unwrap(),
            vec![format!("Failed to authenticate with '{ENV}'")]
        );
        assert!(!dir.path().join("config.toml").exists());
    }

    #[tokio::test]
    async fn interactive_login_asks_declared_prompts_in_order_and_persists_the_refresh_token() {
        let dir = TempDir::new().unwrap();
        let identity = FakeIdentity::new();
        identity
            .password_grants
            .lock()
            .unwrap()
            .push_back(Ok(FakeIdentity::token(Some("rt-1"))));
        let ui = FakeUi::with_answers(&["admin"], &["secret"]);

        let strategy = IdentityLoginStrategy::new(
            &identity,
            config_in(&dir),
            ENV.into(),
            Creds::default(),
            true,
            &ui,
        );
        strategy.try_login().await.unwrap();

        assert_eq!(*ui.asked_text_labels.lock().unwrap(), vec!["Email"]);
        assert_eq!(*ui.asked_password_labels.lock().unwrap(), vec!["Password"]);
        assert_eq!(
            identity.answers_seen.lock().unwrap()[0],
            vec![
                PromptAnswer {
                    key: "username".into(),
                    value: "admin".into(),
                },
                PromptAnswer {
                    key: "password".into(),
                    value: "secret".into(),
                },
            ]
        );

        // the refresh token, not the answers, is what persists
        let saved = Config::load(dir.path().join("config.toml")).unwrap();
        let creds = saved.credentials(ENV);
        assert_eq!(creds.refresh_token, "rt-1");
        assert_eq!(creds.username, "");
        assert_eq!(creds.password, "");
        assert!(saved.skip_ssl_validation(ENV));
    }

    #[tokio::test]
    async fn failed_grants_reprompt_until_one_succeeds_and_save_only_then() {
        let dir = TempDir::new().unwrap();
        let identity = FakeIdentity::new();
        {
            let mut grants = identity.password_grants.lock().unwrap();
            grants.push_back(Err(Error::AuthRejected("nope".into())));
            grants.push_back(Err(Error::AuthRejected("nope".into())));
            grants.push_back(Ok(FakeIdentity::token(Some("rt-1"))));
        }
        let ui = FakeUi::with_answers(&["u1", "u2", "u3"], &["p1", "p2", "p3"]);

        let strategy = IdentityLoginStrategy::new(
            &identity,
            config_in(&dir),
            ENV.into(),
            Creds::default(),
            false,
            &ui,
        );
        strategy.try_login().await.unwrap();

        assert_eq!(identity.answers_seen.lock().unwrap().len(), 3);
        assert_eq!(
            *ui.errors.lock().unwrap(),
            vec![
                format!("Failed to authenticate with '{ENV}'"),
                format!("Failed to authenticate with '{ENV}'"),
            ]
        );
        assert_eq!(
            Config::load(dir.path().join("config.toml"))
                .unwrap()
                .credentials(ENV)
                .refresh_token,
            "rt-1"
        );
    }

    #[tokio::test]
    async fn failing_to_fetch_prompts_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut identity = FakeIdentity::new();
        identity.prompts = Err(Error::UnexpectedStatus {
            url: "https://uaa/login".into(),
            status: 500,
        });
        let ui = FakeUi::default();

        let strategy = IdentityLoginStrategy::new(
            &identity,
            config_in(&dir),
            ENV.into(),
            Creds::default(),
            false,
            &ui,
        );
        let err = strategy.try_login().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { .. }));
    }
}
