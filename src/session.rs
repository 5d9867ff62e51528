use std::sync::Arc;

use async_trait::async_trait;

use crate::api::auth::{ClientTokenSource, IdentityClient, RefreshTokenSource};
use crate::api::director::DirectorClient;
use crate::api::transport::{AuthMode, AuthedClient, HttpExecutor, ReqwestExecutor, TokenSource};
use crate::auth::CredentialVerifier;
use crate::config::{self, Config, Creds};
use crate::error::{Error, Result};

/// Per-invocation overrides, straight from the global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct SessionOpts {
    pub environment: Option<String>,
    pub ca_cert: Option<String>,
    pub client: Option<String>,
    pub client_secret: Option<String>,
    pub skip_ssl_validation: bool,
}

/// Transient binding of a resolved environment, its credentials and an
/// authenticated transport. Built from a config snapshot at the start of
/// a command and thrown away when the process exits.
pub struct Session {
    opts: SessionOpts,
    config: Config,
}

impl Session {
    pub fn new(config: Config, opts: SessionOpts) -> Self {
        Self { opts, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The target environment URL: the `-e` flag (URL or alias) when
    /// given, otherwise the config's current environment.
    pub fn environment(&self) -> Result<String> {
        if let Some(flag) = &self.opts.environment {
            return Ok(self.config.resolve_environment(flag));
        }

        let current = self.config.environment();
        if current.is_empty() {
            return Err(Error::InvalidArgument(
                "Expected non-empty Director environment".into(),
            ));
        }
        Ok(current.to_string())
    }

    /// Stored credentials overlaid with any client id/secret flags.
    pub fn credentials(&self) -> Result<Creds> {
        let environment = self.environment()?;
        let mut creds = self.config.credentials(&environment);

        if let Some(client) = &self.opts.client {
            creds.client = client.clone();
            creds.client_secret = self.opts.client_secret.clone().unwrap_or_default();
        }

        Ok(creds)
    }

    pub fn ca_cert(&self) -> Result<String> {
        if let Some(flag) = &self.opts.ca_cert {
            return Ok(config::read_ca_cert(flag));
        }
        Ok(self.config.ca_cert(&self.environment()?))
    }

    pub fn skip_ssl_validation(&self) -> Result<bool> {
        Ok(self.opts.skip_ssl_validation || self.config.skip_ssl_validation(&self.environment()?))
    }

    pub fn executor(&self) -> Result<Arc<dyn HttpExecutor>> {
        let executor = ReqwestExecutor::new(&self.ca_cert()?, self.skip_ssl_validation()?)?;
        Ok(Arc::new(executor))
    }

    /// Director client without credentials; enough for `/info`.
    pub fn anonymous_director(&self) -> Result<DirectorClient> {
        DirectorClient::new(
            &self.environment()?,
            AuthedClient::new(self.executor()?, AuthMode::None),
        )
    }

    /// Director client using whatever auth the session's credentials
    /// support: basic for a complete username/password pair, otherwise a
    /// token source against the identity service the Director advertises.
    pub async fn director(&self) -> Result<DirectorClient> {
        let environment = self.environment()?;
        let executor = self.executor()?;
        let creds = self.credentials()?;

        let auth = if creds.is_basic_complete() {
            AuthMode::Basic {
                username: creds.username.clone(),
                password: creds.password.clone(),
            }
        } else if creds.is_client_configured() || creds.is_refresh_configured() {
            let info = self.anonymous_director()?.info().await?;
            let identity_url = info.auth.url().ok_or_else(|| {
                Error::InvalidArgument("Director did not advertise an identity service URL".into())
            })?;
            let identity =
                IdentityClient::new(&identity_url, &creds.client, &creds.client_secret, executor.clone())?;

            let source: Arc<dyn TokenSource> = if creds.is_client_configured() {
                Arc::new(ClientTokenSource::new(identity))
            } else {
                Arc::new(RefreshTokenSource::new(identity, creds.refresh_token.clone()))
            };
            AuthMode::Token(source)
        } else {
            AuthMode::None
        };

        DirectorClient::new(&environment, AuthedClient::new(executor, auth))
    }

    pub fn identity_client(&self, url: &str) -> Result<IdentityClient> {
        let creds = self.credentials()?;
        IdentityClient::new(url, &creds.client, &creds.client_secret, self.executor()?)
    }

    pub fn verifier(&self) -> Result<DirectorCredentialVerifier> {
        Ok(DirectorCredentialVerifier {
            environment: self.environment()?,
            ca_cert: self.ca_cert()?,
            skip_ssl_validation: self.skip_ssl_validation()?,
        })
    }
}

/// Production credential probe: builds a basic-authed Director client
/// with the session's TLS settings and asks `/info` who it is.
pub struct DirectorCredentialVerifier {
    environment: String,
    ca_cert: String,
    skip_ssl_validation: bool,
}

#[async_trait]
impl CredentialVerifier for DirectorCredentialVerifier {
    async fn verify(&self, creds: &Creds) -> Result<bool> {
        let executor = ReqwestExecutor::new(&self.ca_cert, self.skip_ssl_validation)?;
        let client = AuthedClient::new(
            Arc::new(executor),
            AuthMode::Basic {
                username: creds.username.clone(),
                password: creds.password.clone(),
            },
        );
        DirectorClient::new(&self.environment, client)?.is_authenticated().await
    }
}
