use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use serde::Deserialize;

use crate::auth::identity::IdentityService;
use crate::error::{Error, Result};

use super::models::{AccessToken, Prompt, PromptAnswer, PromptKind, TokenResponse};
use super::transport::{AuthMode, AuthedClient, HttpExecutor, TokenSource};

/// OAuth client id used for interactive password grants when the caller
/// did not configure a service-account client of their own.
const DEFAULT_CLIENT: &str = "director_cli";

/// Client for the token-issuing identity service advertised by the
/// Director. Grant requests authenticate with the configured client id
/// and secret as HTTP basic auth.
pub struct IdentityClient {
    url: Url,
    client: AuthedClient,
}

impl IdentityClient {
    pub fn new(url: &str, client: &str, client_secret: &str, executor: Arc<dyn HttpExecutor>) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::InvalidArgument(
                "Expected non-empty identity service URL".into(),
            ));
        }
        let url = Url::parse(url)
            .map_err(|err| Error::InvalidArgument(format!("Parsing identity service URL '{url}': {err}")))?;

        let client_id = if client.is_empty() { DEFAULT_CLIENT } else { client };
        let client = AuthedClient::new(
            executor,
            AuthMode::Basic {
                username: client_id.to_string(),
                password: client_secret.to_string(),
            },
        );

        Ok(Self { url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| Error::InvalidArgument(format!("Building identity service URL: {err}")))
    }

    async fn token_grant(&self, params: &[(&str, &str)]) -> Result<AccessToken> {
        let url = self.endpoint("oauth/token")?;
        let response = self.client.post_form(url.clone(), form_encode(params)).await?;

        if !response.status.is_success() {
            return Err(Error::AuthRejected(format!(
                "Token grant against '{}' was rejected: {}",
                url,
                response.status
            )));
        }

        let token: TokenResponse =
            serde_json::from_slice(&response.body).map_err(|_| Error::ProtocolDecode {
                what: "token grant response",
                body: response.body_string(),
            })?;

        Ok(AccessToken {
            token_type: token.token_type,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })
    }
}

#[derive(Deserialize)]
struct PromptsResponse {
    // declaration order is preserved (serde_json with preserve_order)
    prompts: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl IdentityService for IdentityClient {
    /// Fetches the login prompt list: a map of field key to
    /// `[type, label]`, in the order the service declares them.
    async fn prompts(&self) -> Result<Vec<Prompt>> {
        let url = self.endpoint("login")?;
        let response = self.client.get_json(url.clone()).await?;

        if !response.status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }

        let parsed: PromptsResponse =
            serde_json::from_slice(&response.body).map_err(|_| Error::ProtocolDecode {
                what: "login prompts",
                body: response.body_string(),
            })?;

        let mut prompts = Vec::with_capacity(parsed.prompts.len());
        for (key, field) in parsed.prompts {
            let parts: Vec<&str> = field
                .as_array()
                .map(|values| values.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            if parts.len() != 2 {
                return Err(Error::ProtocolDecode {
                    what: "login prompts",
                    body: field.to_string(),
                });
            }
            let kind = if parts[0] == "password" {
                PromptKind::Password
            } else {
                PromptKind::Text
            };
            prompts.push(Prompt {
                key,
                kind,
                label: parts[1].to_string(),
            });
        }

        Ok(prompts)
    }

    async fn client_credentials_grant(&self) -> Result<AccessToken> {
        debug!("Requesting client credentials grant");
        self.token_grant(&[("grant_type", "client_credentials")]).await
    }

    async fn owner_password_grant(&self, answers: &[PromptAnswer]) -> Result<AccessToken> {
        debug!("Requesting owner password grant");
        let mut params = vec![("grant_type".to_string(), "password".to_string())];
        for answer in answers {
            params.push((answer.key.clone(), answer.value.clone()));
        }
        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.token_grant(&borrowed).await
    }
}

impl IdentityClient {
    pub async fn refresh_token_grant(&self, refresh_token: &str) -> Result<AccessToken> {
        debug!("Requesting refresh token grant");
        self.token_grant(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await
    }
}

fn form_encode(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Token source backed by a persisted refresh token. The access token is
/// cached per invocation; a retry (first 401) forces a fresh refresh
/// grant, and a rotated refresh token is kept in memory only.
pub struct RefreshTokenSource {
    identity: IdentityClient,
    state: Mutex<RefreshState>,
}

struct RefreshState {
    refresh_token: String,
    access: Option<AccessToken>,
}

impl RefreshTokenSource {
    pub fn new(identity: IdentityClient, refresh_token: String) -> Self {
        Self {
            identity,
            state: Mutex::new(RefreshState {
                refresh_token,
                access: None,
            }),
        }
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn token(&self, retried: bool) -> Result<String> {
        let refresh_token = {
            let state = self.state.lock().expect("token source state lock");
            if !retried {
                if let Some(access) = &state.access {
                    return Ok(access.header_value());
                }
            }
            state.refresh_token.clone()
        };

        let token = self.identity.refresh_token_grant(&refresh_token).await?;

        let mut state = self.state.lock().expect("token source state lock");
        if let Some(rotated) = &token.refresh_token {
            state.refresh_token = rotated.clone();
        }
        let header = token.header_value();
        state.access = Some(token);
        Ok(header)
    }
}

/// Token source for service-account (client credentials) sessions.
/// Tokens are short-lived and re-derived each run; nothing persists.
pub struct ClientTokenSource {
    identity: IdentityClient,
    access: Mutex<Option<AccessToken>>,
}

impl ClientTokenSource {
    pub fn new(identity: IdentityClient) -> Self {
        Self {
            identity,
            access: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenSource for ClientTokenSource {
    async fn token(&self, retried: bool) -> Result<String> {
        if !retried {
            let access = self.access.lock().expect("token source state lock");
            if let Some(access) = access.as_ref() {
                return Ok(access.header_value());
            }
        }

        let token = self.identity.client_credentials_grant().await?;
        let header = token.header_value();
        *self.access.lock().expect("token source state lock") = Some(token);
        Ok(header)
    }
}
