use serde::{Deserialize, Serialize};

/// `GET /info` payload. `user` is only present on an authenticated
/// request, which is what makes it usable as a credential probe.
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub auth: AuthInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthInfo {
    #[serde(rename = "type", default)]
    pub scheme: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl AuthInfo {
    pub fn url(&self) -> Option<String> {
        self.options
            .get("url")
            .and_then(|value| value.as_str())
            .map(|url| url.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Text,
    Password,
}

/// One field the identity service wants answered before it will issue a
/// password grant.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub key: String,
    pub kind: PromptKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptAnswer {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Bearer token held in memory for the duration of a login attempt; only
/// its refresh token ever reaches the config store.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl AccessToken {
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Serialize)]
pub struct CmdInput<'a> {
    pub method: &'a str,
    pub arguments: &'a [serde_json::Value],
    pub context: CmdContext<'a>,
}

#[derive(Debug, Serialize)]
pub struct CmdContext<'a> {
    pub director_uuid: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TaskCreatedResponse {
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub result: String,
}

/// Decoded output of a finished remote command. A populated `error`
/// means the command ran but failed at the application level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmdOutput {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<CmdError>,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmdError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl CmdError {
    pub fn describe(&self) -> &str {
        if self.message.is_empty() { &self.kind } else { &self.message }
    }
}
