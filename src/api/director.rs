use reqwest::Url;

use crate::error::{Error, Result};

use super::models::Info;
use super::transport::AuthedClient;

/// Client for the Director's own HTTP API.
pub struct DirectorClient {
    url: Url,
    client: AuthedClient,
}

impl DirectorClient {
    pub fn new(url: &str, client: AuthedClient) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::InvalidArgument("Expected non-empty Director URL".into()));
        }
        let url = Url::parse(url)
            .map_err(|err| Error::InvalidArgument(format!("Parsing Director URL '{url}': {err}")))?;
        Ok(Self { url, client })
    }

    pub async fn info(&self) -> Result<Info> {
        let base = self.url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/info"))
            .map_err(|err| Error::InvalidArgument(format!("Building Director URL: {err}")))?;

        let response = self.client.get_json(url.clone()).await?;
        if !response.status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }

        serde_json::from_slice(&response.body).map_err(|_| Error::ProtocolDecode {
            what: "director info",
            body: response.body_string(),
        })
    }

    /// The `/info` endpoint reports the requesting user only when the
    /// request carried valid credentials, which makes it a cheap probe.
    pub async fn is_authenticated(&self) -> Result<bool> {
        let info = self.info().await?;
        Ok(info.user.is_some())
    }
}
