use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, REFERER};
use reqwest::{Method, StatusCode, Url};

use crate::error::{Error, Result};

const MAX_REDIRECTS: usize = 10;

/// One HTTP request as the transport sees it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes a single request without following redirects. The production
/// implementation wraps `reqwest`; tests script responses.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// Produces an Authorization header value. Invoked lazily per logical
/// call, and once more with `retried = true` after the first 401 of the
/// top-level request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self, retried: bool) -> Result<String>;
}

#[derive(Clone)]
pub enum AuthMode {
    None,
    Basic { username: String, password: String },
    Token(Arc<dyn TokenSource>),
}

/// `reqwest`-backed executor. Redirects stay disabled here: the
/// [`AuthedClient`] follows them itself so it controls which headers
/// travel to the redirect target.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(ca_cert: &str, skip_ssl_validation: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("director-cli/", env!("CARGO_PKG_VERSION")));

        if skip_ssl_validation {
            builder = builder.danger_accept_invalid_certs(true);
        } else if !ca_cert.is_empty() {
            let cert = reqwest::Certificate::from_pem(ca_cert.as_bytes()).map_err(Error::InvalidCaCert)?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(Error::HttpClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: Request) -> Result<Response> {
        let url = request.url.clone();
        debug!("{} {}", request.method, url);

        let mut req = reqwest::Request::new(request.method, request.url);
        *req.headers_mut() = request.headers;
        if let Some(body) = request.body {
            *req.body_mut() = Some(body.into());
        }

        let response = self
            .client
            .execute(req)
            .await
            .map_err(|err| classify_send_error(url.as_str(), err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        Ok(Response { status, headers, body })
    }
}

/// An untrusted server certificate comes back from `reqwest` as a connect
/// error; tell it apart from ordinary connectivity failures by the error
/// chain so callers can report a trust problem instead of a generic one.
fn classify_send_error(url: &str, err: reqwest::Error) -> Error {
    let mut reason = err.to_string();
    {
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }
    }

    if reason.to_lowercase().contains("certificate") {
        return Error::TlsTrust {
            url: url.to_string(),
            reason,
        };
    }

    Error::Http {
        url: url.to_string(),
        source: err,
    }
}

/// Transport that injects credentials and follows redirects safely.
///
/// Auth is attached to the top-level request only. A token source is
/// re-invoked (with `retried = true`) after the first 401 and never again
/// within the same call chain; redirected responses are not retried.
/// Before following any redirect the `Authorization` and `Referer`
/// headers are removed so neither credentials nor referring URLs reach
/// the redirect target; all other headers are preserved.
#[derive(Clone)]
pub struct AuthedClient {
    executor: Arc<dyn HttpExecutor>,
    auth: AuthMode,
}

impl AuthedClient {
    pub fn new(executor: Arc<dyn HttpExecutor>, auth: AuthMode) -> Self {
        Self { executor, auth }
    }

    pub async fn get_json(&self, url: Url) -> Result<Response> {
        let mut request = Request::get(url);
        request.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.execute(request).await
    }

    pub async fn post_json(&self, url: Url, body: Vec<u8>) -> Result<Response> {
        let mut request = Request::post(url);
        request.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = Some(body);
        self.execute(request).await
    }

    pub async fn post_form(&self, url: Url, body: String) -> Result<Response> {
        let mut request = Request::post(url);
        request.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = Some(body.into_bytes());
        self.execute(request).await
    }

    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        self.attach_auth(&mut request, false).await?;
        let mut response = self.executor.execute(request.clone()).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            if let AuthMode::Token(_) = self.auth {
                self.attach_auth(&mut request, true).await?;
                response = self.executor.execute(request.clone()).await?;
            }
        }

        let mut hops = 0;
        while response.status.is_redirection() {
            let location = match response.headers.get(LOCATION) {
                Some(location) => location,
                None => break,
            };
            let location = location
                .to_str()
                .map_err(|_| Error::ProtocolDecode {
                    what: "redirect location",
                    body: format!("{location:?}"),
                })?
                .to_string();

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(Error::TooManyRedirects {
                    url: request.url.to_string(),
                });
            }

            let next_url = request.url.join(&location).map_err(|_| Error::ProtocolDecode {
                what: "redirect location",
                body: location.clone(),
            })?;
            debug!("Following redirect to {}", next_url);

            request.headers.remove(AUTHORIZATION);
            request.headers.remove(REFERER);
            request.url = next_url;
            if matches!(
                response.status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            ) {
                request.method = Method::GET;
                request.body = None;
            }

            response = self.executor.execute(request.clone()).await?;
        }

        Ok(response)
    }

    async fn attach_auth(&self, request: &mut Request, retried: bool) -> Result<()> {
        let value = match &self.auth {
            AuthMode::None => return Ok(()),
            AuthMode::Basic { username, password } => {
                format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
            }
            AuthMode::Token(source) => source.token(retried).await?,
        };

        let value = HeaderValue::from_str(&value)
            .map_err(|_| Error::InvalidHeader("authorization value contains invalid characters".into()))?;
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
