use std::path::PathBuf;

/// Crate-wide error type. Variants map one-to-one onto the failure classes
/// the CLI can actually hit: config IO, TLS trust, rejected credentials,
/// prompt failures, task polling timeouts, malformed protocol payloads and
/// application-level command failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reading config '{path}'")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writing config '{path}'")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing config '{path}'")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serializing config")]
    ConfigSerialize(#[source] toml::ser::Error),

    #[error("Building HTTP client")]
    HttpClientBuild(#[source] reqwest::Error),

    #[error("Parsing CA certificate")]
    InvalidCaCert(#[source] reqwest::Error),

    #[error("Certificate validation failed for '{url}': {reason}")]
    TlsTrust { url: String, reason: String },

    #[error("Request to '{url}' failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to '{url}' returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Too many redirects requesting '{url}'")]
    TooManyRedirects { url: String },

    #[error("Constructing request header: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    AuthRejected(String),

    #[error("Asking for '{label}': {reason}")]
    Prompt { label: String, reason: String },

    #[error("Timed out waiting for task '{task_id}' to finish")]
    TaskTimeout { task_id: String },

    /// Malformed payload at a protocol boundary. Always carries the raw
    /// offending body so the failure can be diagnosed from the error alone.
    #[error("Decoding {what}: '{body}'")]
    ProtocolDecode { what: &'static str, body: String },

    #[error("Remote command '{method}' returned an error: {message}")]
    Method { method: String, message: String },

    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
