//! HTTP protocol layer: the authenticated transport, the Director and
//! identity-service clients built on top of it, and the asynchronous
//! command/task runner.

pub mod auth;
pub mod director;
pub mod models;
pub mod runner;
pub mod transport;

pub use auth::{ClientTokenSource, IdentityClient, RefreshTokenSource};
pub use director::DirectorClient;
pub use models::{AccessToken, CmdOutput, Info, Prompt, PromptAnswer, PromptKind};
pub use runner::{CmdRunner, PollConfig};
pub use transport::{AuthMode, AuthedClient, HttpExecutor, ReqwestExecutor, Request, Response, TokenSource};
