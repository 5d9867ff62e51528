//! Login strategies. Both implement [`LoginStrategy`] and share nothing
//! but the config snapshot they persist into on success, so each can be
//! exercised in isolation against fakes.

use async_trait::async_trait;

use crate::config::Creds;
use crate::error::Result;

pub mod basic;
pub mod identity;

pub use basic::BasicLoginStrategy;
pub use identity::IdentityLoginStrategy;

#[async_trait]
pub trait LoginStrategy {
    /// Runs the login state machine to completion: either a persisted,
    /// reusable session or a fatal error.
    async fn try_login(&self) -> Result<()>;
}

/// Checks whether candidate credentials are accepted by the Director.
/// The production implementation probes `/info` over a basic-authed
/// transport; tests script outcomes.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, creds: &Creds) -> Result<bool>;
}
