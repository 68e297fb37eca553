//! Authentication helpers and token providers.
//!
//! The adapter never acquires tokens itself. Identity-based auth delegates to a
//! caller-supplied [`TokenProvider`]; the adapter only decides which audience
//! scope the token must be bound to (see [`scope`]).

pub mod scope;

pub use scope::{AzureEnvironment, resolve_audience_scope};

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How requests authenticate against the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    /// Static key sent in the `api-key` header.
    #[default]
    ApiKey,
    /// Federated identity: bearer token minted for an audience scope.
    Identity,
}

/// An async Bearer token provider.
///
/// Implementations should cache internally and refresh when necessary; the
/// adapter asks for a token on every request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns an access token bound to `scope`, suitable for
    /// `Authorization: Bearer <token>`.
    async fn token(&self, scope: &str) -> Result<String, LlmError>;
}

/// A static token provider for tests and externally managed tokens.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _scope: &str) -> Result<String, LlmError> {
        Ok(self.token.clone())
    }
}
