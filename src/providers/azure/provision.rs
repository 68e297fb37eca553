//! Client provisioning
//!
//! A [`ProvisionedClient`] binds an HTTP client, a credential and the request
//! URL for one configuration. It is built once and shared read-only.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use super::config::{AzureConfig, UrlStyle};
use super::transformers::ChatCompletionRequest;
use crate::auth::{AuthMode, TokenProvider, resolve_audience_scope};
use crate::error::LlmError;
use crate::types::HttpConfig;

/// How requests are authenticated.
#[derive(Clone)]
pub enum Credential {
    ApiKey(SecretString),
    Identity {
        provider: Arc<dyn TokenProvider>,
        scope: String,
    },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
            Self::Identity { scope, .. } => {
                f.debug_struct("Identity").field("scope", scope).finish_non_exhaustive()
            }
        }
    }
}

/// Ready-to-use client for one deployment.
#[derive(Debug)]
pub struct ProvisionedClient {
    http: reqwest::Client,
    credential: Credential,
    url: String,
    extra_headers: HeaderMap,
}

impl ProvisionedClient {
    /// Validate `config` and build the client. Fails fast on missing setup.
    pub fn provision(config: &AzureConfig) -> Result<Self, LlmError> {
        config.validate()?;

        let credential = match config.auth_mode {
            AuthMode::ApiKey => {
                let key = config.api_key.clone().ok_or_else(|| {
                    LlmError::MissingApiKey("Azure OpenAI API key is not set".to_string())
                })?;
                Credential::ApiKey(key)
            }
            AuthMode::Identity => {
                let provider = config.token_provider.clone().ok_or_else(|| {
                    LlmError::ConfigurationError(
                        "identity authentication selected but no token provider was supplied"
                            .to_string(),
                    )
                })?;
                let scope = resolve_audience_scope(
                    &config.endpoint,
                    AuthMode::Identity,
                    config.environment,
                    config.custom_scope.as_deref(),
                )?;
                Credential::Identity { provider, scope }
            }
        };

        let http = build_http_client(&config.http_config)?;
        let extra_headers = parse_extra_headers(&config.http_config)?;
        let url = chat_completions_url(config);

        tracing::info!(
            deployment = %config.deployment,
            auth_mode = ?config.auth_mode,
            url = %url,
            "provisioned Azure OpenAI client"
        );

        Ok(Self {
            http,
            credential,
            url,
            extra_headers,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Audience scope used for identity auth.
    pub fn scope(&self) -> Option<&str> {
        match &self.credential {
            Credential::Identity { scope, .. } => Some(scope),
            Credential::ApiKey(_) => None,
        }
    }

    async fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = self.extra_headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        match &self.credential {
            Credential::ApiKey(key) => {
                let mut value = HeaderValue::from_str(key.expose_secret().trim()).map_err(|e| {
                    LlmError::InvalidParameter(format!("Invalid Azure api-key header: {e}"))
                })?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static("api-key"), value);
            }
            Credential::Identity { provider, scope } => {
                let token = provider.token(scope).await.map_err(|e| match e {
                    LlmError::ConnectionError(_)
                    | LlmError::TimeoutError(_)
                    | LlmError::TokenError(_) => e,
                    other => LlmError::TokenError(other.raw_message()),
                })?;
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    LlmError::TokenError(format!("token is not a valid header value: {e}"))
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }
        Ok(headers)
    }

    /// Send a streaming chat-completions request.
    ///
    /// Returns the response once a success status arrived; the body is left
    /// unread for the caller to stream.
    pub async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response, LlmError> {
        let headers = self.headers().await?;
        let response = self
            .http
            .post(&self.url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %text, "provider returned an error status");
        Err(error_from_body(status.as_u16(), &text))
    }
}

/// Build the chat-completions URL for the configured style.
pub fn chat_completions_url(config: &AzureConfig) -> String {
    let base = config.endpoint.trim().trim_end_matches('/');
    // Accept endpoints given with or without the `/openai` path.
    let base = base.strip_suffix("/openai").unwrap_or(base);
    let version = urlencoding::encode(config.effective_api_version());
    match config.url_style {
        UrlStyle::DeploymentBased => format!(
            "{base}/openai/deployments/{}/chat/completions?api-version={version}",
            urlencoding::encode(config.deployment.trim())
        ),
        UrlStyle::V1 => format!("{base}/openai/v1/chat/completions?api-version={version}"),
    }
}

fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }
    builder
        .build()
        .map_err(|e| LlmError::ConfigurationError(format!("failed to build HTTP client: {e}")))
}

fn parse_extra_headers(config: &HttpConfig) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| LlmError::InvalidParameter(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| LlmError::InvalidParameter(format!("invalid value for header '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Turn an error response body into an `ApiError`.
///
/// Azure wraps errors as `{"error": {"code": ..., "message": ...}}`; other
/// bodies are kept verbatim.
pub fn error_from_body(status: u16, body: &str) -> LlmError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });
    match error {
        Some(error) => LlmError::api_error_with_details(status, message, error.clone()),
        None => LlmError::api_error(status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AzureEnvironment, StaticTokenProvider};
    use crate::auth::scope::US_GOVERNMENT_SCOPE;

    fn key_config() -> AzureConfig {
        AzureConfig::new("https://res.openai.azure.com/", "my deployment").with_api_key("k")
    }

    #[test]
    fn deployment_url_encodes_deployment_and_version() {
        let url = chat_completions_url(&key_config());
        assert_eq!(
            url,
            "https://res.openai.azure.com/openai/deployments/my%20deployment/chat/completions?api-version=2024-12-01-preview"
        );
    }

    #[test]
    fn v1_url_and_openai_suffix() {
        let config = AzureConfig::new("https://res.openai.azure.com/openai", "d")
            .with_api_key("k")
            .with_url_style(UrlStyle::V1)
            .with_api_version("preview");
        assert_eq!(
            chat_completions_url(&config),
            "https://res.openai.azure.com/openai/v1/chat/completions?api-version=preview"
        );
    }

    #[test]
    fn identity_scope_follows_endpoint_host() {
        let config = AzureConfig::new("https://res.openai.azure.us", "d")
            .with_identity(Arc::new(StaticTokenProvider::new("t")));
        let client = ProvisionedClient::provision(&config).unwrap();
        assert_eq!(client.scope(), Some(US_GOVERNMENT_SCOPE));
    }

    #[test]
    fn stack_without_scope_fails_with_configuration_error() {
        let config = AzureConfig::new("https://openai.stack.contoso.local", "d")
            .with_identity(Arc::new(StaticTokenProvider::new("t")))
            .with_environment(AzureEnvironment::Stack);
        let err = ProvisionedClient::provision(&config).unwrap_err();
        assert!(err.is_configuration());

        let config = config.with_custom_scope("https://cognitiveservices.contoso.local/.default");
        let client = ProvisionedClient::provision(&config).unwrap();
        assert_eq!(client.scope(), Some("https://cognitiveservices.contoso.local/.default"));
    }

    #[test]
    fn api_key_credential_is_redacted_in_debug() {
        let client = ProvisionedClient::provision(&key_config().with_api_key("hunter2")).unwrap();
        assert!(client.scope().is_none());
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[test]
    fn invalid_extra_header_is_rejected() {
        let config = key_config().with_http_config(HttpConfig::default().with_header("bad header", "v"));
        assert!(ProvisionedClient::provision(&config).unwrap_err().is_configuration());
    }

    #[test]
    fn error_bodies_are_parsed() {
        let err = error_from_body(
            404,
            r#"{"error":{"code":"DeploymentNotFound","message":"The API deployment for this resource does not exist."}}"#,
        );
        assert_eq!(err.status_code(), Some(404));
        assert!(err.raw_message().contains("DeploymentNotFound"));

        let err = error_from_body(502, "");
        assert_eq!(err.raw_message(), "HTTP 502");
    }
}
