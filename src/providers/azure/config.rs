//! Azure OpenAI adapter configuration.

use std::str::FromStr;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthMode, AzureEnvironment, TokenProvider};
use crate::error::{ClassifyContext, LlmError};
use crate::retry::RetryPolicy;
use crate::types::{HttpConfig, PartialCapability};

/// API version used when the configuration does not override it.
pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

/// Reasoning-effort hint forwarded to reasoning-class models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(LlmError::InvalidParameter(format!(
                "unknown reasoning effort '{other}' (expected low, medium or high)"
            ))),
        }
    }
}

/// How the chat-completions URL is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlStyle {
    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
    #[default]
    DeploymentBased,
    /// `{endpoint}/openai/v1/chat/completions?api-version=...`, deployment in `model`.
    V1,
}

/// Configuration for one Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub auth_mode: AuthMode,
    pub api_key: Option<SecretString>,
    pub token_provider: Option<Arc<dyn TokenProvider>>,
    pub environment: AzureEnvironment,
    /// Audience scope override; honoured only for identity auth on Azure Stack.
    pub custom_scope: Option<String>,
    pub api_version: Option<String>,
    /// Deployment id, as created in the Azure portal.
    pub deployment: String,
    /// Underlying model name, when the deployment name does not reveal it.
    pub model_name: Option<String>,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Overrides the default temperature for models that accept one.
    pub temperature: Option<f32>,
    /// Send `max_completion_tokens` from the capability record.
    pub include_max_tokens: bool,
    pub capability_override: Option<PartialCapability>,
    pub url_style: UrlStyle,
    pub http_config: HttpConfig,
    pub retry_policy: RetryPolicy,
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_mode", &self.auth_mode)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_token_provider", &self.token_provider.is_some())
            .field("environment", &self.environment)
            .field("custom_scope", &self.custom_scope)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("model_name", &self.model_name)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("temperature", &self.temperature)
            .field("include_max_tokens", &self.include_max_tokens)
            .field("url_style", &self.url_style)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl AzureConfig {
    /// Create a configuration for one deployment
    pub fn new(endpoint: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_mode: AuthMode::ApiKey,
            api_key: None,
            token_provider: None,
            environment: AzureEnvironment::Public,
            custom_scope: None,
            api_version: None,
            deployment: deployment.into(),
            model_name: None,
            reasoning_effort: None,
            temperature: None,
            include_max_tokens: false,
            capability_override: None,
            url_style: UrlStyle::default(),
            http_config: HttpConfig::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Read the configuration from `AZURE_OPENAI_*` environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").map_err(|_| {
            LlmError::ConfigurationError("AZURE_OPENAI_ENDPOINT is not set".to_string())
        })?;
        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT").map_err(|_| {
            LlmError::ConfigurationError("AZURE_OPENAI_DEPLOYMENT is not set".to_string())
        })?;

        let mut config = Self::new(endpoint, deployment);
        if let Ok(key) = std::env::var("AZURE_OPENAI_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Ok(version) = std::env::var("AZURE_OPENAI_API_VERSION") {
            config = config.with_api_version(version);
        }
        if let Ok(scope) = std::env::var("AZURE_OPENAI_SCOPE") {
            config = config.with_custom_scope(scope);
        }
        if let Ok(effort) = std::env::var("AZURE_OPENAI_REASONING_EFFORT") {
            config = config.with_reasoning_effort(effort.parse()?);
        }
        Ok(config)
    }

    /// Set API key and switch to key auth
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::ApiKey;
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Switch to identity auth with the given token provider.
    pub fn with_identity(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.auth_mode = AuthMode::Identity;
        self.token_provider = Some(provider);
        self
    }

    /// Set authentication mode
    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Set cloud environment
    pub fn with_environment(mut self, environment: AzureEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Set token audience scope (Azure Stack)
    pub fn with_custom_scope(mut self, scope: impl Into<String>) -> Self {
        self.custom_scope = Some(scope.into());
        self
    }

    /// Set API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set underlying model name used for capability lookup
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    /// Set reasoning effort
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Set temperature for regular models
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Send `max_completion_tokens` from the capability record
    pub fn with_include_max_tokens(mut self, include: bool) -> Self {
        self.include_max_tokens = include;
        self
    }

    /// Set capability override
    pub fn with_capability_override(mut self, partial: PartialCapability) -> Self {
        self.capability_override = Some(partial);
        self
    }

    /// Set URL style
    pub fn with_url_style(mut self, style: UrlStyle) -> Self {
        self.url_style = style;
        self
    }

    /// Set HTTP configuration
    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Set retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn effective_api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_API_VERSION)
    }

    /// Name used for capability lookup: the model name, else the deployment id.
    pub fn capability_key(&self) -> &str {
        self.model_name
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.deployment.trim())
    }

    pub fn classify_context(&self) -> ClassifyContext {
        ClassifyContext {
            auth_mode: self.auth_mode,
            deployment: Some(self.deployment.clone()),
            endpoint: Some(self.endpoint.clone()),
            api_version: Some(self.effective_api_version().to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), LlmError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(LlmError::ConfigurationError(
                "Azure OpenAI endpoint is not set".to_string(),
            ));
        }
        let url = reqwest::Url::parse(endpoint).map_err(|e| {
            LlmError::ConfigurationError(format!("invalid Azure OpenAI endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LlmError::ConfigurationError(format!(
                "Azure OpenAI endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.deployment.trim().is_empty() {
            return Err(LlmError::ConfigurationError(
                "Azure OpenAI deployment name is not set".to_string(),
            ));
        }
        match self.auth_mode {
            AuthMode::ApiKey => {
                let has_key = self
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.expose_secret().trim().is_empty());
                if !has_key {
                    return Err(LlmError::MissingApiKey(
                        "Azure OpenAI API key is not set".to_string(),
                    ));
                }
            }
            AuthMode::Identity => {
                if self.token_provider.is_none() {
                    return Err(LlmError::ConfigurationError(
                        "identity authentication selected but no token provider was supplied"
                            .to_string(),
                    ));
                }
            }
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(LlmError::InvalidParameter(format!(
                "temperature must be between 0 and 2, got {t}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    fn base() -> AzureConfig {
        AzureConfig::new("https://res.openai.azure.com", "gpt-4o").with_api_key("k")
    }

    #[test]
    fn valid_key_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn missing_endpoint_is_configuration_error() {
        let mut config = base();
        config.endpoint = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let config = AzureConfig::new("https://res.openai.azure.com", "gpt-4o");
        assert!(matches!(config.validate(), Err(LlmError::MissingApiKey(_))));
        let blank = base().with_api_key(" ");
        assert!(blank.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn identity_requires_provider() {
        let config = base().with_auth_mode(AuthMode::Identity);
        assert!(config.validate().unwrap_err().is_configuration());
        let config = base().with_identity(Arc::new(StaticTokenProvider::new("t")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn temperature_is_range_checked() {
        assert!(base().with_temperature(2.5).validate().is_err());
        assert!(base().with_temperature(0.7).validate().is_ok());
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", base().with_api_key("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("has_api_key: true"));
    }

    #[test]
    fn capability_key_prefers_model_name() {
        let config = AzureConfig::new("https://r.openai.azure.com", "prod-chat");
        assert_eq!(config.capability_key(), "prod-chat");
        assert_eq!(config.with_model_name("o3-mini").capability_key(), "o3-mini");
    }

    #[test]
    fn api_version_defaults() {
        assert_eq!(base().effective_api_version(), DEFAULT_API_VERSION);
        assert_eq!(
            base().with_api_version("2025-01-01-preview").effective_api_version(),
            "2025-01-01-preview"
        );
    }

    #[test]
    fn reasoning_effort_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<ReasoningEffort>().unwrap(), ReasoningEffort::High);
        assert!("extreme".parse::<ReasoningEffort>().is_err());
    }
}
