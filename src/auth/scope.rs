//! Audience scope resolution for identity-based auth.
//!
//! A token bound to the wrong audience is rejected with a bare 401, so the
//! resolver refuses to guess for Azure Stack endpoints without an explicit scope.

use serde::{Deserialize, Serialize};

use super::AuthMode;
use crate::error::LlmError;

pub const PUBLIC_CLOUD_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
pub const US_GOVERNMENT_SCOPE: &str = "https://cognitiveservices.azure.us/.default";
pub const CHINA_SCOPE: &str = "https://cognitiveservices.azure.cn/.default";

/// Declared cloud environment of the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AzureEnvironment {
    #[default]
    Public,
    UsGovernment,
    China,
    /// Azure Stack Hub / sovereign deployments with their own token audience.
    Stack,
}

impl AzureEnvironment {
    fn default_scope(self) -> Option<&'static str> {
        match self {
            Self::Public => Some(PUBLIC_CLOUD_SCOPE),
            Self::UsGovernment => Some(US_GOVERNMENT_SCOPE),
            Self::China => Some(CHINA_SCOPE),
            Self::Stack => None,
        }
    }
}

// Ordered: the first matching suffix wins.
const HOST_SUFFIX_SCOPES: [(&str, &str); 3] = [
    (".azure.us", US_GOVERNMENT_SCOPE),
    (".azure.cn", CHINA_SCOPE),
    (".azure.com", PUBLIC_CLOUD_SCOPE),
];

/// Resolve the audience scope a bearer token must be issued for.
///
/// Resolution order:
/// 1. explicit override, for identity auth against a `Stack` environment
/// 2. endpoint host suffix of a known cloud
/// 3. the declared environment's scope
/// 4. `Stack` without an override is a configuration error
pub fn resolve_audience_scope(
    endpoint: &str,
    auth_mode: AuthMode,
    environment: AzureEnvironment,
    custom_scope: Option<&str>,
) -> Result<String, LlmError> {
    let custom_scope = custom_scope.map(str::trim).filter(|s| !s.is_empty());

    if auth_mode == AuthMode::Identity
        && environment == AzureEnvironment::Stack
        && let Some(scope) = custom_scope
    {
        return Ok(scope.to_string());
    }
    if custom_scope.is_some() {
        tracing::debug!(
            ?environment,
            "custom audience scope only applies to identity auth on Azure Stack; ignoring"
        );
    }

    if let Some(host) = endpoint_host(endpoint) {
        for (suffix, scope) in HOST_SUFFIX_SCOPES {
            if host.ends_with(suffix) {
                return Ok(scope.to_string());
            }
        }
    }

    environment
        .default_scope()
        .map(str::to_string)
        .ok_or_else(|| {
            LlmError::ConfigurationError(format!(
                "cannot determine the token audience for '{endpoint}': \
                 Azure Stack endpoints require an explicit custom scope"
            ))
        })
}

fn endpoint_host(endpoint: &str) -> Option<String> {
    reqwest::Url::parse(endpoint.trim())
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
}
