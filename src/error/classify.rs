//! Error classification
//!
//! Maps raw [`LlmError`]s onto the small, stable taxonomy callers program
//! against, with remediation text tailored to the active setup. Rules are
//! checked in order: configuration failures, then HTTP status, then message
//! substrings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::LlmError;
use crate::auth::AuthMode;

/// Coarse error kind surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Auth,
    Authorization,
    NotFound,
    RateLimited,
    Network,
    Configuration,
    Unknown,
}

impl ErrorKind {
    /// Transient kinds eligible for automatic retry.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Network)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Network => "network",
            Self::Configuration => "configuration",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The only error type handed to callers of the adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Human-actionable message.
    pub message: String,
    pub retryable: bool,
    /// HTTP status, when the failure came from a provider response.
    pub status: Option<u16>,
    /// Original message before classification.
    pub raw: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            status: None,
            raw: raw.into(),
        }
    }

    fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }
}

/// Setup details used to phrase remediation text.
#[derive(Debug, Clone, Default)]
pub struct ClassifyContext {
    pub auth_mode: AuthMode,
    pub deployment: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
}

impl ClassifyContext {
    fn endpoint_label(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("the configured endpoint")
    }

    fn deployment_label(&self) -> &str {
        self.deployment
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("<unset>")
    }
}

const NETWORK_MARKERS: [&str; 10] = [
    "enotfound",
    "getaddrinfo",
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "econnrefused",
    "connection refused",
    "econnreset",
    "connection reset",
    "network is unreachable",
];

/// Classify a raw error.
pub fn classify(err: &LlmError, ctx: &ClassifyContext) -> ClassifiedError {
    let raw = err.raw_message();
    let lower = raw.to_lowercase();
    let status = err.status_code();

    if err.is_configuration() {
        return ClassifiedError::new(
            ErrorKind::Configuration,
            format!(
                "Azure OpenAI is not configured correctly: {raw}. \
                 Check the endpoint, deployment name and authentication settings."
            ),
            raw,
        );
    }

    if matches!(err, LlmError::TokenError(_)) {
        return auth_error(ctx, raw, status);
    }

    match status {
        Some(401) => return auth_error(ctx, raw, status),
        Some(403) => {
            let message = format!(
                "Access denied (403) by {}. The credential was accepted but lacks permission: \
                 assign the 'Cognitive Services OpenAI User' role to the identity, or check \
                 the resource's network and firewall rules.",
                ctx.endpoint_label()
            );
            return ClassifiedError::new(ErrorKind::Authorization, message, raw)
                .with_status(status);
        }
        Some(404) if mentions_deployment(&lower, ctx) => {
            return deployment_not_found(ctx, raw, status);
        }
        Some(404) => {
            let message = format!(
                "Resource not found (404) at {}. Check that:\n\
                 - the endpoint URL is the resource endpoint (https://<resource>.openai.azure.com)\n\
                 - the API version '{}' is supported by the resource\n\
                 - the deployment '{}' exists",
                ctx.endpoint_label(),
                ctx.api_version.as_deref().unwrap_or("<default>"),
                ctx.deployment_label(),
            );
            return ClassifiedError::new(ErrorKind::NotFound, message, raw).with_status(status);
        }
        Some(429) => {
            let message = "Rate limited by Azure OpenAI (429). Requests are retried \
                           automatically; if this persists, raise the deployment's \
                           tokens-per-minute quota or reduce request volume."
                .to_string();
            return ClassifiedError::new(ErrorKind::RateLimited, message, raw)
                .with_status(status);
        }
        _ => {}
    }

    let transport_failure = matches!(
        err,
        LlmError::ConnectionError(_) | LlmError::TimeoutError(_)
    );
    if transport_failure || NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        let message = format!(
            "Could not reach {}: {raw}. Check the endpoint host name and your network connection.",
            ctx.endpoint_label()
        );
        return ClassifiedError::new(ErrorKind::Network, message, raw).with_status(status);
    }

    if status.is_none() && lower.contains("deploymentnotfound") {
        return deployment_not_found(ctx, raw, status);
    }

    ClassifiedError::new(ErrorKind::Unknown, raw.clone(), raw).with_status(status)
}

fn auth_error(ctx: &ClassifyContext, raw: String, status: Option<u16>) -> ClassifiedError {
    let message = match ctx.auth_mode {
        AuthMode::Identity => format!(
            "Authentication failed for {} using Azure identity credentials. \
             Re-authenticate (for example `az login`) and make sure the token audience \
             matches the endpoint's cloud.",
            ctx.endpoint_label()
        ),
        AuthMode::ApiKey => format!(
            "Authentication failed for {}. Verify the API key under 'Keys and Endpoint' \
             in the Azure portal and that it belongs to this resource.",
            ctx.endpoint_label()
        ),
    };
    ClassifiedError::new(ErrorKind::Auth, message, raw).with_status(status)
}

fn deployment_not_found(ctx: &ClassifyContext, raw: String, status: Option<u16>) -> ClassifiedError {
    let message = format!(
        "Deployment '{}' was not found at {}. Check that:\n\
         - the deployment name matches the name shown in Azure AI Foundry exactly\n\
         - the deployment has finished provisioning\n\
         - the endpoint belongs to the resource that owns the deployment",
        ctx.deployment_label(),
        ctx.endpoint_label(),
    );
    ClassifiedError::new(ErrorKind::NotFound, message, raw).with_status(status)
}

fn mentions_deployment(lower: &str, ctx: &ClassifyContext) -> bool {
    if lower.contains("deploymentnotfound") || lower.contains("api deployment") {
        return true;
    }
    ctx.deployment
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .is_some_and(|d| lower.contains(&d.to_lowercase()))
}
