//! Raw error types
//!
//! `LlmError` is what the transport, HTTP status handling, parsing and
//! configuration validation produce. It is never handed to callers verbatim:
//! every failure is passed through [`crate::error::classify`] first.

use thiserror::Error;

/// Raw error produced inside the adapter pipeline.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// HTTP client failure that is neither a timeout nor a connect failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success HTTP status returned by the provider.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// DNS / TCP / TLS connection failure.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Transport failure after the response stream was opened.
    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Missing or contradictory setup.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Caller-supplied input the provider would reject.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// The credential backend could not mint a bearer token.
    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Build an `ApiError` without structured details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Build an `ApiError` carrying the provider's error body.
    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// HTTP status code, when the error came from a provider response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The message without the variant prefix added by `Display`.
    pub fn raw_message(&self) -> String {
        match self {
            Self::ApiError {
                message, details, ..
            } => match details {
                Some(details) => format!("{message} {details}"),
                None => message.clone(),
            },
            Self::HttpError(m)
            | Self::ConnectionError(m)
            | Self::TimeoutError(m)
            | Self::StreamError(m)
            | Self::ParseError(m)
            | Self::ConfigurationError(m)
            | Self::InvalidParameter(m)
            | Self::MissingApiKey(m)
            | Self::TokenError(m)
            | Self::InternalError(m) => m.clone(),
        }
    }

    /// Whether the failure stems from setup rather than from the provider.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_) | Self::InvalidParameter(_) | Self::MissingApiKey(_)
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TimeoutError(err.to_string());
        }
        if err.is_connect() {
            return Self::ConnectionError(connect_error_chain(&err));
        }
        if let Some(status) = err.status() {
            return Self::api_error(status.as_u16(), err.to_string());
        }
        if err.is_builder() {
            return Self::ConfigurationError(err.to_string());
        }
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

// reqwest hides "dns error" / "Connection refused" in the source chain.
fn connect_error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
