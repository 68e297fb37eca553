//! HTTP client configuration

use std::collections::HashMap;
use std::time::Duration;

/// Settings applied when the HTTP client is provisioned.
///
/// Deadlines belong to the transport: the adapter adds none of its own.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout. Streaming responses can be long; `None` by default.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(concat!("siumai-azure-stream/", env!("CARGO_PKG_VERSION")).to_string()),
            headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
