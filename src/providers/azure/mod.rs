//! Azure OpenAI provider
//!
//! Chat-completions streaming against Azure OpenAI deployments (and other
//! OpenAI-compatible endpoints that follow the same dialect).
//!
//! - `config`: deployment, auth and request settings
//! - `provision`: lazily built HTTP client and credential
//! - `transformers`: request shaping
//! - `streaming`: SSE chunk normalization
//! - `client`: the public `AzureChatClient`

pub mod client;
pub mod config;
pub mod provision;
pub mod streaming;
pub mod transformers;

pub use client::{AzureChatClient, ModelInfo};
pub use config::{AzureConfig, DEFAULT_API_VERSION, ReasoningEffort, UrlStyle};
pub use provision::{Credential, ProvisionedClient};
pub use streaming::{ChunkNormalizer, normalize_sse};
pub use transformers::{
    ChatCompletionRequest, ProviderHint, is_reasoning_model, shape, uses_fixed_temperature,
};
