//! # siumai-azure-stream
//!
//! Streaming chat-completions adapter for Azure OpenAI and OpenAI-compatible
//! endpoints. It shapes requests per model family, turns the provider's SSE
//! chunks into one ordered stream of [`StreamEvent`](types::StreamEvent)s,
//! reassembles fragmented tool calls, classifies failures into a small
//! taxonomy and retries transient ones.
#![deny(unsafe_code)]

//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use siumai_azure_stream::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AzureConfig::new("https://my-resource.openai.azure.com", "gpt-4o")
//!         .with_api_key(std::env::var("AZURE_OPENAI_API_KEY")?);
//!     let client = AzureChatClient::new(config);
//!
//!     let mut stream = client.create_message("You are terse.", vec![Message::user("Hi")], None);
//!     while let Some(event) = stream.next().await {
//!         match event? {
//!             StreamEvent::Text { delta } => print!("{delta}"),
//!             StreamEvent::Usage(usage) => println!("\n{usage:?}"),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod model_catalog;
pub mod providers;
pub mod retry;
pub mod streaming;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use error::{ClassifiedError, ErrorKind, LlmError};
pub use providers::azure::{AzureChatClient, AzureConfig};
pub use streaming::{ChatStream, ChatStreamHandle};

/// Commonly used types
pub mod prelude {
    pub use crate::auth::{AuthMode, AzureEnvironment, StaticTokenProvider, TokenProvider};
    pub use crate::error::{ClassifiedError, ErrorKind, LlmError};
    pub use crate::model_catalog::CapabilityTable;
    pub use crate::providers::azure::{
        AzureChatClient, AzureConfig, ModelInfo, ReasoningEffort, UrlStyle,
    };
    pub use crate::retry::RetryPolicy;
    pub use crate::streaming::{ChatStream, ChatStreamHandle};
    pub use crate::types::{
        CapabilityRecord, CompletedToolCall, ContentPart, HttpConfig, Message, PartialCapability,
        Role, StreamEvent, ToolCallRef, ToolSchema, Usage,
    };
    pub use crate::utils::cancel::CancelHandle;
}
