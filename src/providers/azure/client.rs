//! Azure OpenAI chat client
//!
//! Entry point of the adapter: provisions the HTTP client lazily, shapes the
//! request, and streams normalized events under the retry policy.

use std::sync::Arc;

use futures::StreamExt;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::config::AzureConfig;
use super::provision::ProvisionedClient;
use super::streaming::normalize_sse;
use super::transformers::{ChatCompletionRequest, ProviderHint, shape};
use crate::error::{ClassifiedError, ClassifyContext, LlmError, classify};
use crate::model_catalog::CapabilityTable;
use crate::retry::retry_stream;
use crate::streaming::{ChatStream, ChatStreamHandle};
use crate::types::{CapabilityRecord, Message, ToolSchema};
use crate::utils::cancel::{cancellable_with_token, make_cancellable_stream};

/// Model identity and capabilities, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Deployment id requests are routed to.
    pub id: String,
    /// Name the capability record was resolved from.
    pub model: String,
    pub capability: CapabilityRecord,
}

struct ClientInner {
    config: AzureConfig,
    capability: CapabilityRecord,
    context: ClassifyContext,
    provisioned: OnceCell<Arc<ProvisionedClient>>,
}

impl ClientInner {
    fn new(config: AzureConfig, catalog: &CapabilityTable) -> Self {
        let mut capability = catalog.resolve(config.capability_key());
        if let Some(partial) = &config.capability_override {
            capability = capability.merged_with(partial);
        }
        Self {
            context: config.classify_context(),
            capability,
            config,
            provisioned: OnceCell::new(),
        }
    }

    fn ensure(&self) -> Result<Arc<ProvisionedClient>, ClassifiedError> {
        self.provisioned
            .get_or_try_init(|| ProvisionedClient::provision(&self.config).map(Arc::new))
            .cloned()
            .map_err(|e| self.classify(&e))
    }

    fn classify(&self, err: &LlmError) -> ClassifiedError {
        let classified = classify(err, &self.context);
        tracing::debug!(
            kind = %classified.kind,
            status = classified.status,
            retryable = classified.retryable,
            raw = %classified.raw,
            "classified provider error"
        );
        classified
    }

    /// One attempt: provision, send, normalize. Lazy until polled.
    fn attempt(self: Arc<Self>, request: Arc<ChatCompletionRequest>) -> ChatStream {
        Box::pin(async_stream::stream! {
            let client = match self.ensure() {
                Ok(client) => client,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let response = match client.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(self.classify(&e));
                    return;
                }
            };

            let mut events = Box::pin(normalize_sse(response.bytes_stream(), self.capability));
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => {
                        yield Ok(event);
                    }
                    Err(e) => {
                        yield Err(self.classify(&e));
                        return;
                    }
                }
            }
        })
    }
}

/// Streaming chat client for one Azure OpenAI deployment.
///
/// Cheap to clone; clones share the provisioned HTTP client. Each call to
/// [`create_message`](Self::create_message) owns its own reassembly state.
#[derive(Clone)]
pub struct AzureChatClient {
    inner: Arc<ClientInner>,
    catalog: Arc<CapabilityTable>,
}

impl std::fmt::Debug for AzureChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureChatClient")
            .field("config", &self.inner.config)
            .field("provisioned", &self.inner.provisioned.get().is_some())
            .finish()
    }
}

impl AzureChatClient {
    pub fn new(config: AzureConfig) -> Self {
        Self::with_catalog(config, CapabilityTable::azure_openai())
    }

    /// Use a custom capability table instead of the built-in catalog.
    pub fn with_catalog(config: AzureConfig, catalog: CapabilityTable) -> Self {
        let inner = Arc::new(ClientInner::new(config, &catalog));
        Self {
            inner,
            catalog: Arc::new(catalog),
        }
    }

    pub fn config(&self) -> &AzureConfig {
        &self.inner.config
    }

    /// Replace the configuration. The next request provisions a new client.
    pub fn set_config(&mut self, config: AzureConfig) {
        tracing::debug!(deployment = %config.deployment, "configuration changed; dropping cached client");
        self.inner = Arc::new(ClientInner::new(config, &self.catalog));
    }

    /// Provision (once) and return the shared client.
    pub fn ensure_client(&self) -> Result<Arc<ProvisionedClient>, ClassifiedError> {
        self.inner.ensure()
    }

    pub fn get_model(&self) -> ModelInfo {
        ModelInfo {
            id: self.inner.config.deployment.clone(),
            model: self.inner.config.capability_key().to_string(),
            capability: self.inner.capability,
        }
    }

    /// Stream a completion for `messages`.
    ///
    /// The returned stream is lazy and finite. Transient failures before the
    /// first event are retried per the configured policy; every error it
    /// yields is classified and ends the stream.
    pub fn create_message(
        &self,
        system_prompt: &str,
        messages: Vec<Message>,
        tools: Option<Vec<ToolSchema>>,
    ) -> ChatStream {
        let hint = ProviderHint::from_config(&self.inner.config);
        let request = match shape(
            system_prompt,
            &messages,
            tools.as_deref(),
            &self.inner.capability,
            &hint,
        ) {
            Ok(request) => Arc::new(request),
            Err(e) => {
                let classified = self.inner.classify(&e);
                return Box::pin(futures::stream::once(async move {
                    Err::<crate::types::StreamEvent, _>(classified)
                }));
            }
        };

        let inner = self.inner.clone();
        retry_stream(self.inner.config.retry_policy.clone(), move || {
            inner.clone().attempt(request.clone())
        })
    }

    /// Like [`create_message`](Self::create_message), with a cancel handle.
    pub fn create_message_with_cancel(
        &self,
        system_prompt: &str,
        messages: Vec<Message>,
        tools: Option<Vec<ToolSchema>>,
    ) -> ChatStreamHandle {
        let (stream, cancel) = make_cancellable_stream(self.create_message(system_prompt, messages, tools));
        ChatStreamHandle { stream, cancel }
    }

    /// Like [`create_message`](Self::create_message), stopping when `token` is cancelled.
    pub fn create_message_with_token(
        &self,
        system_prompt: &str,
        messages: Vec<Message>,
        tools: Option<Vec<ToolSchema>>,
        token: CancellationToken,
    ) -> ChatStream {
        cancellable_with_token(self.create_message(system_prompt, messages, tools), token)
    }
}
