//! Request shaping for Azure OpenAI chat completions
//!
//! Turns a system prompt, canonical history and optional tools into the
//! provider-native request body. Dialect differences between model families
//! are small predicates over `(model id, capability record)`.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use super::config::{AzureConfig, ReasoningEffort, UrlStyle};
use crate::error::LlmError;
use crate::types::{CapabilityRecord, ContentPart, ImageSource, Message, Role, ToolSchema};
use crate::utils::image::to_data_url;

/// Temperature sent to models that accept one, unless overridden.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Text sent instead of an image part to models without vision support.
pub const IMAGE_PLACEHOLDER: &str = "[image omitted: this model does not accept image input]";

// Model families exposing reasoning-effort control and the `developer` role.
const REASONING_FAMILY_PREFIXES: &[&str] = &["o1", "o3", "o4", "gpt-5", "codex-mini"];

// Non-reasoning families that reject any temperature other than their
// built-in default.
const FIXED_TEMPERATURE_PREFIXES: &[&str] = &[
    "gpt-4o-search-preview",
    "gpt-4o-mini-search-preview",
    "computer-use-preview",
];

// Chat-tuned variants of reasoning families behave like regular chat models.
const CHAT_EXCEPTION_MARKER: &str = "-chat";

fn matches_family(model_id: &str, prefixes: &[&str]) -> bool {
    let id = model_id.trim().to_ascii_lowercase();
    prefixes.iter().any(|p| id.starts_with(p)) && !id.contains(CHAT_EXCEPTION_MARKER)
}

/// Reasoning-class: declared by the capability record, or recognized by name.
pub fn is_reasoning_model(model_id: &str, capability: &CapabilityRecord) -> bool {
    capability.supports_reasoning || matches_family(model_id, REASONING_FAMILY_PREFIXES)
}

pub fn uses_fixed_temperature(model_id: &str) -> bool {
    let id = model_id.trim().to_ascii_lowercase();
    FIXED_TEMPERATURE_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// Per-request knobs taken from the configuration.
#[derive(Debug, Clone, Default)]
pub struct ProviderHint {
    /// Identifier used by the dialect predicates.
    pub model_id: String,
    /// Value for the body's `model` field (only sent for v1-style URLs).
    pub request_model: Option<String>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub temperature: Option<f32>,
    pub include_max_tokens: bool,
}

impl ProviderHint {
    pub fn from_config(config: &AzureConfig) -> Self {
        Self {
            model_id: config.capability_key().to_string(),
            request_model: matches!(config.url_style, UrlStyle::V1)
                .then(|| config.deployment.trim().to_string()),
            reasoning_effort: config.reasoning_effort,
            temperature: config.temperature,
            include_max_tokens: config.include_max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    pub stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Build the provider request. Fails only on invalid tool definitions.
pub fn shape(
    system_prompt: &str,
    messages: &[Message],
    tools: Option<&[ToolSchema]>,
    capability: &CapabilityRecord,
    hint: &ProviderHint,
) -> Result<ChatCompletionRequest, LlmError> {
    let reasoning = is_reasoning_model(&hint.model_id, capability);
    let instruction_role = if reasoning { "developer" } else { "system" };

    let mut wire_messages = Vec::with_capacity(messages.len() + 1);
    if !system_prompt.trim().is_empty() {
        wire_messages.push(WireMessage {
            role: instruction_role,
            content: Some(WireContent::Text(system_prompt.to_string())),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    for message in messages {
        wire_messages.push(convert_message(message, instruction_role, capability));
    }

    let temperature = if reasoning || uses_fixed_temperature(&hint.model_id) {
        None
    } else {
        Some(hint.temperature.unwrap_or(DEFAULT_TEMPERATURE))
    };
    let reasoning_effort = reasoning.then(|| hint.reasoning_effort.unwrap_or_default());

    let tools = match tools {
        Some(tools) if !tools.is_empty() => Some(convert_tools(tools)?),
        _ => None,
    };

    tracing::debug!(
        model = %hint.model_id,
        reasoning,
        messages = wire_messages.len(),
        tools = tools.as_ref().map_or(0, Vec::len),
        "shaped chat completion request"
    );

    Ok(ChatCompletionRequest {
        model: hint.request_model.clone(),
        messages: wire_messages,
        stream: true,
        stream_options: StreamOptions {
            include_usage: true,
        },
        temperature,
        reasoning_effort,
        max_completion_tokens: hint
            .include_max_tokens
            .then_some(capability.max_output_tokens),
        tools,
    })
}

fn convert_message(
    message: &Message,
    instruction_role: &'static str,
    capability: &CapabilityRecord,
) -> WireMessage {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System | Role::Developer => instruction_role,
        Role::Tool => "tool",
    };
    // Only user turns may carry image parts on the wire.
    let images_allowed = capability.supports_images && message.role == Role::User;

    let tool_calls = (message.role == Role::Assistant && !message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|c| WireToolCall {
                id: c.id.clone(),
                kind: "function",
                function: WireFunctionCall {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                },
            })
            .collect()
    });

    let content = convert_content(&message.content, images_allowed);
    // Assistant turns that only call tools carry no content.
    let content = match content {
        WireContent::Text(ref t) if t.is_empty() && tool_calls.is_some() => None,
        other => Some(other),
    };

    WireMessage {
        role,
        content,
        tool_calls,
        tool_call_id: if message.role == Role::Tool {
            message.tool_call_id.clone()
        } else {
            None
        },
    }
}

fn convert_content(parts: &[ContentPart], images_allowed: bool) -> WireContent {
    let mut wire: Vec<WirePart> = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            ContentPart::Text { text } => wire.push(WirePart::Text { text: text.clone() }),
            ContentPart::Image { source, detail } if images_allowed => {
                let url = match source {
                    ImageSource::Url { url } => url.clone(),
                    ImageSource::Base64 { data, media_type } => {
                        to_data_url(data, media_type.as_deref())
                    }
                };
                wire.push(WirePart::ImageUrl {
                    image_url: WireImageUrl {
                        url,
                        detail: detail.clone(),
                    },
                });
            }
            ContentPart::Image { .. } => {
                tracing::warn!("image part replaced by a placeholder; model does not accept images");
                wire.push(WirePart::Text {
                    text: IMAGE_PLACEHOLDER.to_string(),
                });
            }
        }
    }

    match wire.as_slice() {
        [] => WireContent::Text(String::new()),
        [WirePart::Text { text }] => WireContent::Text(text.clone()),
        _ => WireContent::Parts(wire),
    }
}

fn convert_tools(tools: &[ToolSchema]) -> Result<Vec<WireTool>, LlmError> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .map(|tool| {
            let name = tool.name.trim();
            if name.is_empty() {
                return Err(LlmError::ConfigurationError(
                    "tool name must not be empty".to_string(),
                ));
            }
            if !seen.insert(name.to_string()) {
                return Err(LlmError::ConfigurationError(format!(
                    "duplicate tool name '{name}'"
                )));
            }
            validate_parameters(name, &tool.parameters)?;
            Ok(WireTool {
                kind: "function",
                function: WireFunction {
                    name: name.to_string(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
        })
        .collect()
}

fn validate_parameters(tool: &str, schema: &Value) -> Result<(), LlmError> {
    if !schema.is_object() {
        return Err(LlmError::ConfigurationError(format!(
            "parameters of tool '{tool}' must be a JSON Schema object"
        )));
    }
    jsonschema::validator_for(schema).map_err(|e| {
        LlmError::ConfigurationError(format!(
            "parameters of tool '{tool}' are not a valid JSON Schema: {e}"
        ))
    })?;
    Ok(())
}
