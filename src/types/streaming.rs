//! Canonical streaming events

use serde::{Deserialize, Serialize};

/// Final token accounting for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
    pub cache_write_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
    /// USD, when the model has known prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

/// A tool invocation whose fragments have all arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedToolCall {
    /// Provider tool-call index the fragments were addressed to.
    pub index: u32,
    pub id: String,
    pub name: String,
    /// Concatenated argument fragments, verbatim.
    pub arguments: String,
    /// `arguments` parsed as JSON; `None` when they are not valid JSON.
    pub parsed_arguments: Option<serde_json::Value>,
}

impl CompletedToolCall {
    /// The arguments did not form valid JSON; callers decide how to report it.
    pub fn is_malformed(&self) -> bool {
        self.parsed_arguments.is_none()
    }
}

/// One event of the normalized stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text {
        delta: String,
    },
    Reasoning {
        delta: String,
    },
    /// Raw fragment of a tool call, forwarded as it arrives.
    ToolCallDelta {
        index: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id_fragment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name_fragment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        argument_fragment: Option<String>,
    },
    /// Emitted at most once per tool-call index.
    ToolCallComplete(CompletedToolCall),
    /// Emitted at most once per request, after all other events.
    Usage(Usage),
}

impl StreamEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text {
            delta: delta.into(),
        }
    }

    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self::Reasoning {
            delta: delta.into(),
        }
    }
}
