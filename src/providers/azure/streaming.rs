//! Streaming event normalization for Azure OpenAI chat completions
//!
//! Chunks are processed strictly in arrival order by a single consumer.
//! [`ChunkNormalizer`] owns all per-request state (tool-call accumulators and
//! the latest usage block); it is created per request and dropped with it.

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::LlmError;
use crate::streaming::{ToolCallFragment, ToolCallReassembler};
use crate::types::{CapabilityRecord, StreamEvent, Usage};

const DONE_SENTINEL: &str = "[DONE]";

/// Per-request chunk-to-event state machine.
#[derive(Debug)]
pub struct ChunkNormalizer {
    capability: CapabilityRecord,
    tool_calls: ToolCallReassembler,
    usage: Option<Usage>,
    chunks: u64,
    skipped: u64,
    finished: bool,
}

impl ChunkNormalizer {
    pub fn new(capability: CapabilityRecord) -> Self {
        Self {
            capability,
            tool_calls: ToolCallReassembler::new(),
            usage: None,
            chunks: 0,
            skipped: 0,
            finished: false,
        }
    }

    /// Process one SSE `data` payload.
    ///
    /// Malformed or unrecognized chunks are skipped. The only error is a
    /// provider error object delivered inside the stream.
    pub fn on_chunk(&mut self, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        self.chunks += 1;

        let value: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                self.skip(&format!("invalid JSON: {e}"));
                return Ok(Vec::new());
            }
        };
        let Some(obj) = value.as_object() else {
            self.skip("payload is not a JSON object");
            return Ok(Vec::new());
        };

        if let Some(error) = obj.get("error")
            && !error.is_null()
        {
            return Err(in_stream_error(error));
        }

        let mut recognized = false;
        let mut events = Vec::new();

        if let Some(choices) = obj.get("choices").and_then(Value::as_array) {
            recognized = true;
            // Only the first choice is streamed; `n > 1` is never requested.
            if let Some(choice) = choices.first() {
                if let Some(delta) = choice.get("delta").filter(|d| d.is_object()) {
                    self.on_delta(delta, &mut events);
                }
                if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                    tracing::debug!(finish_reason = reason, "choice finished");
                }
            }
        }

        if let Some(usage) = obj.get("usage").filter(|u| u.is_object()) {
            recognized = true;
            // Keep only the latest block; it is emitted once when the stream ends.
            self.usage = Some(parse_usage(usage));
        }

        if !recognized {
            self.skip("unrecognized chunk shape");
        }
        Ok(events)
    }

    fn on_delta(&mut self, delta: &Value, events: &mut Vec<StreamEvent>) {
        if let Some(text) = delta.get("content").and_then(Value::as_str)
            && !text.is_empty()
        {
            events.push(StreamEvent::text(text));
        }

        let reasoning = delta
            .get("reasoning_content")
            .or_else(|| delta.get("reasoning"))
            .and_then(Value::as_str);
        if let Some(reasoning) = reasoning
            && !reasoning.is_empty()
        {
            events.push(StreamEvent::reasoning(reasoning));
        }

        if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for (position, call) in calls.iter().enumerate() {
                let id = string_field(call.get("id"));
                let index = match call
                    .get("index")
                    .and_then(Value::as_u64)
                    .and_then(|i| u32::try_from(i).ok())
                {
                    Some(index) => index,
                    // Some gateways omit the index and send one call per chunk.
                    None => self
                        .tool_calls
                        .index_for_unindexed(id.as_deref(), position as u32),
                };
                let function = call.get("function");
                let fragment = ToolCallFragment {
                    index,
                    id,
                    name: string_field(function.and_then(|f| f.get("name"))),
                    arguments: string_field(function.and_then(|f| f.get("arguments"))),
                };
                events.extend(self.tool_calls.push(fragment));
            }
        }
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        tracing::warn!(chunk = self.chunks, reason, "skipping stream chunk");
    }

    /// Close open tool calls before the stream ends with an error.
    ///
    /// Usage is not emitted; the accounting of a failed request is incomplete.
    pub fn flush_tool_calls(&mut self) -> Vec<StreamEvent> {
        self.tool_calls.finish()
    }

    /// Flush open tool calls, then the final usage. Idempotent.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = self.tool_calls.finish();
        if let Some(mut usage) = self.usage.take() {
            usage.total_cost = compute_cost(&usage, &self.capability);
            events.push(StreamEvent::Usage(usage));
        }
        tracing::debug!(
            chunks = self.chunks,
            skipped = self.skipped,
            "stream finished"
        );
        events
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn count(value: &Value, path: &[&str]) -> Option<u32> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_u64().map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// Read a usage block, accepting the alternate cache-accounting field names
/// used by OpenAI-compatible gateways.
pub fn parse_usage(usage: &Value) -> Usage {
    let cache_read_tokens = count(usage, &["prompt_tokens_details", "cached_tokens"])
        .or_else(|| count(usage, &["cache_read_input_tokens"]))
        .or_else(|| count(usage, &["prompt_cache_hit_tokens"]))
        .unwrap_or(0);

    Usage {
        input_tokens: count(usage, &["prompt_tokens"]).unwrap_or(0),
        output_tokens: count(usage, &["completion_tokens"]).unwrap_or(0),
        cache_read_tokens,
        cache_write_tokens: count(usage, &["cache_creation_input_tokens"]).unwrap_or(0),
        reasoning_tokens: count(usage, &["completion_tokens_details", "reasoning_tokens"]),
        total_cost: None,
    }
}

/// USD cost of `usage`; `None` when the model has no known prices.
///
/// `input_tokens` already includes cached prompt tokens, which are billed at
/// the input price.
pub fn compute_cost(usage: &Usage, capability: &CapabilityRecord) -> Option<f64> {
    if !capability.has_pricing() {
        return None;
    }
    let input = f64::from(usage.input_tokens) * capability.input_price_per_mtok;
    let output = f64::from(usage.output_tokens) * capability.output_price_per_mtok;
    Some((input + output) / 1_000_000.0)
}

fn in_stream_error(error: &Value) -> LlmError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("provider reported an error")
        .to_string();
    let code = error.get("code");
    let status = error
        .get("status")
        .and_then(Value::as_u64)
        .or_else(|| code.and_then(Value::as_u64))
        .and_then(|n| u16::try_from(n).ok())
        .or_else(|| code.and_then(Value::as_str).and_then(status_for_code));

    match status {
        Some(status) => LlmError::api_error_with_details(status, message, error.clone()),
        None => {
            let code = code.and_then(Value::as_str).unwrap_or("unknown");
            LlmError::StreamError(format!("{message} (code: {code})"))
        }
    }
}

fn status_for_code(code: &str) -> Option<u16> {
    if let Ok(n) = code.parse::<u16>() {
        return Some(n);
    }
    match code.to_ascii_lowercase().as_str() {
        "rate_limit_exceeded" | "too_many_requests" | "ratelimitexceeded" => Some(429),
        "deploymentnotfound" | "not_found" => Some(404),
        "unauthorized" | "invalid_api_key" => Some(401),
        "forbidden" => Some(403),
        _ => None,
    }
}

/// Turn a raw SSE byte stream into normalized events.
///
/// Stops at the `[DONE]` sentinel or when the transport closes, then flushes
/// pending tool calls and usage. Transport and SSE framing failures end the
/// stream with an error; nothing is emitted after it.
pub fn normalize_sse<S, B, E>(
    byte_stream: S,
    capability: CapabilityRecord,
) -> impl Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    LlmError: From<E>,
{
    async_stream::stream! {
        let mut normalizer = ChunkNormalizer::new(capability);
        let mut events = Box::pin(byte_stream.eventsource());

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    for ev in normalizer.flush_tool_calls() {
                        yield Ok(ev);
                    }
                    yield Err(LlmError::from(e));
                    return;
                }
                Err(e) => {
                    for ev in normalizer.flush_tool_calls() {
                        yield Ok(ev);
                    }
                    yield Err(LlmError::StreamError(format!("malformed SSE framing: {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                break;
            }

            match normalizer.on_chunk(data) {
                Ok(batch) => {
                    for ev in batch {
                        yield Ok(ev);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "provider reported an error inside the stream");
                    for ev in normalizer.flush_tool_calls() {
                        yield Ok(ev);
                    }
                    yield Err(e);
                    return;
                }
            }
        }
        drop(events);

        for ev in normalizer.finish() {
            yield Ok(ev);
        }
    }
}
