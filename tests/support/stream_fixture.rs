//! Test fixture utilities: load SSE fixtures and drive the normalizer

#![allow(dead_code)]

use futures_util::StreamExt;
use siumai_azure_stream::LlmError;
use siumai_azure_stream::providers::azure::normalize_sse;
use siumai_azure_stream::types::{CapabilityRecord, StreamEvent};

/// Absolute path of a fixture under `tests/fixtures/azure`.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/azure/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Raw fixture text with normalized line endings.
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("fixture {name}: {e}"))
        .replace("\r\n", "\n")
}

/// Load an `.sse` fixture and split it into one byte chunk per SSE event.
pub fn load_sse_fixture_as_bytes(name: &str) -> Vec<Result<Vec<u8>, LlmError>> {
    load_fixture(name)
        .split("\n\n")
        .map(|chunk| chunk.trim_end_matches('\n'))
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| Ok(format!("{chunk}\n\n").into_bytes()))
        .collect()
}

/// Same bytes, re-split every `size` bytes to exercise partial reads.
pub fn rechunk(chunks: Vec<Result<Vec<u8>, LlmError>>, size: usize) -> Vec<Result<Vec<u8>, LlmError>> {
    let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.expect("fixture bytes")).collect();
    joined.chunks(size).map(|c| Ok(c.to_vec())).collect()
}

/// Run byte chunks through the normalizer and collect every item.
pub async fn collect_events(
    bytes: Vec<Result<Vec<u8>, LlmError>>,
    capability: CapabilityRecord,
) -> Vec<Result<StreamEvent, LlmError>> {
    normalize_sse(futures_util::stream::iter(bytes), capability)
        .collect()
        .await
}

/// Concatenated text deltas.
pub fn text_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Text { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

/// Concatenated reasoning deltas.
pub fn reasoning_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Reasoning { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

/// SSE response body for wiremock.
pub fn sse_body(name: &str) -> String {
    load_fixture(name)
}
