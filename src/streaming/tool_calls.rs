//! Tool-call reassembly
//!
//! Providers stream a tool call as index-addressed fragments spread over many
//! chunks. Each index moves `Empty -> Accumulating -> Complete` exactly once.
//! An index is closed when a fragment for a different index arrives, or when
//! the stream ends. Arguments are concatenated verbatim and parsed only on
//! closure.

use std::collections::{BTreeMap, HashSet};

use crate::types::{CompletedToolCall, StreamEvent};

/// One partial tool call as found in a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    argument_buffer: String,
}

impl PendingToolCall {
    fn apply(&mut self, fragment: &ToolCallFragment) {
        if let Some(id) = fragment.id.as_deref() {
            merge_label(&mut self.id, id);
        }
        if let Some(name) = fragment.name.as_deref() {
            merge_label(&mut self.name, name);
        }
        if let Some(args) = fragment.arguments.as_deref() {
            self.argument_buffer.push_str(args);
        }
    }
}

// Some gateways repeat the full id/name on every fragment, others split them.
fn merge_label(current: &mut String, fragment: &str) {
    if current.is_empty() {
        current.push_str(fragment);
    } else if current != fragment {
        current.push_str(fragment);
    }
}

/// Per-request accumulator. Never shared between requests.
#[derive(Debug, Default)]
pub struct ToolCallReassembler {
    pending: BTreeMap<u32, PendingToolCall>,
    active: Option<u32>,
    completed: HashSet<u32>,
}

impl ToolCallReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment; returns the events it produces, in order.
    pub fn push(&mut self, fragment: ToolCallFragment) -> Vec<StreamEvent> {
        let fragment = ToolCallFragment {
            id: non_empty(fragment.id),
            name: non_empty(fragment.name),
            arguments: non_empty(fragment.arguments),
            ..fragment
        };
        let index = fragment.index;

        if self.completed.contains(&index) {
            tracing::warn!(
                index,
                "tool-call fragment arrived after its call was closed; ignoring"
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(active) = self.active
            && active != index
            && let Some(done) = self.close(active)
        {
            events.push(done);
        }

        let pending = self.pending.entry(index).or_insert_with(|| {
            tracing::debug!(index, "tool call started");
            PendingToolCall::default()
        });
        pending.apply(&fragment);
        self.active = Some(index);

        events.push(StreamEvent::ToolCallDelta {
            index,
            id_fragment: fragment.id,
            name_fragment: fragment.name,
            argument_fragment: fragment.arguments,
        });
        events
    }

    /// Close every open accumulator, lowest index first.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.active = None;
        let open: Vec<u32> = self.pending.keys().copied().collect();
        open.into_iter().filter_map(|i| self.close(i)).collect()
    }

    /// Pick the index for a fragment whose chunk carried none.
    ///
    /// An `id` different from the active call's starts a new call; anything
    /// else continues the active call. `position` in the chunk's array is
    /// only used while no call is open.
    pub fn index_for_unindexed(&self, id: Option<&str>, position: u32) -> u32 {
        let Some(active) = self.active else {
            return self.next_free_index(position);
        };
        let id = id.filter(|s| !s.is_empty());
        match (id, self.pending.get(&active)) {
            (Some(id), Some(call)) if !call.id.is_empty() && call.id != id => {
                self.next_free_index(active.saturating_add(1))
            }
            _ => active,
        }
    }

    fn next_free_index(&self, from: u32) -> u32 {
        let mut index = from;
        while self.pending.contains_key(&index) || self.completed.contains(&index) {
            index = index.saturating_add(1);
        }
        index
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn close(&mut self, index: u32) -> Option<StreamEvent> {
        let call = self.pending.remove(&index)?;
        if self.active == Some(index) {
            self.active = None;
        }
        self.completed.insert(index);

        let id = if call.id.is_empty() {
            let synthesized = format!("call_{}", uuid::Uuid::new_v4().simple());
            tracing::debug!(index, id = %synthesized, "tool call had no id; synthesized one");
            synthesized
        } else {
            call.id
        };
        if call.name.is_empty() {
            tracing::warn!(index, id = %id, "tool call closed without a function name");
        }

        let parsed_arguments = if call.argument_buffer.trim().is_empty() {
            Some(serde_json::Value::Object(serde_json::Map::new()))
        } else {
            match serde_json::from_str::<serde_json::Value>(&call.argument_buffer) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(index, id = %id, error = %e, "tool call arguments are not valid JSON");
                    None
                }
            }
        };

        Some(StreamEvent::ToolCallComplete(CompletedToolCall {
            index,
            id,
            name: call.name,
            arguments: call.argument_buffer,
            parsed_arguments,
        }))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    fn frag(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            arguments: args.map(str::to_string),
        }
    }

    fn completions(events: &[StreamEvent]) -> Vec<CompletedToolCall> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolCallComplete(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn three_fragments_make_one_call() {
        let mut r = ToolCallReassembler::new();
        let mut events = Vec::new();
        events.extend(r.push(frag(0, Some("call_1"), Some("get_weather"), Some("{\"ci"))));
        events.extend(r.push(frag(0, None, None, Some("ty\":\"Par"))));
        events.extend(r.push(frag(0, None, None, Some("is\"}"))));
        assert!(completions(&events).is_empty());
        events.extend(r.finish());

        let done = completions(&events);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "call_1");
        assert_eq!(done[0].name, "get_weather");
        assert_eq!(done[0].arguments, "{\"city\":\"Paris\"}");
        assert_eq!(done[0].parsed_arguments, Some(serde_json::json!({"city": "Paris"})));
    }

    #[test]
    fn new_index_closes_previous_call() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(0, Some("a"), Some("first"), Some("{}")));
        let events = r.push(frag(1, Some("b"), Some("second"), Some("{")));

        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::ToolCallComplete(c) => assert_eq!(c.id, "a"),
            other => panic!("expected completion first, got {other:?}"),
        }
        assert!(matches!(events[1], StreamEvent::ToolCallDelta { index: 1, .. }));
    }

    #[test]
    #[traced_test]
    fn fragments_after_closure_are_ignored() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(0, Some("a"), Some("first"), Some("{}")));
        r.push(frag(1, Some("b"), Some("second"), Some("{}")));
        let late = r.push(frag(0, None, None, Some("garbage")));
        assert!(late.is_empty());

        let done = completions(&r.finish());
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "b");
        assert!(logs_contain("after its call was closed"));
    }

    #[test]
    fn malformed_arguments_are_delivered_not_dropped() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(0, Some("a"), Some("broken"), Some("{\"x\": ")));
        let done = completions(&r.finish());
        assert_eq!(done.len(), 1);
        assert!(done[0].is_malformed());
        assert_eq!(done[0].arguments, "{\"x\": ");
    }

    #[test]
    fn missing_id_is_synthesized_and_empty_args_parse_as_object() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(2, None, Some("now"), None));
        let done = completions(&r.finish());
        assert!(done[0].id.starts_with("call_"));
        assert_eq!(done[0].parsed_arguments, Some(serde_json::json!({})));
    }

    #[test]
    fn repeated_full_id_is_not_duplicated() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(0, Some("call_9"), Some("f"), Some("{")));
        r.push(frag(0, Some("call_9"), None, Some("}")));
        let done = completions(&r.finish());
        assert_eq!(done[0].id, "call_9");
    }

    #[test]
    fn finish_is_idempotent() {
        let mut r = ToolCallReassembler::new();
        r.push(frag(0, Some("a"), Some("f"), Some("{}")));
        assert_eq!(completions(&r.finish()).len(), 1);
        assert!(r.finish().is_empty());
        assert!(!r.has_pending());
    }

    #[test]
    fn unindexed_fragments_split_on_new_id() {
        let mut r = ToolCallReassembler::new();
        let first = r.index_for_unindexed(Some("call_a"), 0);
        assert_eq!(first, 0);
        r.push(frag(first, Some("call_a"), Some("get_weather"), Some("{")));

        // Continuation without an id, and a repeat of the same id.
        assert_eq!(r.index_for_unindexed(None, 0), 0);
        assert_eq!(r.index_for_unindexed(Some("call_a"), 0), 0);

        let second = r.index_for_unindexed(Some("call_b"), 0);
        assert_eq!(second, 1);
        r.push(frag(second, Some("call_b"), Some("get_time"), Some("{}")));
        assert_eq!(r.index_for_unindexed(Some("call_c"), 0), 2);
    }

    proptest! {
        #[test]
        fn arbitrary_three_way_split_reassembles(a in 0usize..=40, b in 0usize..=40) {
            let args = r#"{"query":"rust streaming","limit":10,"ok":true}"#;
            let (lo, hi) = (a.min(b).min(args.len()), a.max(b).min(args.len()));
            let parts = [&args[..lo], &args[lo..hi], &args[hi..]];

            let mut r = ToolCallReassembler::new();
            let mut events = Vec::new();
            for (i, part) in parts.iter().enumerate() {
                let id = (i == 0).then_some("call_p");
                let name = (i == 0).then_some("search");
                events.extend(r.push(frag(0, id, name, Some(part))));
            }
            events.extend(r.finish());

            let done = completions(&events);
            prop_assert_eq!(done.len(), 1);
            prop_assert_eq!(done[0].arguments.as_str(), args);
            prop_assert!(!done[0].is_malformed());
        }
    }
}
