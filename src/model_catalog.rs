//! Model capability catalog.
//!
//! Resolution is exact match first, then the first entry whose key prefixes the
//! model name, else [`CapabilityRecord::DEFAULT`]. Entries are kept in an
//! ordered list so that more specific keys (`gpt-5.2`) are consulted before
//! generic prefixes (`gpt-5`) that would also match.

use crate::types::{CapabilityRecord, PartialCapability};

/// Ordered `(model key, partial record)` table.
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: Vec<(String, PartialCapability)>,
    default: CapabilityRecord,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::azure_openai()
    }
}

impl CapabilityTable {
    /// Empty table resolving everything to `default`.
    pub fn new(default: CapabilityRecord) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Append an entry. Later entries lose prefix ties against earlier ones.
    pub fn with_entry(mut self, key: impl Into<String>, record: PartialCapability) -> Self {
        self.entries
            .push((key.into().trim().to_ascii_lowercase(), record));
        self
    }

    /// Built-in catalog of Azure OpenAI model families.
    pub fn azure_openai() -> Self {
        AZURE_OPENAI_MODELS.iter().fold(
            Self::new(CapabilityRecord::DEFAULT),
            |table, (key, record)| table.with_entry(*key, *record),
        )
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &PartialCapability)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn default_record(&self) -> CapabilityRecord {
        self.default
    }

    /// Resolve a model or deployment name. Total: never fails.
    pub fn resolve(&self, model_name: &str) -> CapabilityRecord {
        let name = model_name.trim().to_ascii_lowercase();

        if let Some((_, record)) = self.entries.iter().find(|(key, _)| *key == name) {
            return self.default.merged_with(record);
        }
        if let Some((key, record)) = self
            .entries
            .iter()
            .find(|(key, _)| !key.is_empty() && name.starts_with(key.as_str()))
        {
            tracing::trace!(model = %model_name, prefix = %key, "capability resolved by prefix");
            return self.default.merged_with(record);
        }
        tracing::debug!(model = %model_name, "no capability entry matched; using defaults");
        self.default
    }
}

const fn model() -> PartialCapability {
    PartialCapability::new()
}

// Order matters: specific keys precede the shorter prefixes that also match them.
const AZURE_OPENAI_MODELS: &[(&str, PartialCapability)] = &[
    (
        "gpt-5.2",
        model()
            .tokens(400_000, 128_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.75, 14.0),
    ),
    (
        "gpt-5.1",
        model()
            .tokens(400_000, 128_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.25, 10.0),
    ),
    (
        "gpt-5-chat",
        model()
            .tokens(128_000, 16_384)
            .images(true)
            .prompt_cache(true)
            .reasoning(false)
            .prices(1.25, 10.0),
    ),
    (
        "gpt-5-mini",
        model()
            .tokens(400_000, 128_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(0.25, 2.0),
    ),
    (
        "gpt-5-nano",
        model()
            .tokens(400_000, 128_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(0.05, 0.4),
    ),
    (
        "gpt-5",
        model()
            .tokens(400_000, 128_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.25, 10.0),
    ),
    (
        "gpt-4.1-mini",
        model()
            .tokens(1_047_576, 32_768)
            .images(true)
            .prompt_cache(true)
            .prices(0.4, 1.6),
    ),
    (
        "gpt-4.1-nano",
        model()
            .tokens(1_047_576, 32_768)
            .images(true)
            .prompt_cache(true)
            .prices(0.1, 0.4),
    ),
    (
        "gpt-4.1",
        model()
            .tokens(1_047_576, 32_768)
            .images(true)
            .prompt_cache(true)
            .prices(2.0, 8.0),
    ),
    (
        "gpt-4o-mini",
        model()
            .tokens(128_000, 16_384)
            .images(true)
            .prompt_cache(true)
            .prices(0.15, 0.6),
    ),
    (
        "gpt-4o",
        model()
            .tokens(128_000, 16_384)
            .images(true)
            .prompt_cache(true)
            .prices(2.5, 10.0),
    ),
    (
        "gpt-4-turbo",
        model().tokens(128_000, 4_096).images(true).prices(10.0, 30.0),
    ),
    ("gpt-4", model().tokens(8_192, 4_096).prices(30.0, 60.0)),
    ("gpt-35-turbo", model().tokens(16_385, 4_096).prices(0.5, 1.5)),
    (
        "o4-mini",
        model()
            .tokens(200_000, 100_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.1, 4.4),
    ),
    (
        "o3-mini",
        model()
            .tokens(200_000, 100_000)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.1, 4.4),
    ),
    (
        "o3",
        model()
            .tokens(200_000, 100_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(2.0, 8.0),
    ),
    (
        "o1-mini",
        model()
            .tokens(128_000, 65_536)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.1, 4.4),
    ),
    (
        "o1",
        model()
            .tokens(200_000, 100_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(15.0, 60.0),
    ),
    (
        "codex-mini",
        model()
            .tokens(200_000, 100_000)
            .images(true)
            .prompt_cache(true)
            .reasoning(true)
            .prices(1.5, 6.0),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_merged_over_defaults() {
        let table = CapabilityTable::azure_openai();
        let r = table.resolve("o1-mini");
        assert!(r.supports_reasoning);
        assert!(!r.supports_images);
        assert_eq!(r.max_output_tokens, 65_536);
        assert_eq!(r.input_price_per_mtok, 1.1);
    }

    #[test]
    fn every_catalog_key_resolves_to_its_own_entry() {
        let table = CapabilityTable::azure_openai();
        for (key, partial) in table.entries() {
            let expected = CapabilityRecord::DEFAULT.merged_with(partial);
            assert_eq!(table.resolve(key), expected, "key {key}");
        }
    }

    #[test]
    fn specific_prefix_wins_over_generic() {
        let table = CapabilityTable::azure_openai();
        assert_eq!(table.resolve("gpt-5.2-2025-12-11").input_price_per_mtok, 1.75);
        assert_eq!(table.resolve("gpt-5-2025-08-07").input_price_per_mtok, 1.25);
        assert!(!table.resolve("gpt-5-chat-latest").supports_reasoning);
        assert_eq!(table.resolve("gpt-4o-mini-2024-07-18").input_price_per_mtok, 0.15);
        assert_eq!(table.resolve("gpt-4o-2024-11-20").input_price_per_mtok, 2.5);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = CapabilityTable::azure_openai();
        assert!(table.resolve("O3-MINI").supports_reasoning);
    }

    #[test]
    fn unknown_model_gets_default_record() {
        let table = CapabilityTable::azure_openai();
        assert_eq!(table.resolve("my-custom-llama"), CapabilityRecord::DEFAULT);
        assert_eq!(table.resolve(""), CapabilityRecord::DEFAULT);
    }

    #[test]
    fn insertion_order_decides_prefix_ties() {
        let table = CapabilityTable::new(CapabilityRecord::DEFAULT)
            .with_entry("foo", PartialCapability::new().tokens(1, 1))
            .with_entry("foo-bar", PartialCapability::new().tokens(2, 2));
        assert_eq!(table.resolve("foo-bar-baz").context_window_tokens, 1);
        assert_eq!(table.resolve("foo-bar").context_window_tokens, 2);
    }
}
