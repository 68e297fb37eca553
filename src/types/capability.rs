//! Model capability records

use serde::{Deserialize, Serialize};

/// Static descriptor of what a model or deployment supports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRecord {
    pub max_output_tokens: u32,
    pub context_window_tokens: u32,
    pub supports_images: bool,
    pub supports_prompt_cache: bool,
    pub supports_reasoning: bool,
    /// USD per million input tokens.
    pub input_price_per_mtok: f64,
    /// USD per million output tokens.
    pub output_price_per_mtok: f64,
}

impl CapabilityRecord {
    /// Record used when nothing in the catalog matches: small context, no
    /// image/cache/reasoning support, zero price.
    pub const DEFAULT: Self = Self {
        max_output_tokens: 4_096,
        context_window_tokens: 8_192,
        supports_images: false,
        supports_prompt_cache: false,
        supports_reasoning: false,
        input_price_per_mtok: 0.0,
        output_price_per_mtok: 0.0,
    };

    /// Overlay `partial` onto this record.
    pub fn merged_with(self, partial: &PartialCapability) -> Self {
        Self {
            max_output_tokens: partial.max_output_tokens.unwrap_or(self.max_output_tokens),
            context_window_tokens: partial
                .context_window_tokens
                .unwrap_or(self.context_window_tokens),
            supports_images: partial.supports_images.unwrap_or(self.supports_images),
            supports_prompt_cache: partial
                .supports_prompt_cache
                .unwrap_or(self.supports_prompt_cache),
            supports_reasoning: partial.supports_reasoning.unwrap_or(self.supports_reasoning),
            input_price_per_mtok: partial
                .input_price_per_mtok
                .unwrap_or(self.input_price_per_mtok),
            output_price_per_mtok: partial
                .output_price_per_mtok
                .unwrap_or(self.output_price_per_mtok),
        }
    }

    pub fn has_pricing(&self) -> bool {
        self.input_price_per_mtok > 0.0 || self.output_price_per_mtok > 0.0
    }
}

impl Default for CapabilityRecord {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Partial capability data as stored in catalogs and caller overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCapability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_images: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_prompt_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_reasoning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price_per_mtok: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price_per_mtok: Option<f64>,
}

impl PartialCapability {
    pub const fn new() -> Self {
        Self {
            max_output_tokens: None,
            context_window_tokens: None,
            supports_images: None,
            supports_prompt_cache: None,
            supports_reasoning: None,
            input_price_per_mtok: None,
            output_price_per_mtok: None,
        }
    }

    pub const fn tokens(mut self, context_window: u32, max_output: u32) -> Self {
        self.context_window_tokens = Some(context_window);
        self.max_output_tokens = Some(max_output);
        self
    }

    pub const fn images(mut self, supported: bool) -> Self {
        self.supports_images = Some(supported);
        self
    }

    pub const fn prompt_cache(mut self, supported: bool) -> Self {
        self.supports_prompt_cache = Some(supported);
        self
    }

    pub const fn reasoning(mut self, supported: bool) -> Self {
        self.supports_reasoning = Some(supported);
        self
    }

    pub const fn prices(mut self, input_per_mtok: f64, output_per_mtok: f64) -> Self {
        self.input_price_per_mtok = Some(input_per_mtok);
        self.output_price_per_mtok = Some(output_per_mtok);
        self
    }
}
