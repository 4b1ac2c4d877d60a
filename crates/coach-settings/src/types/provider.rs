//! Downstream model provider settings.

use serde::{Deserialize, Serialize};

/// Model identity and token window. Defines the context budget ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Model identifier, e.g. `openai/gpt-4o-mini`.
    pub model: String,
    /// Total context window in tokens.
    pub max_context_tokens: u32,
    /// Tokens reserved for the model's answer.
    pub max_output_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_owned(),
            max_context_tokens: 32_768,
            max_output_tokens: 2048,
        }
    }
}
