//! LLM provider seam.
//!
//! A provider turns a prompt plus a JSON Schema into a JSON value shaped
//! by that schema. HTTP transport, authentication and retries live in
//! the implementations, which the embedding application supplies.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Result;

pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

/// Structured answer plus what it cost
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Value,
    pub usage: TokenUsage,
}

impl LlmResponse {
    /// Response whose token usage the provider did not report
    pub fn new(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = TokenUsage {
            input_tokens,
            output_tokens,
        };
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a value conforming to `schema`
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_defaults_to_zero() {
        let response = LlmResponse::new(json!({"summary": "Lists pets"}));
        assert_eq!(response.usage.total(), 0);

        let response = response.with_usage(120, 30);
        assert_eq!(response.usage.total(), 150);
        assert_eq!(response.content["summary"], "Lists pets");
    }

    #[test]
    fn test_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 1,
        };
        assert_eq!(usage.total(), u32::MAX);
    }
}
