//! AI Integration Layer
//!
//! The batch orchestrator talks to AI through one seam, [`AiCollaborator`]:
//! a request of a given kind goes in, a structured result (or an
//! `AiServiceError`) comes out. [`ProviderCollaborator`] implements it on top
//! of any structured-output [`LlmProvider`].

pub mod collaborator;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use collaborator::ProviderCollaborator;
pub use prompt::{PromptBuilder, PromptSection, PromptTemplates};
pub use provider::{LlmProvider, LlmResponse, SharedProvider, TokenUsage};
pub use timeout::{with_item_timeout, with_timeout};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::AiServiceError;

// =============================================================================
// Request / Response
// =============================================================================

/// What the collaborator is asked to do with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Summarize,
    Enhance,
    Validate,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Enhance => "enhance",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summarize" => Ok(Self::Summarize),
            "enhance" => Ok(Self::Enhance),
            "validate" => Ok(Self::Validate),
            other => Err(format!(
                "Unknown item kind: {}. Supported: summarize, enhance, validate",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub kind: ItemKind,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl AiRequest {
    pub fn new(kind: ItemKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub result: Value,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub processing_time_ms: u64,
}

// =============================================================================
// Collaborator Contract
// =============================================================================

/// External AI collaborator. Every item kind delegates here.
#[async_trait]
pub trait AiCollaborator: Send + Sync {
    async fn process(&self, request: &AiRequest) -> Result<AiResponse, AiServiceError>;

    /// Name for logs
    fn name(&self) -> &str;
}

pub type SharedCollaborator = Arc<dyn AiCollaborator>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_roundtrip() {
        for kind in [ItemKind::Summarize, ItemKind::Enhance, ItemKind::Validate] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
        assert!("translate".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_item_kind_serde() {
        let json = serde_json::to_string(&ItemKind::Summarize).unwrap();
        assert_eq!(json, "\"summarize\"");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = AiResponse {
            result: serde_json::json!({"summary": "List pets"}),
            confidence: 0.9,
            processing_time_ms: 12,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["processingTimeMs"], 12);
    }
}
