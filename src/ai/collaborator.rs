//! Adapter from a structured-output LLM provider to the collaborator contract.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::prompt::PromptTemplates;
use super::provider::SharedProvider;
use super::timeout::with_timeout;
use super::{AiCollaborator, AiRequest, AiResponse};
use crate::constants::ai as ai_constants;
use crate::types::{AiServiceError, DocGenError, ErrorCategory, ErrorClassifier};

/// Builds a kind-specific prompt and schema, calls the provider, and checks
/// that the answer carries the field the kind requires.
pub struct ProviderCollaborator {
    provider: SharedProvider,
    request_timeout: Option<Duration>,
}

impl ProviderCollaborator {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            request_timeout: None,
        }
    }

    /// Bound every provider call
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn service_error(&self, error: DocGenError) -> AiServiceError {
        let provider = self.provider.name();
        match error {
            DocGenError::AiService(err) if err.provider.is_some() => err,
            DocGenError::AiService(err) => err.provider(provider),
            timeout @ DocGenError::Timeout { .. } => {
                AiServiceError::new(ErrorCategory::Timeout, timeout.to_string()).provider(provider)
            }
            other => ErrorClassifier::classify(&other.to_string(), provider),
        }
    }
}

#[async_trait]
impl AiCollaborator for ProviderCollaborator {
    async fn process(&self, request: &AiRequest) -> Result<AiResponse, AiServiceError> {
        let started = Instant::now();
        let (prompt, schema) = PromptTemplates::for_request(request);

        let call = self.provider.generate(&prompt, &schema);
        let response = match self.request_timeout {
            Some(timeout) => with_timeout(timeout, call, "LLM request").await,
            None => call.await,
        }
        .map_err(|e| self.service_error(e))?;

        let field = PromptTemplates::required_field(request.kind);
        if response.content.get(field).is_none() {
            return Err(AiServiceError::new(
                ErrorCategory::BadResponse,
                format!("{} response is missing '{}'", request.kind, field),
            )
            .provider(self.provider.name()));
        }

        let confidence = response
            .content
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.clamp(0.0, 1.0) as f32)
            .unwrap_or(ai_constants::DEFAULT_CONFIDENCE);

        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            kind = %request.kind,
            tokens = response.usage.total(),
            "collaborator call completed"
        );

        Ok(AiResponse {
            result: response.content,
            confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
