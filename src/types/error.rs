//! Unified Error Type System
//!
//! Centralized error types for the whole pipeline.
//!
//! ## Error Taxonomy
//!
//! - **UnsupportedSourceType**: no parser registered for a type tag (returned as data)
//! - **ParseError**: malformed input for a given parser (returned as data)
//! - **UnresolvedReference**: dangling schema reference (warning data, never raised)
//! - **CacheError**: persistence backend failure, degraded to a cache miss
//! - **AiServiceError**: per-item AI collaborator failure, isolated per batch item
//! - **DiffError**: malformed AST handed to the diff engine
//!
//! Only programming-contract violations surface as `Err(DocGenError)`; everything
//! per-input is captured in result structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// AI Service Errors
// =============================================================================

/// Error categories for AI collaborator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limited by the provider
    RateLimit,
    /// Call exceeded its time allowance
    Timeout,
    /// Provider unreachable or not installed
    Unavailable,
    /// Provider answered but the payload was unusable
    BadResponse,
    /// Request refused (auth, invalid input)
    Rejected,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadResponse => write!(f, "BAD_RESPONSE"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether a caller layering retries on top may try the same item again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::Unavailable | Self::BadResponse
        )
    }
}

/// Failure reported by the AI collaborator for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiServiceError {
    pub category: ErrorCategory,
    pub message: String,
    /// Provider that produced the error, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl std::fmt::Display for AiServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for AiServiceError {}

impl AiServiceError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    /// Add provider context to an existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn timeout(operation: &str, duration: Duration) -> Self {
        Self::new(
            ErrorCategory::Timeout,
            format!("{} timed out after {:?}", operation, duration),
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

/// Maps free-form provider error messages onto categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(message: &str, provider: &str) -> AiServiceError {
        let lower = message.to_lowercase();

        let category = if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
        {
            ErrorCategory::RateLimit
        } else if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCategory::Timeout
        } else if lower.contains("503")
            || lower.contains("502")
            || lower.contains("unavailable")
            || lower.contains("connection")
            || lower.contains("not installed")
        {
            ErrorCategory::Unavailable
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("api key")
            || lower.contains("bad request")
        {
            ErrorCategory::Rejected
        } else if lower.contains("parse") || lower.contains("json") || lower.contains("schema")
        {
            ErrorCategory::BadResponse
        } else {
            ErrorCategory::Unknown
        };

        AiServiceError::new(category, message).provider(provider)
    }
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Persistence backend failure. The `Cache` facade degrades these to misses.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

// =============================================================================
// Diff Errors
// =============================================================================

/// Which side of a comparison an AST came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstSide {
    Old,
    New,
}

impl std::fmt::Display for AstSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Old => write!(f, "old"),
            Self::New => write!(f, "new"),
        }
    }
}

/// Malformed AST input to the diff engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("{side} AST: endpoint #{index} ({method}) has an empty path")]
    EmptyPath {
        side: AstSide,
        index: usize,
        method: String,
    },

    #[error("{side} AST: duplicate endpoint {locator}")]
    DuplicateEndpoint { side: AstSide, locator: String },

    #[error("{side} AST: schema stored under '{key}' is named '{name}'")]
    SchemaNameMismatch {
        side: AstSide,
        key: String,
        name: String,
    },
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocGenError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported source type: {0}")]
    UnsupportedSourceType(String),

    #[error("Parse error in {source_type}: {message}")]
    Parse {
        source_type: String,
        message: String,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("AI service error: {0}")]
    AiService(#[from] AiServiceError),

    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

pub type Result<T> = std::result::Result<T, DocGenError>;

impl DocGenError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn parse(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_type: source_type.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Timeout.to_string(), "TIMEOUT");
        assert_eq!(ErrorCategory::BadResponse.to_string(), "BAD_RESPONSE");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(!ErrorCategory::Rejected.is_retryable());
        assert!(!ErrorCategory::Unknown.is_retryable());
    }

    #[test]
    fn test_classify_messages() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.provider.as_deref(), Some("openai"));

        let err = ErrorClassifier::classify("Request timed out after 30s", "ollama");
        assert_eq!(err.category, ErrorCategory::Timeout);

        let err = ErrorClassifier::classify("Invalid API key provided", "openai");
        assert_eq!(err.category, ErrorCategory::Rejected);

        let err = ErrorClassifier::classify("Failed to parse JSON output", "claude");
        assert_eq!(err.category, ErrorCategory::BadResponse);

        let err = ErrorClassifier::classify("Something weird happened", "test");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_ai_service_error_display() {
        let err = AiServiceError::new(ErrorCategory::RateLimit, "Too many requests")
            .provider("openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err = AiServiceError::new(ErrorCategory::Unavailable, "Connection refused");
        assert_eq!(err.to_string(), "[UNAVAILABLE] Connection refused");
    }

    #[test]
    fn test_diff_error_display() {
        let err = DiffError::DuplicateEndpoint {
            side: AstSide::New,
            locator: "GET /users".to_string(),
        };
        assert_eq!(err.to_string(), "new AST: duplicate endpoint GET /users");
    }

    #[test]
    fn test_conversions_into_app_error() {
        let err: DocGenError = AiServiceError::new(ErrorCategory::Unknown, "boom").into();
        assert!(matches!(err, DocGenError::AiService(_)));

        let err: DocGenError = CacheError::Backend("disk full".to_string()).into();
        assert!(err.to_string().contains("disk full"));
    }
}
