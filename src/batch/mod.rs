//! Batch Processing
//!
//! Runs summarize / enhance / validate items against the AI collaborator
//! under a concurrency bound and a failure strategy.
//!
//! ## Sections
//!
//! - `BatchItem` / `Batch`: immutable input, validated on construction
//! - `BatchOptions` / `FailureStrategy`: how the run behaves
//! - `ItemOutcome` / `BatchResult`: the append-only ledger and its rollup
//! - [`BatchOrchestrator`]: executes a batch

mod orchestrator;

pub use orchestrator::BatchOrchestrator;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::{AiRequest, AiResponse, ItemKind};
use crate::constants::batch as batch_constants;
use crate::types::{AiServiceError, DocGenError, Result, content_id};

// =============================================================================
// Input
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Unique within its batch
    pub id: String,
    pub kind: ItemKind,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, kind: ItemKind, payload: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }

    pub fn request(&self) -> AiRequest {
        AiRequest {
            kind: self.kind,
            payload: self.payload.clone(),
            context: self.context.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStrategy {
    /// Isolate failures and keep going
    #[default]
    Continue,
    /// Stop admitting new items after the first failure
    Abort,
}

impl fmt::Display for FailureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FailureStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "Unknown failure strategy: {}. Supported: continue, abort",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    pub failure_strategy: FailureStrategy,
    pub item_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: batch_constants::DEFAULT_MAX_CONCURRENCY,
            failure_strategy: FailureStrategy::Continue,
            item_timeout: None,
        }
    }
}

impl BatchOptions {
    pub fn new(max_concurrency: usize, failure_strategy: FailureStrategy) -> Self {
        Self {
            max_concurrency,
            failure_strategy,
            item_timeout: None,
        }
    }

    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }
}

/// A validated, immutable batch
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    items: Vec<BatchItem>,
    options: BatchOptions,
}

impl Batch {
    /// Validate and freeze a batch.
    ///
    /// Fails with `InvalidBatch` on an empty or duplicate item id, or a
    /// concurrency bound of zero. An empty item list is valid.
    pub fn new(items: Vec<BatchItem>, options: BatchOptions) -> Result<Self> {
        if options.max_concurrency == 0 {
            return Err(DocGenError::InvalidBatch(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(DocGenError::InvalidBatch(format!(
                    "item #{} has an empty id",
                    index
                )));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(DocGenError::InvalidBatch(format!(
                    "duplicate item id '{}'",
                    item.id
                )));
            }
        }

        let fingerprint: Vec<String> = items
            .iter()
            .map(|item| format!("{}:{}", item.kind, item.id))
            .collect();
        let id = content_id("batch", fingerprint.join("\n").as_bytes());

        Ok(Self { id, items, options })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Failed,
    Cancelled,
}

/// Recorded exactly once per item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub id: String,
    pub kind: ItemKind,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AiResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AiServiceError>,
    pub elapsed_ms: u64,
}

impl ItemOutcome {
    pub(crate) fn success(item: &BatchItem, response: AiResponse, elapsed: Duration) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            status: ItemStatus::Success,
            result: Some(response),
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub(crate) fn failed(item: &BatchItem, error: AiServiceError, elapsed: Duration) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            status: ItemStatus::Failed,
            result: None,
            error: Some(error),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub(crate) fn cancelled(item: &BatchItem) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            status: ItemStatus::Cancelled,
            result: None,
            error: None,
            elapsed_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Partial,
    Failed,
}

/// Final ledger of a batch run. Counts are derived from the outcomes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    batch_id: String,
    status: BatchStatus,
    total_items: usize,
    success_count: usize,
    failure_count: usize,
    cancelled_count: usize,
    processing_time_ms: u64,
    /// Submission order
    outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub(crate) fn from_ledger(
        batch_id: &str,
        strategy: FailureStrategy,
        outcomes: Vec<ItemOutcome>,
        processing_time: Duration,
    ) -> Self {
        let count = |status: ItemStatus| outcomes.iter().filter(|o| o.status == status).count();
        let success_count = count(ItemStatus::Success);
        let failure_count = count(ItemStatus::Failed);
        let cancelled_count = count(ItemStatus::Cancelled);

        let status = if failure_count == 0 {
            BatchStatus::Success
        } else if strategy == FailureStrategy::Abort || success_count == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        };

        Self {
            batch_id: batch_id.to_string(),
            status,
            total_items: outcomes.len(),
            success_count,
            failure_count,
            cancelled_count,
            processing_time_ms: processing_time.as_millis() as u64,
            outcomes,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled_count
    }

    pub fn processing_time(&self) -> Duration {
        Duration::from_millis(self.processing_time_ms)
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, id: &str) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}
