//! Cached parsing and AST enhancement.
//!
//! ## Sections
//!
//! - `parse`: registry dispatch memoized by content key. Concurrent
//!   requests for the same key wait on one in-flight parse instead of all
//!   parsing (single flight).
//! - `enhance_ast`: endpoints go through the batch orchestrator as
//!   `enhance` items; results are cached per endpoint and applied
//!   copy-on-write to a new AST.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ai::ItemKind;
use crate::ast::{CanonicalAst, EndpointKey};
use crate::batch::{Batch, BatchItem, BatchOptions, BatchOrchestrator, BatchResult, ItemStatus};
use crate::cache::{Cache, CacheKey};
use crate::parser::{ParseRequest, ParseResult, ParserRegistry};
use crate::types::{IdAllocator, Result};

/// Outcome of [`Pipeline::enhance_ast`]
#[derive(Debug, Clone)]
pub struct Enhancement {
    /// New AST; endpoints without an enhancement are shared with the input
    pub ast: CanonicalAst,
    /// Ledger of the items that actually ran
    pub batch: BatchResult,
    /// Endpoints served from the cache without calling the collaborator
    pub cached: usize,
}

pub struct Pipeline {
    registry: Arc<ParserRegistry>,
    cache: Cache,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    item_ids: IdAllocator,
    result_ttl: Option<Duration>,
}

impl Pipeline {
    pub fn new(registry: Arc<ParserRegistry>, cache: Cache) -> Self {
        Self {
            registry,
            cache,
            in_flight: DashMap::new(),
            item_ids: IdAllocator::new("item"),
            result_ttl: None,
        }
    }

    /// TTL for cached parse and enhancement results (cache default otherwise)
    pub fn with_result_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Parse through the cache. Only successful results are stored.
    pub async fn parse(&self, request: &ParseRequest) -> ParseResult {
        let Some(bytes) = request.source.bytes() else {
            return self.registry.parse(request);
        };
        if !self.registry.is_supported(&request.type_tag) {
            return self.registry.parse(request);
        }

        let key = CacheKey::derive(&request.type_tag, bytes, request.config.as_ref());
        if let Some(hit) = self.cached_parse(&key, request).await {
            debug!(key = %key, "parse served from cache");
            return hit;
        }

        let gate = self
            .in_flight
            .entry(key.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock().await;

        // Whoever held the gate before us may have filled the cache
        if let Some(hit) = self.cached_parse(&key, request).await {
            self.in_flight.remove(key.as_str());
            return hit;
        }

        let result = self.registry.parse(request);
        if result.is_success() {
            self.cache.set_json(&key, &result, self.result_ttl).await;
        }
        self.in_flight.remove(key.as_str());
        result
    }

    /// Same bytes under another path share the entry; the origin is the caller's
    async fn cached_parse(&self, key: &CacheKey, request: &ParseRequest) -> Option<ParseResult> {
        let mut hit = self.cache.get_json::<ParseResult>(key).await?;
        hit.origin = request.source.origin();
        Some(hit)
    }

    /// Parse several inputs; failures stay isolated per input
    pub async fn parse_many(&self, requests: &[ParseRequest]) -> Vec<ParseResult> {
        futures::future::join_all(requests.iter().map(|r| self.parse(r))).await
    }

    /// Enhance every endpoint of `ast` through `orchestrator`.
    ///
    /// Endpoints with a cached enhancement skip the batch. Failed items
    /// leave their endpoint untouched; the ledger records why.
    pub async fn enhance_ast(
        &self,
        ast: &CanonicalAst,
        orchestrator: &BatchOrchestrator,
        options: BatchOptions,
        context: Option<Value>,
    ) -> Result<Enhancement> {
        let mut enhancements: HashMap<EndpointKey, String> = HashMap::new();
        let mut pending: HashMap<String, (EndpointKey, CacheKey)> = HashMap::new();
        let mut items = Vec::new();
        let mut cached = 0;

        for endpoint in ast.endpoints() {
            let key = CacheKey::enhancement(endpoint, context.as_ref())?;
            if let Some(text) = self.cache.get_json::<String>(&key).await {
                enhancements.insert(endpoint.key(), text);
                cached += 1;
                continue;
            }
            let id = self.item_ids.next_id();
            let payload = serde_json::to_value(endpoint.as_ref())?;
            items.push(BatchItem::new(id.clone(), ItemKind::Enhance, payload).with_context(context.clone()));
            pending.insert(id, (endpoint.key(), key));
        }

        let batch = Batch::new(items, options)?;
        let result = orchestrator.run(&batch).await;

        for outcome in result.outcomes() {
            if outcome.status != ItemStatus::Success {
                continue;
            }
            let Some((endpoint_key, cache_key)) = pending.remove(&outcome.id) else {
                continue;
            };
            let Some(text) = outcome
                .result
                .as_ref()
                .and_then(|r| r.result.get("description"))
                .and_then(Value::as_str)
            else {
                warn!(
                    item = %outcome.id,
                    endpoint = %endpoint_key,
                    "enhance result has no 'description' string; endpoint left unchanged"
                );
                continue;
            };
            self.cache.set_json(&cache_key, &text, self.result_ttl).await;
            enhancements.insert(endpoint_key, text.to_string());
        }

        info!(
            "Enhanced {} of {} endpoints ({} from cache)",
            enhancements.len(),
            ast.endpoints().len(),
            cached
        );

        Ok(Enhancement {
            ast: ast.with_enhancements(&enhancements),
            batch: result,
            cached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiCollaborator, AiRequest, AiResponse};
    use crate::ast::{AstBuilder, Endpoint, HttpMethod};
    use crate::batch::{BatchStatus, FailureStrategy};
    use crate::parser::{
        IssueKind, ParseInput, ParseOutput, ParserCapabilities, SourceDescriptor, SourceParser,
        SourceType,
    };
    use crate::types::{AiServiceError, ErrorCategory};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One endpoint per line (`METHOD /path`), counting invocations
    #[derive(Default)]
    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    impl SourceParser for CountingParser {
        fn source_type(&self) -> SourceType {
            SourceType::OpenApi
        }

        fn capabilities(&self) -> ParserCapabilities {
            ParserCapabilities {
                name: "Counting",
                extensions: &[],
                extracts_schemas: false,
            }
        }

        fn parse(&self, input: &ParseInput<'_>) -> ParseOutput {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Long enough for concurrent callers to pile up on the gate
            std::thread::sleep(Duration::from_millis(20));
            let mut builder = AstBuilder::new("counting");
            for line in input.content.lines() {
                let mut parts = line.split_whitespace();
                if let (Some(method), Some(path)) = (parts.next(), parts.next())
                    && let Ok(method) = method.parse::<HttpMethod>()
                {
                    builder.endpoint(Endpoint::new(method, path));
                }
            }
            ParseOutput::success(builder.build(), Vec::new())
        }
    }

    fn pipeline() -> (Arc<AtomicUsize>, Pipeline) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ParserRegistry::new();
        registry.register(
            "lines",
            CountingParser {
                calls: calls.clone(),
            },
        );
        (calls, Pipeline::new(Arc::new(registry), Cache::in_memory()))
    }

    fn request(content: &str) -> ParseRequest {
        ParseRequest::new("lines", SourceDescriptor::inline(content))
    }

    #[tokio::test]
    async fn test_parse_is_memoized() {
        let (calls, pipeline) = pipeline();
        let first = pipeline.parse(&request("GET /a")).await;
        let second = pipeline.parse(&request("GET /a")).await;

        assert!(first.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            first
                .ast
                .as_ref()
                .unwrap()
                .structurally_eq(second.ast.as_ref().unwrap())
        );

        pipeline.parse(&request("GET /b")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let configured = request("GET /a").with_config(json!({"projectName": "x"}));
        pipeline.parse(&configured).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_parses_share_one_flight() {
        let (calls, pipeline) = pipeline();
        let pipeline = Arc::new(pipeline);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                pipeline.parse(&request("POST /orders")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (_, pipeline) = pipeline();
        let result = pipeline
            .parse(&ParseRequest::new("cobol", SourceDescriptor::inline("x")))
            .await;
        assert!(!result.is_success());
        assert_eq!(result.errors[0].kind, IssueKind::UnsupportedSourceType);

        let result = pipeline
            .parse(&ParseRequest::new("lines", SourceDescriptor::file("missing.txt")))
            .await;
        assert_eq!(result.errors[0].kind, IssueKind::SourceUnavailable);
        assert_eq!(pipeline.cache().stats().writes, 0);
    }

    #[tokio::test]
    async fn test_parse_many_isolates_failures() {
        let (_, pipeline) = pipeline();
        let results = pipeline
            .parse_many(&[
                request("GET /a"),
                ParseRequest::new("nope", SourceDescriptor::inline("")),
                request("DELETE /c"),
            ])
            .await;
        let statuses: Vec<bool> = results.iter().map(ParseResult::is_success).collect();
        assert_eq!(statuses, vec![true, false, true]);
    }

    /// Writes "Docs for <path>", failing for paths containing "broken"
    #[derive(Default)]
    struct Describer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AiCollaborator for Describer {
        async fn process(&self, request: &AiRequest) -> std::result::Result<AiResponse, AiServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = request.payload["path"].as_str().unwrap_or_default();
            if path.contains("broken") {
                return Err(AiServiceError::new(ErrorCategory::BadResponse, "no answer"));
            }
            Ok(AiResponse {
                result: json!({"description": format!("Docs for {}", path)}),
                confidence: 0.9,
                processing_time_ms: 1,
            })
        }

        fn name(&self) -> &str {
            "describer"
        }
    }

    /// Succeeds with a payload that carries no description
    struct Summarizer;

    #[async_trait]
    impl AiCollaborator for Summarizer {
        async fn process(&self, _request: &AiRequest) -> std::result::Result<AiResponse, AiServiceError> {
            Ok(AiResponse {
                result: json!({"summary": "short"}),
                confidence: 0.5,
                processing_time_ms: 1,
            })
        }

        fn name(&self) -> &str {
            "summarizer"
        }
    }

    fn sample_ast() -> CanonicalAst {
        let mut builder = AstBuilder::new("openapi");
        builder.endpoint(Endpoint::new(HttpMethod::Get, "/users"));
        builder.endpoint(Endpoint::new(HttpMethod::Get, "/broken"));
        builder.endpoint(Endpoint::new(HttpMethod::Post, "/users"));
        builder.build()
    }

    #[tokio::test]
    async fn test_enhance_is_copy_on_write() {
        let (_, pipeline) = pipeline();
        let describer = Arc::new(Describer::default());
        let orchestrator = BatchOrchestrator::new(describer.clone());
        let ast = sample_ast();

        let enhanced = pipeline
            .enhance_ast(&ast, &orchestrator, BatchOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(enhanced.batch.status(), BatchStatus::Partial);
        assert_eq!(enhanced.cached, 0);

        let users = enhanced.ast.endpoint(HttpMethod::Get, "/users").unwrap();
        assert_eq!(users.enhanced_description.as_deref(), Some("Docs for /users"));
        assert!(ast.endpoint(HttpMethod::Get, "/users").unwrap().enhanced_description.is_none());

        // The failed endpoint is shared, not copied
        assert!(Arc::ptr_eq(&ast.endpoints()[1], &enhanced.ast.endpoints()[1]));
        assert!(!Arc::ptr_eq(&ast.endpoints()[0], &enhanced.ast.endpoints()[0]));
    }

    #[tokio::test]
    async fn test_enhance_uses_cache_on_repeat() {
        let (_, pipeline) = pipeline();
        let describer = Arc::new(Describer::default());
        let orchestrator = BatchOrchestrator::new(describer.clone());
        let ast = sample_ast();
        let options = BatchOptions::new(2, FailureStrategy::Continue);

        pipeline
            .enhance_ast(&ast, &orchestrator, options.clone(), None)
            .await
            .unwrap();
        assert_eq!(describer.calls.load(Ordering::SeqCst), 3);

        let again = pipeline
            .enhance_ast(&ast, &orchestrator, options, None)
            .await
            .unwrap();
        assert_eq!(again.cached, 2);
        assert_eq!(again.batch.total_items(), 1);
        assert_eq!(describer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            again.ast.endpoint(HttpMethod::Post, "/users").unwrap().enhanced_description.as_deref(),
            Some("Docs for /users")
        );
    }

    #[tokio::test]
    async fn test_enhance_without_description_leaves_endpoints() {
        let (_, pipeline) = pipeline();
        let orchestrator = BatchOrchestrator::new(Arc::new(Summarizer));
        let ast = sample_ast();

        let enhanced = pipeline
            .enhance_ast(&ast, &orchestrator, BatchOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(enhanced.batch.status(), BatchStatus::Success);
        for (before, after) in ast.endpoints().iter().zip(enhanced.ast.endpoints()) {
            assert!(Arc::ptr_eq(before, after));
        }
        assert_eq!(pipeline.cache().stats().writes, 0);
    }
}
