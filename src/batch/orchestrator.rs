//! Bounded-concurrency batch execution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use super::{Batch, BatchItem, BatchResult, FailureStrategy, ItemOutcome};
use crate::ai::{SharedCollaborator, with_item_timeout};

/// Executes batches against one AI collaborator.
///
/// Items are admitted in submission order with at most `max_concurrency`
/// in flight; completion order is whatever the collaborator makes it.
/// Under `Abort` the first failure raises a flag that every later-admitted
/// item checks before calling out, so it is recorded `cancelled` instead.
/// Items already in flight run to completion.
pub struct BatchOrchestrator {
    collaborator: SharedCollaborator,
}

impl BatchOrchestrator {
    pub fn new(collaborator: SharedCollaborator) -> Self {
        Self { collaborator }
    }

    #[instrument(skip(self, batch), fields(batch_id = %batch.id(), items = batch.len()))]
    pub async fn run(&self, batch: &Batch) -> BatchResult {
        let started = Instant::now();
        let options = batch.options();
        let abort_on_failure = options.failure_strategy == FailureStrategy::Abort;
        let aborted = AtomicBool::new(false);

        info!(
            "Batch: starting {} items (concurrency={}, strategy={})",
            batch.len(),
            options.max_concurrency,
            options.failure_strategy
        );

        let mut ledger: Vec<(usize, ItemOutcome)> = Vec::with_capacity(batch.len());
        let mut stream = futures::stream::iter(batch.items().iter().enumerate())
            .map(|(index, item)| {
                let aborted = &aborted;
                async move {
                    if abort_on_failure && aborted.load(Ordering::SeqCst) {
                        return (index, ItemOutcome::cancelled(item));
                    }
                    let outcome = self.execute(item, options.item_timeout).await;
                    if abort_on_failure
                        && outcome.error.is_some()
                        && !aborted.swap(true, Ordering::SeqCst)
                    {
                        warn!(item = %item.id, "Batch: item failed, cancelling items not yet started");
                    }
                    (index, outcome)
                }
            })
            .buffer_unordered(options.max_concurrency);

        while let Some(entry) = stream.next().await {
            ledger.push(entry);
        }
        drop(stream);

        ledger.sort_by_key(|(index, _)| *index);
        let outcomes = ledger.into_iter().map(|(_, outcome)| outcome).collect();
        let result = BatchResult::from_ledger(
            batch.id(),
            options.failure_strategy,
            outcomes,
            started.elapsed(),
        );

        info!(
            "Batch: {:?} ({} ok, {} failed, {} cancelled in {}ms)",
            result.status(),
            result.success_count(),
            result.failure_count(),
            result.cancelled_count(),
            result.processing_time().as_millis()
        );

        result
    }

    async fn execute(&self, item: &BatchItem, timeout: Option<std::time::Duration>) -> ItemOutcome {
        let started = Instant::now();
        let request = item.request();
        let operation = format!("{} item {}", item.kind, item.id);

        let result = with_item_timeout(timeout, self.collaborator.process(&request), &operation).await;
        match result {
            Ok(response) => {
                debug!(item = %item.id, "Batch: item succeeded");
                ItemOutcome::success(item, response, started.elapsed())
            }
            Err(error) => {
                warn!(item = %item.id, error = %error, "Batch: item failed");
                ItemOutcome::failed(item, error, started.elapsed())
            }
        }
    }
}
