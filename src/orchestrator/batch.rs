use super::Orchestrator;
use crate::job::PollOptions;
use crate::types::{SynthesisRequest, SynthesisResult};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// One entry of a batch: what to say and where to put it.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub request: SynthesisRequest,
    pub output: PathBuf,
}

impl BatchItem {
    pub fn new(request: SynthesisRequest, output: impl Into<PathBuf>) -> Self {
        Self {
            request,
            output: output.into(),
        }
    }
}

impl Orchestrator {
    /// Run many operations with at most `max_concurrency` in flight.
    /// Results come back in input order.
    pub async fn synthesize_batch(
        &self,
        items: Vec<BatchItem>,
        max_concurrency: usize,
        poll: PollOptions,
    ) -> Vec<SynthesisResult> {
        if items.is_empty() {
            return Vec::new();
        }
        let total = items.len();
        let limit = max_concurrency.max(1);
        let start = Instant::now();

        let results: Vec<SynthesisResult> = futures::stream::iter(items)
            .map(|item| async move { self.synthesize(&item.request, &item.output, poll).await })
            .buffered(limit)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            total,
            succeeded,
            failed = total - succeeded,
            concurrency = limit,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );
        results
    }
}
