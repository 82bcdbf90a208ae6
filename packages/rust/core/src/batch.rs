//! Batch runs: many documents, bounded concurrency, one outcome each.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use pagegrade_shared::{ComplianceReport, GradeError, NormalizedDocument, Result};

use crate::engine::Engine;

/// Progress callback for batch runs.
pub trait ProgressReporter: Send + Sync {
    /// Called once before any document is checked.
    fn started(&self, total: usize);
    /// Called as each document's outcome is collected, in input order.
    fn document_done(&self, target: &str, current: usize, total: usize, ok: bool);
    /// Called when every document has an outcome.
    fn finished(&self, succeeded: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total: usize) {}
    fn document_done(&self, _target: &str, _current: usize, _total: usize, _ok: bool) {}
    fn finished(&self, _succeeded: usize, _total: usize) {}
}

/// Outcome of one document in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub target: String,
    pub result: Result<ComplianceReport>,
}

impl BatchOutcome {
    pub fn report(&self) -> Option<&ComplianceReport> {
        self.result.as_ref().ok()
    }
}

impl Engine {
    /// Check every document, at most `max_concurrent` at a time.
    ///
    /// One document failing (timeout, cancelled task) does not affect the
    /// others. Outcomes are returned in input order.
    #[instrument(skip_all, fields(documents = docs.len()))]
    pub async fn run_batch(
        &self,
        docs: Vec<Arc<NormalizedDocument>>,
        progress: &dyn ProgressReporter,
    ) -> Vec<BatchOutcome> {
        let total = docs.len();
        progress.started(total);
        info!(total, max_concurrent = self.max_concurrent, "starting batch");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for doc in docs {
            let engine = self.clone();
            let sem = Arc::clone(&semaphore);
            let target = doc.target.clone();

            handles.push((
                target,
                tokio::spawn(async move {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|e| GradeError::Cancelled(e.to_string()))?;
                    engine.run(doc).await
                }),
            ));
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut succeeded = 0;
        for (i, (target, handle)) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(GradeError::Cancelled(e.to_string())),
            };

            match &result {
                Ok(_) => succeeded += 1,
                Err(e) => warn!(%target, error = %e, "document check failed"),
            }
            progress.document_done(&target, i + 1, total, result.is_ok());
            outcomes.push(BatchOutcome { target, result });
        }

        progress.finished(succeeded, total);
        info!(succeeded, failed = total - succeeded, "batch complete");
        outcomes
    }
}
