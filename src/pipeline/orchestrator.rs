// src/pipeline/orchestrator.rs
use crate::error::MergeError;
use crate::pipeline::api::{BatchSummary, GenerationResult, RowStatus};
use crate::pipeline::context::MergeContext;
use crate::pipeline::worker;
use log::{info, warn};
use missive_convert::FormatConverter;
use missive_types::DataRow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::runtime::Builder;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// The batch engine: drives every data row through generation and
/// optional conversion under a bounded admission pool.
///
/// Rows complete in I/O-latency order, not input order; at most
/// `concurrency` rows are generating or converting at any instant; one
/// row's failure never aborts the batch.
pub struct MergePipeline {
    context: Arc<MergeContext>,
    rows: Vec<DataRow>,
    converter: Option<Arc<dyn FormatConverter>>,
    concurrency: usize,
}

impl std::fmt::Debug for MergePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergePipeline")
            .field("rows", &self.rows.len())
            .field("concurrency", &self.concurrency)
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

impl MergePipeline {
    pub(crate) fn new(
        context: Arc<MergeContext>,
        rows: Vec<DataRow>,
        converter: Option<Arc<dyn FormatConverter>>,
        concurrency: usize,
    ) -> Self {
        Self { context, rows, converter, concurrency: concurrency.max(1) }
    }

    /// Number of data rows this run will process.
    pub fn queued(&self) -> usize {
        self.rows.len()
    }

    /// Runs the whole batch to completion.
    ///
    /// The returned summary always accounts for every queued row; per-row
    /// failures are recorded in it, never returned as an error.
    pub async fn run_async(&self) -> Result<BatchSummary, MergeError> {
        let started = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let total = self.rows.len();
        match &self.converter {
            Some(converter) => info!(
                "[BATCH] starting: {} rows, {} admission slots, converting to {}",
                total,
                self.concurrency,
                converter.output_extension()
            ),
            None => info!(
                "[BATCH] starting: {} rows, {} admission slots, no conversion",
                total, self.concurrency
            ),
        }

        // All intermediate copies live under one run-scoped staging tree,
        // removed when the run ends.
        let staging = tempfile::Builder::new().prefix("missive-staging-").tempdir()?;
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let progress = Arc::new(AtomicUsize::new(0));
        let mut tasks: JoinSet<(usize, GenerationResult)> = JoinSet::new();

        for (index, row) in self.rows.iter().enumerate() {
            let row_number = index + 1;
            // Queued -> Admitted: wait for a free slot before spawning.
            let permit = Arc::clone(&slots)
                .acquire_owned()
                .await
                .map_err(|e| MergeError::Config(format!("admission pool closed: {e}")))?;

            let context = Arc::clone(&self.context);
            let converter = self.converter.clone();
            let row = row.clone();
            let staging_root = staging.path().to_path_buf();
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                let result =
                    worker::process_row(context, converter, row, row_number, staging_root).await;
                drop(permit);

                let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
                match &result.status {
                    RowStatus::Completed { artifact } => info!(
                        "[ROW] ({done}/{total}) '{}' -> '{}'",
                        result.key,
                        artifact.display()
                    ),
                    RowStatus::Failed { cause } => {
                        warn!("[ROW] ({done}/{total}) '{}' failed: {cause}", result.key)
                    }
                }
                (row_number, result)
            });
        }

        let mut slots_by_row: Vec<Option<GenerationResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((row_number, result)) => slots_by_row[row_number - 1] = Some(result),
                Err(e) => warn!("[BATCH] a row task aborted before reporting: {e}"),
            }
        }

        // Every queued row is accounted for, even if its task died without
        // reporting.
        let results: Vec<GenerationResult> = slots_by_row
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    GenerationResult::failed(
                        format!("row-{}", index + 1),
                        "task aborted before reporting",
                    )
                })
            })
            .collect();

        let completed = results.iter().filter(|result| !result.is_failed()).count();
        let failed = total - completed;
        let elapsed = started.elapsed();
        info!("[BATCH] finished in {elapsed:.2?}: {completed} completed, {failed} failed");

        staging.close()?;
        Ok(BatchSummary { queued: total, completed, failed, started_at, elapsed, results })
    }

    /// Convenience wrapper that builds a runtime and runs the batch.
    pub fn run(&self) -> Result<BatchSummary, MergeError> {
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        runtime.block_on(self.run_async())
    }
}
