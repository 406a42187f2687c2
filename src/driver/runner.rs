//! Work driver - main ingestion loop
//!
//! This module walks the work list through the pipeline, including:
//! - Resuming from the persisted progress document
//! - Running each item's stages with per-call timeouts
//! - Isolating failures to the item that raised them
//! - Persisting progress after every item
//! - Stopping cleanly on shutdown

use crate::admission::AdmissionController;
use crate::driver::{ProgressStore, WorkItem};
use crate::pipeline::{normalize_vector, EntitySet, PaperRecord, Pipeline, StageContext};
use crate::storage::{RecordId, RecordStatus, RecordStore};
use crate::StageResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default pause between consecutive items
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(100);

/// Default hard cutoff for a single extraction, entity or vector call
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_items: usize,
    pub start_position: usize,
    pub processed: usize,
    pub failed: usize,
    pub interrupted: bool,
}

impl RunSummary {
    /// Items that reached an outcome in this run
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

/// Outcome of a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(String),
}

/// Drives work items through the pipeline one at a time
pub struct WorkDriver<P, S> {
    admission: Arc<AdmissionController>,
    progress: ProgressStore,
    pipeline: P,
    store: S,
    item_delay: Duration,
    stage_timeout: Duration,
}

impl<P: Pipeline, S: RecordStore> WorkDriver<P, S> {
    /// Creates a driver over an explicitly constructed controller and stores
    pub fn new(
        admission: Arc<AdmissionController>,
        progress: ProgressStore,
        pipeline: P,
        store: S,
    ) -> Self {
        Self {
            admission,
            progress,
            pipeline,
            store,
            item_delay: DEFAULT_ITEM_DELAY,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Runs the work list to the end
    pub async fn run(&mut self, items: &[WorkItem]) -> crate::Result<RunSummary> {
        self.run_until(items, std::future::pending::<()>()).await
    }

    /// Runs the work list until it is finished or `shutdown` resolves
    ///
    /// Items are processed in ascending position order starting after the
    /// last completed position. An unreadable progress document is fatal;
    /// everything after that is isolated per item.
    pub async fn run_until<F>(
        &mut self,
        items: &[WorkItem],
        shutdown: F,
    ) -> crate::Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let document = self.progress.load()?;
        let total = items.len();
        let start = document.start_position().min(total);

        let mut summary = RunSummary {
            total_items: total,
            start_position: start,
            ..RunSummary::default()
        };

        if start >= total {
            tracing::info!("All {} items already processed, nothing to do", total);
            return Ok(summary);
        }

        tracing::info!(
            "Starting at position {} of {} ({} previous failures)",
            start,
            total,
            document.failed_papers.len()
        );

        tokio::pin!(shutdown);
        let started = std::time::Instant::now();
        let remaining = &items[start..];

        for (index, item) in remaining.iter().enumerate() {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::warn!("Shutdown requested, stopping before item {}", item.position);
                    summary.interrupted = true;
                    break;
                }
                outcome = self.process_item(item) => outcome,
            };

            match outcome {
                ItemOutcome::Succeeded => {
                    summary.processed += 1;
                    if let Err(e) = self.progress.record_success(item, total) {
                        tracing::warn!(
                            "Failed to persist progress after item {}: {}",
                            item.position,
                            e
                        );
                    }
                }
                ItemOutcome::Failed(error) => {
                    summary.failed += 1;
                    tracing::error!("Item {} ({}) failed: {}", item.position, item.label, error);
                    if let Err(e) = self.progress.record_failure(item, total, &error) {
                        tracing::warn!(
                            "Failed to persist failure of item {}: {}",
                            item.position,
                            e
                        );
                    }
                }
            }

            let attempted = summary.attempted();
            if attempted % 10 == 0 {
                let rate = attempted as f64 / started.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {}/{} items, {} failed, {:.2} items/sec",
                    start + attempted,
                    total,
                    summary.failed,
                    rate
                );
            }

            let is_last = index + 1 == remaining.len();
            if !is_last && !self.item_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        tracing::warn!("Shutdown requested, stopping after item {}", item.position);
                        summary.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.item_delay) => {}
                }
            }
        }

        tracing::info!(
            "Run finished: {} processed, {} failed in {:?}",
            summary.processed,
            summary.failed,
            started.elapsed()
        );

        Ok(summary)
    }

    /// Processes one item, converting any stage error into a failed outcome
    pub async fn process_item(&mut self, item: &WorkItem) -> ItemOutcome {
        tracing::info!("Processing item {}: {}", item.position, item.label);

        let mut record_id = None;
        match self.run_stages(item, &mut record_id).await {
            Ok(()) => ItemOutcome::Succeeded,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!("Item {} hit a hard timeout, not retrying", item.position);
                }
                if let Some(id) = record_id {
                    if let Err(status_error) = self.store.update_status(id, RecordStatus::Failed) {
                        tracing::warn!(
                            "Failed to mark record {} as failed: {}",
                            id,
                            status_error
                        );
                    }
                }
                ItemOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_stages(
        &mut self,
        item: &WorkItem,
        record_id: &mut Option<RecordId>,
    ) -> StageResult<()> {
        let context = StageContext::new(self.admission.as_ref(), self.stage_timeout);

        let content = self.pipeline.fetch_content(&context, item).await?;

        let mut record = match self
            .pipeline
            .extract_structured(&context, item, &content)
            .await
        {
            Ok(record) => record,
            Err(e) if e.is_malformed() => {
                tracing::warn!("{}; storing minimal record for item {}", e, item.position);
                PaperRecord::minimal(item, &content)
            }
            Err(e) => return Err(e),
        };

        record.entities = match self.pipeline.extract_entities(&context, &content).await {
            Ok(entities) => entities,
            Err(e) if e.is_malformed() => {
                tracing::warn!("{}; no entities for item {}", e, item.position);
                EntitySet::default()
            }
            Err(e) => return Err(e),
        };
        if record.entities.is_empty() {
            tracing::debug!("No entities extracted for item {}", item.position);
        }

        let id = self.store.upsert_record(item.position, &record)?;
        *record_id = Some(id);

        for (section, text) in record.embedding_sections() {
            let vector = match self.pipeline.generate_vector(&context, text).await {
                Ok(vector) => vector,
                Err(e) if e.is_malformed() => {
                    tracing::warn!("{}; skipping {} embedding", e, section);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if vector.is_empty() {
                tracing::debug!("No {} embedding for item {}", section, item.position);
                continue;
            }

            self.store
                .upsert_embedding(id, section, &normalize_vector(vector))?;
        }

        self.store.update_status(id, RecordStatus::Completed)?;
        Ok(())
    }
}
