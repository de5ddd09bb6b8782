//! Batch orchestration: list once, fan out one transfer per item, wait for all of them.
//!
//! # Responsibilities
//! - Validates the configuration first; an invalid one ends the batch before the source is
//!   contacted (`FatalSetup`).
//! - Runs the source listing exactly once; a listing failure ends the batch before any
//!   transfer starts (`FatalBeforeFanOut`).
//! - Plans every listed item (classification, file name, destination key) and drives all
//!   transfers concurrently on the current task. Concurrency comes from interleaving I/O,
//!   not from extra threads.
//! - Waits for every transfer to settle. A failing item never cancels its siblings.
//! - Aggregates per-item results into a [`BatchOutcome`]; [`BatchOutcome::into_result`]
//!   turns partial failure into an error so schedulers and shells see it.
//!
//! # Destination collisions
//! Two items resolving to the same key both get written and the later write wins. The
//! orchestrator logs a warning per colliding key and changes nothing else.

use std::collections::HashMap;

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigError, TransferConfig};
use crate::contract::{SinkStore, SourceItem, SourceStore, StoreError};
use crate::list::{build_query, list_items};
use crate::transfer::{transfer_with_timeout, TaskResult, TransferError, TransferTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Empty,
    Completed,
    CompletedWithFailures,
    FatalSetup,
    FatalBeforeFanOut,
}

#[derive(Debug)]
pub struct ItemReport {
    pub item: SourceItem,
    pub destination_key: String,
    pub result: TaskResult,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub status: BatchStatus,
    /// One entry per listed item, in listing order.
    pub items: Vec<ItemReport>,
    /// Set only when `status` is `FatalSetup`.
    pub setup_error: Option<ConfigError>,
    /// Set only when `status` is `FatalBeforeFanOut`.
    pub listing_error: Option<StoreError>,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid transfer configuration: {0}")]
    Setup(#[source] ConfigError),
    #[error("listing the source store failed: {0}")]
    Listing(#[source] StoreError),
    #[error("{failed} of {processed} item(s) failed to transfer: {}", .items.join(", "))]
    PartialFailure {
        failed: usize,
        processed: usize,
        items: Vec<String>,
    },
}

impl BatchOutcome {
    fn without_items(run_id: Uuid, status: BatchStatus) -> Self {
        BatchOutcome {
            run_id,
            status,
            items: Vec::new(),
            setup_error: None,
            listing_error: None,
        }
    }

    pub fn processed(&self) -> usize {
        self.items.len()
    }

    /// Items for which a read was actually attempted (everything but skips).
    pub fn attempted(&self) -> usize {
        self.items
            .iter()
            .filter(|r| !matches!(r.result, TaskResult::Skipped { .. }))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.result, TaskResult::Succeeded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.processed() - self.attempted()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ItemReport, &TransferError)> {
        self.items.iter().filter_map(|r| match &r.result {
            TaskResult::Failed(e) => Some((r, e)),
            _ => None,
        })
    }

    pub fn into_result(self) -> Result<BatchOutcome, BatchError> {
        match self.status {
            BatchStatus::FatalSetup => Err(BatchError::Setup(
                self.setup_error.unwrap_or(ConfigError::Missing("transfer configuration")),
            )),
            BatchStatus::FatalBeforeFanOut => Err(BatchError::Listing(
                self.listing_error
                    .unwrap_or_else(|| StoreError::Other("listing failed".to_string())),
            )),
            BatchStatus::CompletedWithFailures => Err(BatchError::PartialFailure {
                failed: self.failures().count(),
                processed: self.processed(),
                items: self
                    .failures()
                    .map(|(report, _)| report.item.name.clone())
                    .collect(),
            }),
            BatchStatus::Empty | BatchStatus::Completed => Ok(self),
        }
    }
}

/// Plans one task per item and warns about destination keys shared by several items.
pub fn plan_tasks(items: Vec<SourceItem>, destination_prefix: &str) -> Vec<TransferTask> {
    let tasks: Vec<TransferTask> = items
        .into_iter()
        .map(|item| TransferTask::plan(item, destination_prefix))
        .collect();

    {
        let mut by_key: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in tasks.iter().filter(|t| !t.decision.is_skip()) {
            by_key
                .entry(task.destination_key.as_str())
                .or_default()
                .push(task.item.id.as_str());
        }
        for (key, ids) in by_key.iter().filter(|(_, ids)| ids.len() > 1) {
            warn!(key = %key, item_ids = ?ids, "[BATCH] Several items share a destination key; the last write wins");
        }
    }

    tasks
}

pub async fn run_batch<S, K>(config: &TransferConfig, source: &S, sink: &K) -> BatchOutcome
where
    S: SourceStore + ?Sized,
    K: SinkStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("batch", %run_id);
    run_batch_inner(run_id, config, source, sink)
        .instrument(span)
        .await
}

async fn run_batch_inner<S, K>(
    run_id: Uuid,
    config: &TransferConfig,
    source: &S,
    sink: &K,
) -> BatchOutcome
where
    S: SourceStore + ?Sized,
    K: SinkStore + ?Sized,
{
    info!("[BATCH] Starting transfer batch");

    let query = match config.validate().and_then(|_| build_query(&config.source)) {
        Ok(query) => query,
        Err(e) => {
            error!(error = %e, "[BATCH][ERROR] Invalid configuration, source not contacted");
            return BatchOutcome {
                setup_error: Some(e),
                ..BatchOutcome::without_items(run_id, BatchStatus::FatalSetup)
            };
        }
    };

    let listed = match list_items(source, &query).await {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "[BATCH][ERROR] Listing failed, no transfers attempted");
            return BatchOutcome {
                listing_error: Some(e),
                ..BatchOutcome::without_items(run_id, BatchStatus::FatalBeforeFanOut)
            };
        }
    };

    if listed.is_empty() {
        info!("[BATCH] No matching files, nothing to transfer");
        return BatchOutcome::without_items(run_id, BatchStatus::Empty);
    }

    let tasks = plan_tasks(listed, &config.sink.destination_prefix);
    let bucket = config.sink.bucket.as_str();
    let timeout = config.task_timeout();

    info!(tasks = tasks.len(), "[BATCH] Fanning out transfers");
    let results = join_all(
        tasks
            .iter()
            .map(|task| transfer_with_timeout(source, sink, bucket, task, timeout)),
    )
    .await;

    let items: Vec<ItemReport> = tasks
        .into_iter()
        .zip(results)
        .map(|(task, result)| ItemReport {
            item: task.item,
            destination_key: task.destination_key,
            result,
        })
        .collect();

    let status = if items.iter().any(|r| r.result.is_failure()) {
        BatchStatus::CompletedWithFailures
    } else {
        BatchStatus::Completed
    };

    let outcome = BatchOutcome {
        run_id,
        status,
        items,
        setup_error: None,
        listing_error: None,
    };

    info!(
        status = ?outcome.status,
        processed = outcome.processed(),
        succeeded = outcome.succeeded(),
        skipped = outcome.skipped(),
        failed = outcome.failures().count(),
        "[BATCH] Batch settled"
    );
    outcome
}
