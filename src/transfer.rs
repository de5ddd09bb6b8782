//! Stream transfer: pipes one item from the source store into the sink store.
//!
//! The read stream is handed straight to the sink as the request body, so only the
//! chunks currently in flight are held in memory. A transfer counts as succeeded only
//! when the sink's write call returns `Ok`, which for every sink means the last byte has
//! been accepted, not merely read.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tracing::{error, info};

use crate::classify::{classify, ClassificationDecision};
use crate::contract::{SinkStore, SourceItem, SourceStore, StoreError};
use crate::naming::{resolve_destination_key, resolve_name};

/// One unit of work in a batch: what to read, how, and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub item: SourceItem,
    pub decision: ClassificationDecision,
    pub destination_key: String,
}

impl TransferTask {
    pub fn plan(item: SourceItem, destination_prefix: &str) -> Self {
        let decision = classify(&item.content_type);
        let file_name = resolve_name(&item, &decision);
        let destination_key = resolve_destination_key(destination_prefix, &file_name);
        Self {
            item,
            decision,
            destination_key,
        }
    }

    /// Content type the sink object is stored with.
    fn content_type(&self) -> &str {
        match &self.decision {
            ClassificationDecision::ExportAs(format) => format.mime_type,
            _ => self.item.content_type.as_str(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not open read stream for '{item}': {source}")]
    OpenRead { item: String, source: StoreError },
    #[error("reading '{item}' failed mid-stream: {source}")]
    Read { item: String, source: StoreError },
    #[error("writing '{item}' to '{key}' failed: {source}")]
    Write {
        item: String,
        key: String,
        source: StoreError,
    },
    #[error("transfer of '{item}' timed out after {after:?}")]
    TimedOut { item: String, after: Duration },
}

impl TransferError {
    /// Name of the source item the failure belongs to.
    pub fn item_name(&self) -> &str {
        match self {
            TransferError::OpenRead { item, .. }
            | TransferError::Read { item, .. }
            | TransferError::Write { item, .. }
            | TransferError::TimedOut { item, .. } => item,
        }
    }
}

#[derive(Debug)]
pub enum TaskResult {
    Succeeded { bytes: u64 },
    Skipped { reason: String },
    Failed(TransferError),
}

impl TaskResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskResult::Failed(_))
    }
}

/// Runs `task` to completion, converting every error into a [`TaskResult`].
pub async fn transfer<S, K>(source: &S, sink: &K, bucket: &str, task: &TransferTask) -> TaskResult
where
    S: SourceStore + ?Sized,
    K: SinkStore + ?Sized,
{
    let item = &task.item;

    let opened = match &task.decision {
        ClassificationDecision::SkipUnsupported { reason } => {
            info!(item = %item.name, content_type = %item.content_type, %reason, "[TRANSFER] Skipping unsupported item");
            return TaskResult::Skipped {
                reason: reason.clone(),
            };
        }
        ClassificationDecision::RawFetch => source.open_raw_read(&item.id).await,
        ClassificationDecision::ExportAs(format) => {
            source.open_export_read(&item.id, format.mime_type).await
        }
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(source) => {
            error!(item = %item.name, error = %source, "[TRANSFER][ERROR] Opening read stream failed");
            return TaskResult::Failed(TransferError::OpenRead {
                item: item.name.clone(),
                source,
            });
        }
    };

    let bytes = Arc::new(AtomicU64::new(0));
    let read_failed = Arc::new(AtomicBool::new(false));
    let body = {
        let bytes = Arc::clone(&bytes);
        let read_failed = Arc::clone(&read_failed);
        stream
            .inspect(move |chunk| match chunk {
                Ok(chunk) => {
                    bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                }
                Err(_) => read_failed.store(true, Ordering::Relaxed),
            })
            .boxed()
    };

    info!(item = %item.name, key = %task.destination_key, "[TRANSFER] Streaming to sink");
    match sink
        .write(bucket, &task.destination_key, task.content_type(), body)
        .await
    {
        Ok(()) => {
            let bytes = bytes.load(Ordering::Relaxed);
            info!(item = %item.name, key = %task.destination_key, bytes, "[TRANSFER] Completed");
            TaskResult::Succeeded { bytes }
        }
        Err(source) if read_failed.load(Ordering::Relaxed) => {
            error!(item = %item.name, error = %source, "[TRANSFER][ERROR] Read stream failed");
            TaskResult::Failed(TransferError::Read {
                item: item.name.clone(),
                source,
            })
        }
        Err(source) => {
            error!(item = %item.name, key = %task.destination_key, error = %source, "[TRANSFER][ERROR] Write failed");
            TaskResult::Failed(TransferError::Write {
                item: item.name.clone(),
                key: task.destination_key.clone(),
                source,
            })
        }
    }
}

/// [`transfer`] bounded by an optional deadline. Expiry drops both streams and fails
/// only this task.
pub async fn transfer_with_timeout<S, K>(
    source: &S,
    sink: &K,
    bucket: &str,
    task: &TransferTask,
    timeout: Option<Duration>,
) -> TaskResult
where
    S: SourceStore + ?Sized,
    K: SinkStore + ?Sized,
{
    let Some(after) = timeout else {
        return transfer(source, sink, bucket, task).await;
    };

    match tokio::time::timeout(after, transfer(source, sink, bucket, task)).await {
        Ok(result) => result,
        Err(_) => {
            error!(item = %task.item.name, ?after, "[TRANSFER][ERROR] Timed out");
            TaskResult::Failed(TransferError::TimedOut {
                item: task.item.name.clone(),
                after,
            })
        }
    }
}
