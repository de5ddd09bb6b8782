#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use drive_bucket::config::{NameMatch, SinkConfig, SourceConfig, TransferConfig};
use drive_bucket::contract::{
    ByteStream, ListQuery, SinkStore, SourceItem, SourceStore, StoreError,
};

pub const PREFIX: &str = "drive-export/";
pub const BUCKET: &str = "test-bucket";

pub fn item(id: &str, name: &str, content_type: &str) -> SourceItem {
    SourceItem {
        id: id.to_string(),
        name: name.to_string(),
        content_type: content_type.to_string(),
    }
}

pub fn config(names: &[&str]) -> TransferConfig {
    TransferConfig {
        source: SourceConfig {
            folder_id: "folder-1".to_string(),
            shared_drive_id: None,
            file_names: names.iter().map(|n| n.to_string()).collect(),
            name_match: NameMatch::Exact,
            page_size: 200,
        },
        sink: SinkConfig {
            bucket: BUCKET.to_string(),
            destination_prefix: PREFIX.to_string(),
        },
        task_timeout_secs: None,
    }
}

fn chunked(data: Vec<u8>) -> Vec<Bytes> {
    data.chunks(4).map(Bytes::copy_from_slice).collect()
}

/// In-memory Drive: raw items serve their stored bytes in small chunks, exports
/// serve `"<mime>|<id>"`.
#[derive(Default)]
pub struct FakeDrive {
    pub items: Vec<SourceItem>,
    pub contents: HashMap<String, Vec<u8>>,
    /// Items whose stream errors after the first chunk.
    pub broken_reads: HashSet<String>,
    /// Items whose stream never produces anything.
    pub stalled_reads: HashSet<String>,
    pub opened: AtomicUsize,
    pub exports: Mutex<Vec<(String, String)>>,
}

impl FakeDrive {
    pub fn with_items(items: Vec<SourceItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, id: &str, content: &[u8]) -> Self {
        self.contents.insert(id.to_string(), content.to_vec());
        self
    }

    fn stream_for(&self, id: &str, data: Vec<u8>) -> ByteStream {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.stalled_reads.contains(id) {
            return futures::stream::pending().boxed();
        }
        let mut chunks: Vec<Result<Bytes, StoreError>> =
            chunked(data).into_iter().map(Ok).collect();
        if self.broken_reads.contains(id) {
            chunks.truncate(1);
            chunks.push(Err(StoreError::Other("connection reset".to_string())));
        }
        futures::stream::iter(chunks).boxed()
    }
}

#[async_trait]
impl SourceStore for FakeDrive {
    async fn list(&self, _query: &ListQuery) -> Result<Vec<SourceItem>, StoreError> {
        Ok(self.items.clone())
    }

    async fn open_raw_read(&self, item_id: &str) -> Result<ByteStream, StoreError> {
        let data = self
            .contents
            .get(item_id)
            .cloned()
            .ok_or_else(|| StoreError::Status {
                service: "drive",
                status: 404,
                body: format!("file {item_id} not found"),
            })?;
        Ok(self.stream_for(item_id, data))
    }

    async fn open_export_read(
        &self,
        item_id: &str,
        target_mime_type: &str,
    ) -> Result<ByteStream, StoreError> {
        self.exports
            .lock()
            .unwrap()
            .push((item_id.to_string(), target_mime_type.to_string()));
        let data = format!("{target_mime_type}|{item_id}").into_bytes();
        Ok(self.stream_for(item_id, data))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// In-memory bucket. Keys in `failing_keys` reject the write after the body has been
/// fully read, i.e. a sink-side failure after read completion.
#[derive(Default)]
pub struct MemoryBucket {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub failing_keys: HashSet<String>,
    pub writes: AtomicUsize,
}

impl MemoryBucket {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            failing_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl SinkStore for MemoryBucket {
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut body: ByteStream,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        if self.failing_keys.contains(key) {
            return Err(StoreError::Status {
                service: "gcs",
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(
            format!("{bucket}/{key}"),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(())
    }
}
