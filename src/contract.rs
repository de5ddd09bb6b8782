#![doc = "Store contracts: the seams between the transfer pipeline and the services it talks to."]
//!
//! # contract: Source and sink store interfaces
//!
//! This module defines the two traits the pipeline is written against
//! ([`SourceStore`] and [`SinkStore`]) plus the plain data they exchange.
//!
//! ## Interface & Extensibility
//! - Implement [`SourceStore`] for a document service that can list items and stream
//!   them either raw or converted server-side.
//! - Implement [`SinkStore`] for an object store that can accept a byte stream under a key.
//! - All methods are async and return [`StoreError`] on transport, status or decoding problems.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the generated `MockSourceStore` and
//!   `MockSinkStore` are exported under the `test-export-mocks` feature so integration
//!   tests can build deterministic doubles.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A file as described by the source store's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Opaque identifier assigned by the source store.
    pub id: String,
    /// Logical (display) name, used to derive the destination key.
    pub name: String,
    /// MIME type reported by the source store.
    pub content_type: String,
}

/// Chunks of a file in flight between the two stores.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// A fully built listing request, ready to be sent to the source store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Store-native filter expression.
    pub filter: String,
    /// Maximum number of items returned by one call.
    pub page_size: u32,
    /// When set, the listing must include items from this shared container.
    pub shared_drive_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Passes successful responses through and turns anything else into [`StoreError::Status`].
    pub(crate) async fn check(
        service: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<failed to decode response body>"));
        Err(StoreError::Status {
            service,
            status: status.as_u16(),
            body,
        })
    }
}

/// Read side of a transfer. Implemented by the Drive client and by test doubles.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Run one listing query and return at most `query.page_size` items.
    async fn list(&self, query: &ListQuery) -> Result<Vec<SourceItem>, StoreError>;

    /// Open a stream over the raw bytes of an item.
    async fn open_raw_read(&self, item_id: &str) -> Result<ByteStream, StoreError>;

    /// Open a stream over the item converted server-side to `target_mime_type`.
    async fn open_export_read(
        &self,
        item_id: &str,
        target_mime_type: &str,
    ) -> Result<ByteStream, StoreError>;
}

/// Write side of a transfer.
///
/// `write` creates or overwrites the object at `key`. It resolves only once the sink has
/// accepted every byte of `body`; an error on either the body stream or the sink itself
/// must come back as `Err`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SinkStore: Send + Sync {
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<(), StoreError>;
}
