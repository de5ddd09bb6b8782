//! Cloud Storage client: the production sink store, streaming each object with a single
//! media upload.
//!
//! The read stream becomes the request body through `reqwest::Body::wrap_stream`, so the
//! object is never held in memory. GCS answers only after it has stored the whole body;
//! an error on the body stream aborts the request and surfaces as `Err` from
//! [`SinkStore::write`].

use async_trait::async_trait;

use crate::contract::{ByteStream, SinkStore, StoreError};

pub const GCS_UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";
const SERVICE: &str = "gcs";

pub struct GcsClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GcsClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: GCS_UPLOAD_BASE.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SinkStore for GcsClient {
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: ByteStream,
    ) -> Result<(), StoreError> {
        tracing::debug!(bucket, key, content_type, "Starting media upload");
        let response = self
            .http
            .post(format!("{}/b/{}/o", self.base_url, bucket))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;
        StoreError::check(SERVICE, response).await?;
        tracing::debug!(bucket, key, "Media upload acknowledged");
        Ok(())
    }
}
