//! Google Drive v3 client: the production [`SourceStore`].

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use crate::contract::{ByteStream, ListQuery, SourceItem, SourceStore, StoreError};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const SERVICE: &str = "drive";
const LIST_FIELDS: &str = "files(id, name, mimeType)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
}

impl From<DriveFile> for SourceItem {
    fn from(file: DriveFile) -> Self {
        SourceItem {
            id: file.id,
            name: file.name,
            content_type: file.mime_type,
        }
    }
}

/// Drive client holding one bearer token for the whole run. Cheap to share by reference
/// across concurrent transfers.
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DRIVE_API_BASE.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_stream(
        &self,
        url: String,
        params: &[(&str, &str)],
    ) -> Result<ByteStream, StoreError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(params)
            .send()
            .await?;
        let response = StoreError::check(SERVICE, response).await?;
        Ok(response.bytes_stream().map_err(StoreError::from).boxed())
    }
}

pub(crate) fn list_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", query.filter.clone()),
        ("pageSize", query.page_size.to_string()),
        ("fields", LIST_FIELDS.to_string()),
    ];
    if let Some(drive_id) = &query.shared_drive_id {
        params.extend([
            ("corpora", "drive".to_string()),
            ("driveId", drive_id.clone()),
            ("includeItemsFromAllDrives", "true".to_string()),
            ("supportsAllDrives", "true".to_string()),
        ]);
    }
    params
}

#[async_trait]
impl SourceStore for DriveClient {
    async fn list(&self, query: &ListQuery) -> Result<Vec<SourceItem>, StoreError> {
        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&list_params(query))
            .send()
            .await?;
        let text = StoreError::check(SERVICE, response).await?.text().await?;

        let listing: FileList = serde_json::from_str(&text).map_err(|e| StoreError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        tracing::debug!(count = listing.files.len(), "Drive listing decoded");
        Ok(listing.files.into_iter().map(SourceItem::from).collect())
    }

    async fn open_raw_read(&self, item_id: &str) -> Result<ByteStream, StoreError> {
        self.get_stream(
            format!("{}/files/{}", self.base_url, item_id),
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )
        .await
    }

    async fn open_export_read(
        &self,
        item_id: &str,
        target_mime_type: &str,
    ) -> Result<ByteStream, StoreError> {
        self.get_stream(
            format!("{}/files/{}/export", self.base_url, item_id),
            &[("mimeType", target_mime_type)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_scope_sends_no_shared_drive_flags() {
        let params = list_params(&ListQuery {
            filter: "'f' in parents".to_string(),
            page_size: 10,
            shared_drive_id: None,
        });
        assert!(params.iter().all(|(k, _)| *k != "driveId" && *k != "corpora"));
        assert!(params.contains(&("pageSize", "10".to_string())));
    }

    #[test]
    fn shared_drive_scope_requests_all_drives() {
        let params = list_params(&ListQuery {
            filter: "'f' in parents".to_string(),
            page_size: 10,
            shared_drive_id: Some("0AB".to_string()),
        });
        assert!(params.contains(&("driveId", "0AB".to_string())));
        assert!(params.contains(&("corpora", "drive".to_string())));
        assert!(params.contains(&("includeItemsFromAllDrives", "true".to_string())));
        assert!(params.contains(&("supportsAllDrives", "true".to_string())));
    }

    #[test]
    fn decodes_listing_with_missing_files_field() {
        let listing: FileList = serde_json::from_str("{}").unwrap();
        assert!(listing.files.is_empty());
    }
}
