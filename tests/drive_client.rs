use futures::TryStreamExt;
use httpmock::prelude::*;
use serde_json::json;

use drive_bucket::contract::{ListQuery, SourceStore, StoreError};
use drive_bucket::download::DriveClient;

fn client(server: &MockServer) -> DriveClient {
    DriveClient::new(reqwest::Client::new(), "drive-token").with_base_url(server.base_url())
}

async fn collect(stream: drive_bucket::contract::ByteStream) -> Vec<u8> {
    stream
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .expect("stream should complete")
}

#[tokio::test]
async fn list_sends_filter_and_decodes_items() {
    let server = MockServer::start_async().await;
    let filter = "'folder-1' in parents and (name = 'Budget')";
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files")
                .header("authorization", "Bearer drive-token")
                .query_param("q", filter)
                .query_param("pageSize", "25")
                .query_param("fields", "files(id, name, mimeType)");
            then.status(200).json_body(json!({
                "files": [
                    {"id": "s1", "name": "Budget", "mimeType": "application/vnd.google-apps.spreadsheet"}
                ]
            }));
        })
        .await;

    let items = client(&server)
        .list(&ListQuery {
            filter: filter.to_string(),
            page_size: 25,
            shared_drive_id: None,
        })
        .await
        .expect("listing should succeed");

    mock.assert_async().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "s1");
    assert_eq!(items[0].content_type, "application/vnd.google-apps.spreadsheet");
}

#[tokio::test]
async fn list_with_shared_drive_includes_all_drives() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files")
                .query_param("corpora", "drive")
                .query_param("driveId", "shared-7")
                .query_param("includeItemsFromAllDrives", "true")
                .query_param("supportsAllDrives", "true");
            then.status(200).json_body(json!({ "files": [] }));
        })
        .await;

    let items = client(&server)
        .list(&ListQuery {
            filter: "'f' in parents".to_string(),
            page_size: 10,
            shared_drive_id: Some("shared-7".to_string()),
        })
        .await
        .expect("listing should succeed");

    mock.assert_async().await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn list_surfaces_http_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files");
            then.status(403).body("forbidden");
        })
        .await;

    let err = client(&server)
        .list(&ListQuery {
            filter: "'f' in parents".to_string(),
            page_size: 10,
            shared_drive_id: None,
        })
        .await
        .unwrap_err();
    match err {
        StoreError::Status { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn raw_read_requests_media() {
    let server = MockServer::start_async().await;
    let payload: Vec<u8> = (0u8..200).collect();
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files/bin-1")
                .query_param("alt", "media");
            then.status(200).body(payload.clone());
        })
        .await;

    let stream = client(&server).open_raw_read("bin-1").await.expect("open");
    assert_eq!(collect(stream).await, payload);
    mock.assert_async().await;
}

#[tokio::test]
async fn export_read_requests_target_format() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files/doc-1/export")
                .query_param("mimeType", "application/pdf");
            then.status(200).body("%PDF-1.7");
        })
        .await;

    let stream = client(&server)
        .open_export_read("doc-1", "application/pdf")
        .await
        .expect("open");
    assert_eq!(collect(stream).await, b"%PDF-1.7".to_vec());
    mock.assert_async().await;
}

#[tokio::test]
async fn open_read_fails_on_missing_file() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files/nope");
            then.status(404).body("not found");
        })
        .await;

    let err = client(&server).open_raw_read("nope").await.err().expect("should fail");
    assert!(matches!(err, StoreError::Status { status: 404, .. }));
}
