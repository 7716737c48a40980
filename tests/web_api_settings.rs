//! Web API Settings Tests
//!
//! Integration tests for storage administration and manual cleanup.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{files_form, TestApp};
use lanshare::file::{FileRepository, FileUpdate};

const GB: u64 = 1024 * 1024 * 1024;
const MB: u64 = 1024 * 1024;

#[tokio::test]
async fn test_get_storage_settings_defaults() {
    let app = TestApp::new().await;

    let response = app.server.get("/settings/storage").await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["data"],
        json!({
            "quota_bytes": 4 * GB,
            "max_file_bytes": GB,
            "used_bytes": 0,
            "can_upload": true
        })
    );
}

#[tokio::test]
async fn test_set_storage_settings() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/settings/storage")
        .form(&json!({
            "quota_size": "1.5",
            "quota_unit": "GB",
            "file_size": "200",
            "file_unit": "mb"
        }))
        .await;

    response.assert_status_ok();
    let data = response.json::<Value>()["data"].clone();
    assert_eq!(data["quota_bytes"], GB * 3 / 2);
    assert_eq!(data["max_file_bytes"], 200 * MB);
    assert_eq!(data["can_upload"], true);

    let data = app.server.get("/settings/storage").await.json::<Value>()["data"].clone();
    assert_eq!(data["quota_bytes"], GB * 3 / 2);
    assert_eq!(data["max_file_bytes"], 200 * MB);
}

#[tokio::test]
async fn test_set_storage_settings_invalid() {
    let app = TestApp::new().await;

    let bad_forms = [
        json!({ "quota_size": "1", "quota_unit": "gb", "file_size": "1" }),
        json!({ "quota_size": "1", "quota_unit": "kb", "file_size": "1", "file_unit": "mb" }),
        json!({ "quota_size": "0", "quota_unit": "gb", "file_size": "1", "file_unit": "mb" }),
        json!({ "quota_size": "x", "quota_unit": "gb", "file_size": "1", "file_unit": "mb" }),
    ];

    for form in bad_forms {
        let response = app.server.post("/settings/storage").form(&form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], "BAD_REQUEST");
    }

    let data = app.server.get("/settings/storage").await.json::<Value>()["data"].clone();
    assert_eq!(data["quota_bytes"], 4 * GB);
}

#[tokio::test]
async fn test_lowered_file_limit_applies_to_next_upload() {
    let app = TestApp::new().await;

    app.server
        .post("/settings/storage")
        .form(&json!({
            "quota_size": "1",
            "quota_unit": "gb",
            "file_size": "0.0001",
            "file_unit": "mb"
        }))
        .await
        .assert_status_ok();

    // 0.0001 MB truncates to 104 bytes
    let response = app
        .server
        .post("/upload")
        .multipart(files_form(&[("big.bin", &[0u8; 105][..])]))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    app.server
        .post("/upload")
        .multipart(files_form(&[("fits.bin", &[0u8; 104][..])]))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_set_quota() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/settings/quota")
        .form(&json!({ "quota_gb": "2" }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["data"],
        json!({ "used_bytes": 0, "quota_bytes": 2 * GB, "can_upload": true })
    );
}

#[tokio::test]
async fn test_set_quota_invalid() {
    let app = TestApp::new().await;

    for form in [
        json!({}),
        json!({ "quota_gb": "" }),
        json!({ "quota_gb": "0" }),
        json!({ "quota_gb": "-1" }),
        json!({ "quota_gb": "many" }),
    ] {
        app.server
            .post("/settings/quota")
            .form(&form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_raised_quota_reenables_uploads() {
    let app = TestApp::new().await;
    app.server
        .post("/upload")
        .multipart(files_form(&[("a.bin", &[0u8; 200][..])]))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/settings/quota")
        .form(&json!({ "quota_gb": "0.0000001" }))
        .await;
    assert_eq!(response.json::<Value>()["data"]["can_upload"], false);

    let response = app
        .server
        .post("/settings/quota")
        .form(&json!({ "quota_gb": "1" }))
        .await;
    assert_eq!(response.json::<Value>()["data"]["can_upload"], true);

    app.server
        .post("/upload")
        .multipart(files_form(&[("b.bin", b"b".as_slice())]))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_manual_cleanup() {
    let app = TestApp::new().await;
    app.server
        .post("/upload")
        .multipart(files_form(&[("a.txt", b"aaa".as_slice()), ("b.txt", b"bb".as_slice())]))
        .await
        .assert_status_ok();

    let repo = FileRepository::new(app.db.pool());
    for record in repo.list(None).await.unwrap() {
        repo.update_fields(
            record.id,
            &FileUpdate::new().expires_at(Some(Utc::now() - Duration::seconds(5))),
        )
        .await
        .unwrap();
    }

    let response = app.server.post("/cleanup").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["data"],
        json!({ "reclaimed": 2, "disk_failures": 0, "record_failures": 0 })
    );
    assert_eq!(app.stored_objects(), 0);

    // Nothing left on a second run
    let response = app.server.post("/cleanup").await;
    assert_eq!(
        response.json::<Value>()["data"],
        json!({ "reclaimed": 0, "disk_failures": 0, "record_failures": 0 })
    );
}
