//! API integration tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! no socket is bound.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{addr, hidden_reference_workbook};
use serde_json::{json, Value};
use sheetprune::api::handlers::ApiResponse;
use sheetprune::api::{router, AppState};
use sheetprune::excel::XlsxImporter;
use sheetprune::workbook::Workbook;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app() -> axum::Router {
    router(Arc::new(AppState::new("0.4.0-test")))
}

fn fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("model.xlsx");
    let mut wb = hidden_reference_workbook();
    wb.set_storage(&path);
    wb.save().unwrap();
    path
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_version() {
    let (status, body) = get("/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], "0.4.0-test");
    assert_eq!(body["data"]["features"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = body["data"]["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e["path"] == "/api/v1/delete-hidden"));
}

#[test]
fn test_api_response_serialization() {
    let response: ApiResponse<u32> = ApiResponse::ok(3);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["data"], 3);
    assert!(json.get("error").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// DOCUMENT ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_scan_endpoint() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let (status, body) = post(
        "/api/v1/scan",
        json!({"file_path": path, "sheets": ["Hidden1"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["strategy"], "offline");
    assert_eq!(body["data"]["sites"][0]["sheet"], "Calc");
}

#[tokio::test]
async fn test_delete_hidden_endpoint() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    let out = dir.path().join("clean.xlsx");

    let (status, body) = post(
        "/api/v1/delete-hidden",
        json!({"file_path": path, "output_path": out}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["report"]["deleted"][0], "Hidden1");
    assert_eq!(body["data"]["report"]["neutralized"], 1);

    let cleaned = XlsxImporter::new(&out).import().unwrap();
    assert!(!cleaned.has_sheet("Hidden1"));
    assert!(!cleaned.has_formula("Calc", addr("B2")).unwrap());
}

#[tokio::test]
async fn test_delete_missing_sheet_is_unprocessable() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let (status, body) = post(
        "/api/v1/delete-sheet",
        json!({"file_path": path, "sheet": "Nope"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Nope"));
}

#[tokio::test]
async fn test_missing_file_is_unprocessable() {
    let (status, body) = post(
        "/api/v1/break-links",
        json!({"file_path": "/nonexistent/book.xlsx"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_clean_names_endpoint() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let (status, body) = post(
        "/api/v1/clean-names",
        json!({"file_path": path, "broken_only": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["report"]["attempted"], 0);
}
