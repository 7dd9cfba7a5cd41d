//! API request handlers
//!
//! Every document operation runs on the blocking pool while holding the
//! locks from [`AppState::document_locks`] for its input and output files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cli::{
    run_break_links, run_clean_names, run_delete_hidden, run_delete_sheet, run_scan,
};
use crate::config::PruneConfig;
use crate::error::PruneResult;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Sheetprune API Server".to_string(),
        version: state.version.clone(),
        description: "HTTP API for safe structural cleanup of .xlsx workbooks".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint(
                "/api/v1/scan",
                "POST",
                "List formulas that reference the given sheets",
            ),
            endpoint("/api/v1/delete-sheet", "POST", "Delete one sheet"),
            endpoint("/api/v1/delete-hidden", "POST", "Delete every hidden sheet"),
            endpoint(
                "/api/v1/clean-names",
                "POST",
                "Delete user-defined named ranges",
            ),
            endpoint("/api/v1/break-links", "POST", "Break external links"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["scan", "delete-sheet", "delete-hidden", "clean-names", "break-links"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

/// Run `job` on the blocking pool while holding the locks of every file it
/// reads or writes
async fn exclusive<T, F>(
    state: &AppState,
    file_path: &str,
    output_path: Option<String>,
    job: F,
) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Send + 'static,
    F: FnOnce(PathBuf, Option<PathBuf>) -> PruneResult<T> + Send + 'static,
{
    let path = PathBuf::from(file_path);
    let output = output_path.map(PathBuf::from);

    // Sorted order, so two requests over the same pair cannot deadlock
    let locks = {
        let mut touched: Vec<&Path> = vec![path.as_path()];
        touched.extend(output.as_deref());
        state.document_locks(&touched)
    };
    let mut _guards = Vec::with_capacity(locks.len());
    for lock in &locks {
        _guards.push(lock.lock().await);
    }

    match tokio::task::spawn_blocking(move || job(path, output)).await {
        Ok(Ok(data)) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Ok(Err(e)) => {
            warn!(file = file_path, error = %e, "operation failed");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiResponse::err(e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err(format!("worker failed: {}", e))),
        ),
    }
}

/// Config beside the file, with request overrides on top
fn resolve_config(
    path: &std::path::Path,
    safe: Option<bool>,
    offline_scan: Option<bool>,
    keep_system_ranges: Option<bool>,
) -> PruneResult<PruneConfig> {
    let mut config = PruneConfig::resolve(None, path)?;
    if let Some(safe) = safe {
        config.safe = safe;
    }
    if let Some(offline) = offline_scan {
        config.offline_scan = offline;
    }
    if let Some(keep) = keep_system_ranges {
        config.keep_system_ranges = keep;
    }
    Ok(config)
}

/// Scan request
#[derive(Deserialize)]
pub struct ScanRequest {
    pub file_path: String,
    pub sheets: Vec<String>,
    #[serde(default)]
    pub offline_scan: Option<bool>,
}

/// POST /api/v1/scan - Reference scan (read-only)
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> impl IntoResponse {
    let ScanRequest {
        file_path,
        sheets,
        offline_scan,
    } = req;
    exclusive(&state, &file_path, None, move |path, _| {
        let config = resolve_config(&path, None, offline_scan, None)?;
        run_scan(&path, &sheets, config)
    })
    .await
}

/// Delete-sheet request
#[derive(Deserialize)]
pub struct DeleteSheetRequest {
    pub file_path: String,
    pub sheet: String,
    #[serde(default)]
    pub safe: Option<bool>,
    #[serde(default)]
    pub offline_scan: Option<bool>,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// POST /api/v1/delete-sheet - Delete one sheet
pub async fn delete_sheet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteSheetRequest>,
) -> impl IntoResponse {
    let DeleteSheetRequest {
        file_path,
        sheet,
        safe,
        offline_scan,
        output_path,
    } = req;
    exclusive(&state, &file_path, output_path, move |path, output| {
        let config = resolve_config(&path, safe, offline_scan, None)?;
        run_delete_sheet(&path, &sheet, config, output.as_deref())
    })
    .await
}

/// Delete-hidden request
#[derive(Deserialize)]
pub struct DeleteHiddenRequest {
    pub file_path: String,
    #[serde(default)]
    pub safe: Option<bool>,
    #[serde(default)]
    pub offline_scan: Option<bool>,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// POST /api/v1/delete-hidden - Delete every hidden sheet
pub async fn delete_hidden(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteHiddenRequest>,
) -> impl IntoResponse {
    let DeleteHiddenRequest {
        file_path,
        safe,
        offline_scan,
        output_path,
    } = req;
    exclusive(&state, &file_path, output_path, move |path, output| {
        let config = resolve_config(&path, safe, offline_scan, None)?;
        run_delete_hidden(&path, config, output.as_deref())
    })
    .await
}

/// Clean-names request
#[derive(Deserialize)]
pub struct CleanNamesRequest {
    pub file_path: String,
    #[serde(default)]
    pub broken_only: bool,
    #[serde(default)]
    pub keep_system_ranges: Option<bool>,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// POST /api/v1/clean-names - Delete user-defined named ranges
pub async fn clean_names(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CleanNamesRequest>,
) -> impl IntoResponse {
    let CleanNamesRequest {
        file_path,
        broken_only,
        keep_system_ranges,
        output_path,
    } = req;
    exclusive(&state, &file_path, output_path, move |path, output| {
        let config = resolve_config(&path, None, None, keep_system_ranges)?;
        run_clean_names(&path, broken_only, config, output.as_deref())
    })
    .await
}

/// Break-links request
#[derive(Deserialize)]
pub struct BreakLinksRequest {
    pub file_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// POST /api/v1/break-links - Break external links
pub async fn break_links(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BreakLinksRequest>,
) -> impl IntoResponse {
    let BreakLinksRequest {
        file_path,
        output_path,
    } = req;
    exclusive(&state, &file_path, output_path, move |path, output| {
        let config = resolve_config(&path, None, None, None)?;
        run_break_links(&path, config, output.as_deref())
    })
    .await
}
