//! Sheetprune API Server implementation
//!
//! HTTP REST API server using Axum. Provides endpoints for scan,
//! delete-sheet, delete-hidden, clean-names and break-links.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    /// One async lock per document; requests on the same file run one at a time
    documents: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl AppState {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Locks for `paths` in a fixed order, one per distinct file
    ///
    /// Entries no request holds anymore are dropped on each call, so the map
    /// only tracks documents in use.
    pub fn document_locks(&self, paths: &[&Path]) -> Vec<Arc<tokio::sync::Mutex<()>>> {
        let mut keys: Vec<PathBuf> = paths.iter().map(|p| lock_key(p)).collect();
        keys.sort();
        keys.dedup();

        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.retain(|_, lock| Arc::strong_count(lock) > 1);
        keys.into_iter()
            .map(|key| Arc::clone(documents.entry(key).or_default()))
            .collect()
    }
}

/// Canonical form of `path`; files that do not exist yet resolve through
/// their parent directory
fn lock_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            std::fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// All endpoints plus CORS and request tracing
pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/scan", post(handlers::scan))
        .route("/api/v1/delete-sheet", post(handlers::delete_sheet))
        .route("/api/v1/delete-hidden", post(handlers::delete_hidden))
        .route("/api/v1/clean-names", post(handlers::clean_names))
        .route("/api/v1/break-links", post(handlers::break_links))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetprune=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new(env!("CARGO_PKG_VERSION")));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔥 Sheetprune API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/scan, /api/v1/delete-sheet, /api/v1/delete-hidden, /api/v1/clean-names, /api/v1/break-links");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Sheetprune API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ApiConfig Tests ====================

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_config_custom_values() {
        let config = ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        };
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_config_clone() {
        let config1 = ApiConfig::default();
        let config2 = config1.clone();
        assert_eq!(config1.host, config2.host);
        assert_eq!(config1.port, config2.port);
    }

    #[test]
    fn test_config_address_format() {
        let config = ApiConfig {
            host: "192.168.1.100".to_string(),
            port: 9090,
        };
        let addr_str = format!("{}:{}", config.host, config.port);
        assert_eq!(addr_str, "192.168.1.100:9090");

        // Verify it parses to SocketAddr
        let addr: SocketAddr = addr_str.parse().unwrap();
        assert_eq!(addr.port(), 9090);
    }

    // ==================== AppState Tests ====================

    #[test]
    fn test_app_state_version() {
        let state = AppState::new("0.4.0");
        assert_eq!(state.version, "0.4.0");
    }

    #[test]
    fn test_document_lock_is_shared_per_path() {
        let state = AppState::new("0.4.0");
        let a = state.document_locks(&[Path::new("/tmp/missing-book.xlsx")]);
        let b = state.document_locks(&[Path::new("/tmp/missing-book.xlsx")]);
        let c = state.document_locks(&[Path::new("/tmp/other-book.xlsx")]);
        assert!(Arc::ptr_eq(&a[0], &b[0]));
        assert!(!Arc::ptr_eq(&a[0], &c[0]));
    }

    #[tokio::test]
    async fn test_document_lock_serializes() {
        let state = AppState::new("0.4.0");
        let lock = state.document_locks(&[Path::new("book.xlsx")]);
        let _held = lock[0].lock().await;
        let again = state.document_locks(&[Path::new("book.xlsx")]);
        assert!(again[0].try_lock().is_err());
    }

    #[test]
    fn test_same_file_twice_gives_one_lock() {
        let state = AppState::new("0.4.0");
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.xlsx");
        let locks = state.document_locks(&[book.as_path(), book.as_path()]);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_locks_come_back_in_path_order() {
        let state = AppState::new("0.4.0");
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xlsx");
        let b = dir.path().join("b.xlsx");

        let forward = state.document_locks(&[a.as_path(), b.as_path()]);
        let reverse = state.document_locks(&[b.as_path(), a.as_path()]);

        assert!(Arc::ptr_eq(&forward[0], &reverse[0]));
        assert!(Arc::ptr_eq(&forward[1], &reverse[1]));
    }

    #[tokio::test]
    async fn test_output_lock_blocks_request_on_that_input() {
        let state = AppState::new("0.4.0");
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");
        let output = dir.path().join("out.xlsx");

        let writer = state.document_locks(&[input.as_path(), output.as_path()]);
        let mut _guards = Vec::new();
        for lock in &writer {
            _guards.push(lock.lock().await);
        }

        let reader = state.document_locks(&[output.as_path()]);
        assert!(reader[0].try_lock().is_err());
    }

    #[test]
    fn test_unused_locks_are_pruned() {
        let state = AppState::new("0.4.0");
        let dir = tempfile::tempdir().unwrap();
        let held = state.document_locks(&[dir.path().join("held.xlsx").as_path()]);
        drop(state.document_locks(&[dir.path().join("done.xlsx").as_path()]));

        state.document_locks(&[]);

        let documents = state.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents.values().any(|lock| Arc::ptr_eq(lock, &held[0])));
    }

    #[test]
    fn test_missing_output_keys_like_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let before = lock_key(&out);
        std::fs::write(&out, b"x").unwrap();
        assert_eq!(before, lock_key(&out));
    }
}
