//! Sheetprune API Server binary
//!
//! HTTP REST API for Sheetprune.
//! Provides scan, delete-sheet, delete-hidden, clean-names, break-links endpoints.

use clap::Parser;
use sheetprune::api::{run_api_server, server::ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "sheetprune-server")]
#[command(version)]
#[command(author = "RoyalBit Inc. <admin@royalbit.ca>")]
#[command(about = "Sheetprune API Server - HTTP REST API for safe workbook cleanup")]
#[command(long_about = r#"
Sheetprune API Server - HTTP REST API

Provides RESTful endpoints for all Sheetprune operations:
  - POST /api/v1/scan          - List formulas referencing sheets (read-only)
  - POST /api/v1/delete-sheet  - Delete one sheet (safe by default)
  - POST /api/v1/delete-hidden - Delete every hidden sheet
  - POST /api/v1/clean-names   - Delete user-defined named ranges
  - POST /api/v1/break-links   - Break external links

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                  - API documentation

Requests against the same file run one at a time.

Example usage:
  sheetprune-server                           # Start on localhost:8080
  sheetprune-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/delete-hidden \
    -H "Content-Type: application/json" \
    -d '{"file_path": "model.xlsx", "output_path": "model-clean.xlsx"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETPRUNE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SHEETPRUNE_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config).await
}
