//! Sheetprune API Server module
//!
//! HTTP REST API over the same operations as the CLI.
//! Run with `sheetprune-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, AppState};
