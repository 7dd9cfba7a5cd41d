//! Sheetprune - safe structural cleanup for spreadsheet workbooks
//!
//! Deleting a sheet that other formulas point at leaves `#REF!` behind.
//! This library finds those formulas first, freezes them to their current
//! values, and only then removes the sheet. It also purges user-defined
//! named ranges and severs links to external workbooks.
//!
//! # Features
//!
//! - Reference scanning with a fast offline path and a slow live fallback
//! - Sheet deletion as a Scanning → Neutralizing → Deleting state machine
//! - Named range classification (system, malformed, cell-like, broken)
//! - External link breaking with per-link failure reporting
//! - .xlsx import/export
//!
//! # Example
//!
//! ```no_run
//! use sheetprune::config::PruneConfig;
//! use sheetprune::core::DocumentSession;
//! use sheetprune::excel::{CalamineFormulaReader, XlsxImporter};
//!
//! let mut workbook = XlsxImporter::new("model.xlsx").import()?;
//! let mut session = DocumentSession::new(&mut workbook, PruneConfig::default())
//!     .with_reader(Box::new(CalamineFormulaReader));
//!
//! let report = session.delete_hidden_sheets(true)?;
//! println!("Deleted: {:?}", report.deleted);
//! # Ok::<(), sheetprune::error::PruneError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use config::PruneConfig;
pub use core::DocumentSession;
pub use error::{PruneError, PruneResult};
pub use types::{
    CellAddress, CellValue, FormulaSite, LinkBreakReport, NamedRange, NamedRangeCleanupReport,
    ScanOutcome, SheetDeletionReport,
};
pub use workbook::{MemoryWorkbook, Workbook};
