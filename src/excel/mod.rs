//! .xlsx persistence for the in-process host
//!
//! - Import: Excel (.xlsx) → [`MemoryWorkbook`](crate::workbook::MemoryWorkbook)
//! - Export: MemoryWorkbook → Excel (.xlsx)
//! - Offline formula reader used by the fast reference scan

mod exporter;
mod importer;
mod package;
mod reader;

pub use exporter::XlsxExporter;
pub use importer::XlsxImporter;
pub use package::PackageMetadata;
pub use reader::CalamineFormulaReader;
