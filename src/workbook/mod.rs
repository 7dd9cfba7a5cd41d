//! Live document interface
//!
//! [`Workbook`] is the seam between the mutation core and whatever host holds
//! the open document. Every call is synchronous; the core never issues two at
//! once. [`MemoryWorkbook`] is the in-process host used by the CLI, the API
//! server and the tests.

mod memory;

pub use memory::{ExternalLink, MemoryCell, MemorySheet, MemoryWorkbook};

use crate::error::PruneResult;
use crate::types::{CellAddress, CellValue, NamedRange, SheetVisibility};
use std::path::PathBuf;

pub trait Workbook {
    // --- Document ---

    /// Sheet names in document order
    fn sheet_names(&self) -> Vec<String>;

    fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|n| n == name)
    }

    fn remove_sheet(&mut self, name: &str) -> PruneResult<()>;

    /// Whether the host shows confirmation prompts
    fn display_alerts(&self) -> bool;

    fn set_display_alerts(&mut self, enabled: bool);

    /// Flush current state to stable storage. `Ok(None)` when the document
    /// has no storage location.
    fn persist(&mut self) -> PruneResult<Option<PathBuf>>;

    fn named_ranges(&self) -> Vec<NamedRange>;

    fn delete_named_range(&mut self, name: &str) -> PruneResult<()>;

    /// External document identifiers this workbook links to
    fn link_sources(&self) -> Vec<String>;

    fn break_link(&mut self, source: &str) -> PruneResult<()>;

    // --- Sheet ---

    fn sheet_visibility(&self, sheet: &str) -> PruneResult<SheetVisibility>;

    /// Every address inside the sheet's used region, empty cells included,
    /// produced lazily in row-major order
    fn used_cells(&self, sheet: &str)
        -> PruneResult<Box<dyn Iterator<Item = CellAddress> + '_>>;

    // --- Cell ---

    fn has_formula(&self, sheet: &str, address: CellAddress) -> PruneResult<bool>;

    fn formula(&self, sheet: &str, address: CellAddress) -> PruneResult<Option<String>>;

    fn set_formula(&mut self, sheet: &str, address: CellAddress, formula: &str)
        -> PruneResult<()>;

    /// Current (computed) value
    fn value(&self, sheet: &str, address: CellAddress) -> PruneResult<CellValue>;

    /// Write a static value; any formula in the cell is removed
    fn set_value(&mut self, sheet: &str, address: CellAddress, value: CellValue)
        -> PruneResult<()>;
}
