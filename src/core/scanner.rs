//! Formula reference scanning
//!
//! Two strategies share one contract: given the sheets about to be removed,
//! return every formula in the *other* sheets whose text references one of
//! them. [`OfflineScanner`] persists the document and walks the saved file's
//! formula cells; [`LiveScanner`] asks the live interface about every used
//! cell. Both must find the same `(sheet, address)` set.

use super::reference::ReferenceMatcher;
use crate::error::{PruneError, PruneResult};
use crate::types::{FormulaSite, ScanStrategy};
use crate::workbook::Workbook;
use std::path::Path;
use tracing::debug;

/// Lazy sequence of formula cells read from a persisted document
pub type FormulaCells = Box<dyn Iterator<Item = PruneResult<FormulaSite>>>;

/// Read-only structural reader over a document's storage form.
///
/// Each call starts a fresh, finite pass over every formula-bearing cell.
pub trait OfflineReader {
    fn formula_cells(&self, location: &Path) -> PruneResult<FormulaCells>;
}

pub trait FormulaScanner {
    fn strategy(&self) -> ScanStrategy;

    /// Sites outside `targets` that reference any sheet in `targets`,
    /// sorted by sheet then address
    fn scan(&self, workbook: &mut dyn Workbook, targets: &[String])
        -> PruneResult<Vec<FormulaSite>>;
}

/// Fast path: structural read of the persisted file
pub struct OfflineScanner<'r> {
    reader: &'r dyn OfflineReader,
}

impl<'r> OfflineScanner<'r> {
    pub fn new(reader: &'r dyn OfflineReader) -> Self {
        Self { reader }
    }
}

impl FormulaScanner for OfflineScanner<'_> {
    fn strategy(&self) -> ScanStrategy {
        ScanStrategy::Offline
    }

    fn scan(
        &self,
        workbook: &mut dyn Workbook,
        targets: &[String],
    ) -> PruneResult<Vec<FormulaSite>> {
        let matcher = ReferenceMatcher::new(targets);

        // The reader only sees what is on disk, so flush pending edits first
        let location = workbook
            .persist()
            .map_err(|e| PruneError::ResourceUnavailable(format!("could not persist document: {}", e)))?
            .ok_or_else(|| {
                PruneError::ResourceUnavailable("document has no storage location".to_string())
            })?;

        let mut sites = Vec::new();
        let mut examined = 0usize;
        for cell in self.reader.formula_cells(&location)? {
            let cell = cell?;
            examined += 1;
            if matcher.is_target(&cell.sheet) {
                continue;
            }
            if matcher.matches(&cell.formula) {
                sites.push(cell);
            }
        }

        debug!(examined, found = sites.len(), "offline scan complete");
        Ok(sort_sites(workbook, sites))
    }
}

/// Slow path: every used cell of every surviving sheet through the live interface
pub struct LiveScanner;

impl FormulaScanner for LiveScanner {
    fn strategy(&self) -> ScanStrategy {
        ScanStrategy::Live
    }

    fn scan(
        &self,
        workbook: &mut dyn Workbook,
        targets: &[String],
    ) -> PruneResult<Vec<FormulaSite>> {
        let workbook: &dyn Workbook = workbook;
        let matcher = ReferenceMatcher::new(targets);
        let mut sites = Vec::new();
        let mut examined = 0usize;

        for sheet in workbook.sheet_names() {
            if matcher.is_target(&sheet) {
                continue;
            }
            for address in workbook.used_cells(&sheet)? {
                examined += 1;
                if !workbook.has_formula(&sheet, address)? {
                    continue;
                }
                if let Some(formula) = workbook.formula(&sheet, address)? {
                    if matcher.matches(&formula) {
                        sites.push(FormulaSite::new(sheet.as_str(), address, formula));
                    }
                }
            }
        }

        debug!(examined, found = sites.len(), "live scan complete");
        Ok(sort_sites(workbook, sites))
    }
}

/// Document sheet order, then row-major within a sheet
fn sort_sites(workbook: &dyn Workbook, mut sites: Vec<FormulaSite>) -> Vec<FormulaSite> {
    let order = workbook.sheet_names();
    sites.sort_by_key(|s| {
        (
            order.iter().position(|n| *n == s.sheet).unwrap_or(usize::MAX),
            s.address,
        )
    });
    sites
}
