//! Shared fixtures for integration tests
//!
//! [`RecordingWorkbook`] wraps a [`MemoryWorkbook`], counts every live call
//! and fails on demand for chosen cells, sheets, names or links.

#![allow(dead_code)]

use sheetprune::error::{PruneError, PruneResult};
use sheetprune::types::{CellAddress, CellValue, NamedRange, SheetVisibility};
use sheetprune::workbook::{MemoryWorkbook, Workbook};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub used_cells: usize,
    pub has_formula: usize,
    pub formula: usize,
    pub value: usize,
    pub set_value: usize,
    pub persist: usize,
    pub remove_sheet: Vec<String>,
    /// Alert flag seen by each `remove_sheet` call
    pub alerts_at_removal: Vec<bool>,
}

impl CallLog {
    /// Calls a scan or neutralization would make
    pub fn scan_and_neutralize_calls(&self) -> usize {
        self.used_cells + self.has_formula + self.formula + self.value + self.set_value
    }
}

pub struct RecordingWorkbook {
    pub inner: MemoryWorkbook,
    calls: RefCell<CallLog>,
    pub failing_cells: HashSet<(String, CellAddress)>,
    pub failing_sheets: HashSet<String>,
    pub failing_names: HashSet<String>,
    pub failing_links: HashSet<String>,
}

impl RecordingWorkbook {
    pub fn new(inner: MemoryWorkbook) -> Self {
        Self {
            inner,
            calls: RefCell::new(CallLog::default()),
            failing_cells: HashSet::new(),
            failing_sheets: HashSet::new(),
            failing_names: HashSet::new(),
            failing_links: HashSet::new(),
        }
    }

    /// Snapshot of the calls made so far
    pub fn calls(&self) -> CallLog {
        self.calls.borrow().clone()
    }

    fn record(&self, update: impl FnOnce(&mut CallLog)) {
        update(&mut self.calls.borrow_mut());
    }

    pub fn fail_cell(mut self, sheet: &str, address: &str) -> Self {
        self.failing_cells
            .insert((sheet.to_string(), CellAddress::parse(address).unwrap()));
        self
    }

    pub fn fail_sheet(mut self, sheet: &str) -> Self {
        self.failing_sheets.insert(sheet.to_string());
        self
    }

    pub fn fail_name(mut self, name: &str) -> Self {
        self.failing_names.insert(name.to_string());
        self
    }

    pub fn fail_link(mut self, source: &str) -> Self {
        self.failing_links.insert(source.to_string());
        self
    }
}

impl Workbook for RecordingWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    fn remove_sheet(&mut self, name: &str) -> PruneResult<()> {
        let alerts = self.inner.display_alerts();
        self.record(|c| {
            c.remove_sheet.push(name.to_string());
            c.alerts_at_removal.push(alerts);
        });
        if self.failing_sheets.contains(name) {
            return Err(PruneError::SheetRemoval {
                sheet: name.to_string(),
                reason: "sheet is protected".to_string(),
            });
        }
        self.inner.remove_sheet(name)
    }

    fn display_alerts(&self) -> bool {
        self.inner.display_alerts()
    }

    fn set_display_alerts(&mut self, enabled: bool) {
        self.inner.set_display_alerts(enabled)
    }

    fn persist(&mut self) -> PruneResult<Option<PathBuf>> {
        self.record(|c| c.persist += 1);
        self.inner.persist()
    }

    fn named_ranges(&self) -> Vec<NamedRange> {
        self.inner.named_ranges()
    }

    fn delete_named_range(&mut self, name: &str) -> PruneResult<()> {
        if self.failing_names.contains(name) {
            return Err(PruneError::NameDeletionFailure {
                name: name.to_string(),
                reason: "name is locked".to_string(),
            });
        }
        self.inner.delete_named_range(name)
    }

    fn link_sources(&self) -> Vec<String> {
        self.inner.link_sources()
    }

    fn break_link(&mut self, source: &str) -> PruneResult<()> {
        if self.failing_links.contains(source) {
            return Err(PruneError::LinkBreakFailure {
                source_id: source.to_string(),
                reason: "source is read-only".to_string(),
            });
        }
        self.inner.break_link(source)
    }

    fn sheet_visibility(&self, sheet: &str) -> PruneResult<SheetVisibility> {
        self.inner.sheet_visibility(sheet)
    }

    fn used_cells(
        &self,
        sheet: &str,
    ) -> PruneResult<Box<dyn Iterator<Item = CellAddress> + '_>> {
        self.record(|c| c.used_cells += 1);
        self.inner.used_cells(sheet)
    }

    fn has_formula(&self, sheet: &str, address: CellAddress) -> PruneResult<bool> {
        self.record(|c| c.has_formula += 1);
        self.inner.has_formula(sheet, address)
    }

    fn formula(&self, sheet: &str, address: CellAddress) -> PruneResult<Option<String>> {
        self.record(|c| c.formula += 1);
        self.inner.formula(sheet, address)
    }

    fn set_formula(
        &mut self,
        sheet: &str,
        address: CellAddress,
        formula: &str,
    ) -> PruneResult<()> {
        self.inner.set_formula(sheet, address, formula)
    }

    fn value(&self, sheet: &str, address: CellAddress) -> PruneResult<CellValue> {
        self.record(|c| c.value += 1);
        self.inner.value(sheet, address)
    }

    fn set_value(
        &mut self,
        sheet: &str,
        address: CellAddress,
        value: CellValue,
    ) -> PruneResult<()> {
        self.record(|c| c.set_value += 1);
        if self.failing_cells.contains(&(sheet.to_string(), address)) {
            return Err(PruneError::CellNotFound {
                sheet: sheet.to_string(),
                address: address.to_string(),
                reason: "cell is locked".to_string(),
            });
        }
        self.inner.set_value(sheet, address, value)
    }
}

pub fn addr(a1: &str) -> CellAddress {
    CellAddress::parse(a1).unwrap()
}

/// Data (visible), Calc (visible, B2 = Hidden1!A1*2), Hidden1 (hidden, A1 = 10)
pub fn hidden_reference_workbook() -> MemoryWorkbook {
    let mut wb = MemoryWorkbook::new();
    wb.add_sheet("Data").unwrap().set_value("A1", 1.0).unwrap();
    wb.add_sheet("Calc")
        .unwrap()
        .set_formula("B2", "=Hidden1!A1*2", 20.0)
        .unwrap();
    wb.add_sheet("Hidden1")
        .unwrap()
        .hide()
        .set_value("A1", 10.0)
        .unwrap();
    wb
}
