//! In-process workbook host
//!
//! Holds sheets, names and link sources in memory and reacts to structural
//! changes the way a spreadsheet application does: removing a sheet turns
//! surviving references to it into `#REF!`, breaking a link freezes the
//! formulas that used it. Persistence goes through [`XlsxExporter`].

use super::Workbook;
use crate::core::reference::{invalidate_references, references_sheet, BROKEN_REFERENCE};
use crate::error::{PruneError, PruneResult};
use crate::excel::XlsxExporter;
use crate::types::{CellAddress, CellValue, NameScope, NamedRange, SheetVisibility};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCell {
    pub formula: Option<String>,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySheet {
    name: String,
    visibility: SheetVisibility,
    cells: BTreeMap<CellAddress, MemoryCell>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: SheetVisibility::Visible,
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: SheetVisibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    pub fn hide(&mut self) -> &mut Self {
        self.set_visibility(SheetVisibility::Hidden)
    }

    /// Store a static value at an A1 address
    pub fn set_value(
        &mut self,
        address: &str,
        value: impl Into<CellValue>,
    ) -> PruneResult<&mut Self> {
        let address = CellAddress::parse(address)?;
        self.put(address, None, value.into());
        Ok(self)
    }

    /// Store a formula together with its last computed value
    pub fn set_formula(
        &mut self,
        address: &str,
        formula: &str,
        cached: impl Into<CellValue>,
    ) -> PruneResult<&mut Self> {
        let address = CellAddress::parse(address)?;
        self.put(address, Some(formula.to_string()), cached.into());
        Ok(self)
    }

    pub fn cell(&self, address: CellAddress) -> Option<&MemoryCell> {
        self.cells.get(&address)
    }

    /// Non-empty cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &MemoryCell)> {
        self.cells.iter()
    }

    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|c| c.formula.is_some()).count()
    }

    /// Raw store; formulas gain a leading `=` if missing
    pub(crate) fn put(&mut self, address: CellAddress, formula: Option<String>, value: CellValue) {
        let formula = formula.map(|f| normalize_formula(&f));
        if formula.is_none() && value.is_empty() {
            self.cells.remove(&address);
        } else {
            self.cells.insert(address, MemoryCell { formula, value });
        }
    }

    /// Smallest rectangle holding every stored cell
    fn used_region(&self) -> Option<(CellAddress, CellAddress)> {
        let mut iter = self.cells.keys();
        let first = *iter.next()?;
        let (mut min_row, mut max_row) = (first.row, first.row);
        let (mut min_col, mut max_col) = (first.col, first.col);
        for addr in iter {
            min_row = min_row.min(addr.row);
            max_row = max_row.max(addr.row);
            min_col = min_col.min(addr.col);
            max_col = max_col.max(addr.col);
        }
        Some((
            CellAddress::new(min_row, min_col),
            CellAddress::new(max_row, max_col),
        ))
    }
}

/// A dependency on another document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    pub source: String,
    /// 1-based position; formulas address the link as `[index]`
    pub index: usize,
}

impl ExternalLink {
    /// Tokens a formula may use to point at this link
    fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![format!("[{}]", self.index)];
        // Sources may be Windows paths, URLs or bare file names
        let file_name = self
            .source
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.source);
        tokens.push(format!("[{}]", file_name));
        tokens
    }
}

#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    names: Vec<NamedRange>,
    links: Vec<ExternalLink>,
    display_alerts: bool,
    storage: Option<PathBuf>,
    dirty: bool,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            names: Vec::new(),
            links: Vec::new(),
            display_alerts: true,
            storage: None,
            dirty: false,
        }
    }

    /// Append a sheet; names must be unique (case-insensitive, as in the host)
    pub fn add_sheet(&mut self, name: &str) -> PruneResult<&mut MemorySheet> {
        if name.trim().is_empty() {
            return Err(PruneError::Validation("sheet name is empty".to_string()));
        }
        if self.sheets.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(PruneError::Validation(format!(
                "sheet '{}' already exists",
                name
            )));
        }
        self.dirty = true;
        self.sheets.push(MemorySheet::new(name));
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut MemorySheet> {
        self.dirty = true;
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn sheets(&self) -> &[MemorySheet] {
        &self.sheets
    }

    pub fn add_named_range(&mut self, range: NamedRange) -> &mut Self {
        self.dirty = true;
        self.names.push(range);
        self
    }

    pub fn names(&self) -> &[NamedRange] {
        &self.names
    }

    /// Register an external source; its index is assigned in insertion order
    pub fn add_link(&mut self, source: impl Into<String>) -> usize {
        self.dirty = true;
        let index = self.links.iter().map(|l| l.index).max().unwrap_or(0) + 1;
        self.links.push(ExternalLink {
            source: source.into(),
            index,
        });
        index
    }

    pub(crate) fn push_link(&mut self, link: ExternalLink) {
        self.links.push(link);
    }

    pub fn links(&self) -> &[ExternalLink] {
        &self.links
    }

    pub fn storage(&self) -> Option<&Path> {
        self.storage.as_deref()
    }

    /// Where `persist` writes
    pub fn set_storage(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.storage.as_ref() != Some(&path) {
            self.dirty = true;
        }
        self.storage = Some(path);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Write to the storage location unconditionally
    pub fn save(&mut self) -> PruneResult<PathBuf> {
        let path = self.storage.clone().ok_or_else(|| {
            PruneError::Validation("workbook has no storage location".to_string())
        })?;
        XlsxExporter::new(self).export(&path)?;
        self.dirty = false;
        Ok(path)
    }

    fn find(&self, sheet: &str) -> PruneResult<&MemorySheet> {
        self.sheet(sheet)
            .ok_or_else(|| PruneError::SheetNotFound(sheet.to_string()))
    }

    fn find_mut(&mut self, sheet: &str) -> PruneResult<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == sheet)
            .ok_or_else(|| PruneError::SheetNotFound(sheet.to_string()))
    }

    /// Freeze every formula selected by `predicate` to its cached value
    fn freeze_formulas(&mut self, predicate: impl Fn(&str) -> bool) -> usize {
        let mut frozen = 0;
        for sheet in &mut self.sheets {
            for cell in sheet.cells.values_mut() {
                if cell.formula.as_deref().is_some_and(&predicate) {
                    cell.formula = None;
                    frozen += 1;
                }
            }
        }
        frozen
    }
}

fn normalize_formula(formula: &str) -> String {
    if formula.starts_with('=') {
        formula.to_string()
    } else {
        format!("={}", formula)
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn remove_sheet(&mut self, name: &str) -> PruneResult<()> {
        let position = self
            .sheets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| PruneError::SheetNotFound(name.to_string()))?;

        let visible_left = self
            .sheets
            .iter()
            .enumerate()
            .filter(|(i, s)| *i != position && !s.visibility.is_hidden())
            .count();
        if visible_left == 0 {
            return Err(PruneError::SheetRemoval {
                sheet: name.to_string(),
                reason: "a workbook must keep at least one visible sheet".to_string(),
            });
        }

        self.sheets.remove(position);
        self.dirty = true;

        // Surviving references turn into #REF! and compute to the error
        let mut broken = 0;
        for sheet in &mut self.sheets {
            for cell in sheet.cells.values_mut() {
                let Some(formula) = &cell.formula else {
                    continue;
                };
                if !references_sheet(formula, name) {
                    continue;
                }
                let rewritten = invalidate_references(formula, name);
                if rewritten != *formula {
                    cell.formula = Some(rewritten);
                    cell.value = CellValue::Error(BROKEN_REFERENCE.to_string());
                    broken += 1;
                }
            }
        }

        self.names
            .retain(|n| n.scope != NameScope::Sheet(name.to_string()));
        for range in &mut self.names {
            if references_sheet(&range.refers_to, name) {
                range.refers_to = invalidate_references(&range.refers_to, name);
            }
        }

        if broken > 0 {
            debug!(sheet = name, broken, "formulas left with #REF!");
        }
        info!(sheet = name, "sheet removed");
        Ok(())
    }

    fn display_alerts(&self) -> bool {
        self.display_alerts
    }

    fn set_display_alerts(&mut self, enabled: bool) {
        self.display_alerts = enabled;
    }

    fn persist(&mut self) -> PruneResult<Option<PathBuf>> {
        let Some(path) = self.storage.clone() else {
            return Ok(None);
        };
        if self.dirty || !path.exists() {
            self.save()?;
        }
        Ok(Some(path))
    }

    fn named_ranges(&self) -> Vec<NamedRange> {
        self.names.clone()
    }

    fn delete_named_range(&mut self, name: &str) -> PruneResult<()> {
        let position = self
            .names
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| PruneError::NameNotFound(name.to_string()))?;
        self.names.remove(position);
        self.dirty = true;
        Ok(())
    }

    fn link_sources(&self) -> Vec<String> {
        self.links.iter().map(|l| l.source.clone()).collect()
    }

    fn break_link(&mut self, source: &str) -> PruneResult<()> {
        let position = self
            .links
            .iter()
            .position(|l| l.source == source)
            .ok_or_else(|| PruneError::LinkBreakFailure {
                source_id: source.to_string(),
                reason: "no such link source".to_string(),
            })?;
        let link = self.links.remove(position);
        let tokens = link.tokens();
        let frozen = self.freeze_formulas(|f| tokens.iter().any(|t| f.contains(t.as_str())));
        self.dirty = true;
        debug!(source, frozen, "external link broken");
        Ok(())
    }

    fn sheet_visibility(&self, sheet: &str) -> PruneResult<SheetVisibility> {
        Ok(self.find(sheet)?.visibility)
    }

    fn used_cells(
        &self,
        sheet: &str,
    ) -> PruneResult<Box<dyn Iterator<Item = CellAddress> + '_>> {
        let sheet = self.find(sheet)?;
        let Some((start, end)) = sheet.used_region() else {
            return Ok(Box::new(std::iter::empty()));
        };
        Ok(Box::new((start.row..=end.row).flat_map(move |row| {
            (start.col..=end.col).map(move |col| CellAddress::new(row, col))
        })))
    }

    fn has_formula(&self, sheet: &str, address: CellAddress) -> PruneResult<bool> {
        Ok(self
            .find(sheet)?
            .cell(address)
            .is_some_and(|c| c.formula.is_some()))
    }

    fn formula(&self, sheet: &str, address: CellAddress) -> PruneResult<Option<String>> {
        Ok(self
            .find(sheet)?
            .cell(address)
            .and_then(|c| c.formula.clone()))
    }

    fn set_formula(
        &mut self,
        sheet: &str,
        address: CellAddress,
        formula: &str,
    ) -> PruneResult<()> {
        let target = self.find_mut(sheet)?;
        let value = target
            .cell(address)
            .map(|c| c.value.clone())
            .unwrap_or_default();
        target.put(address, Some(formula.to_string()), value);
        self.dirty = true;
        Ok(())
    }

    fn value(&self, sheet: &str, address: CellAddress) -> PruneResult<CellValue> {
        Ok(self
            .find(sheet)?
            .cell(address)
            .map(|c| c.value.clone())
            .unwrap_or_default())
    }

    fn set_value(
        &mut self,
        sheet: &str,
        address: CellAddress,
        value: CellValue,
    ) -> PruneResult<()> {
        self.find_mut(sheet)?.put(address, None, value);
        self.dirty = true;
        Ok(())
    }
}
