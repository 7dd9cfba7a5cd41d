//! Offline formula reader over a saved .xlsx file

use super::importer::absolute;
use crate::core::scanner::{FormulaCells, OfflineReader};
use crate::error::{PruneError, PruneResult};
use crate::types::FormulaSite;
use calamine::{open_workbook, Reader, SheetType, Xlsx};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Structural reader backed by calamine; never touches the live document
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineFormulaReader;

impl OfflineReader for CalamineFormulaReader {
    fn formula_cells(&self, location: &Path) -> PruneResult<FormulaCells> {
        let workbook: Xlsx<BufReader<File>> = open_workbook(location).map_err(|e| {
            PruneError::ResourceUnavailable(format!("cannot open {}: {}", location.display(), e))
        })?;
        let pending = workbook
            .sheets_metadata()
            .iter()
            .filter(|s| matches!(s.typ, SheetType::WorkSheet))
            .map(|s| s.name.clone())
            .collect();

        Ok(Box::new(SheetFormulaIter {
            workbook,
            pending,
            buffered: Vec::new().into_iter(),
        }))
    }
}

/// Loads one sheet's formula range at a time
struct SheetFormulaIter {
    workbook: Xlsx<BufReader<File>>,
    pending: VecDeque<String>,
    buffered: std::vec::IntoIter<FormulaSite>,
}

impl SheetFormulaIter {
    fn load(&mut self, sheet: &str) -> PruneResult<Vec<FormulaSite>> {
        let range = self.workbook.worksheet_formula(sheet).map_err(|e| {
            PruneError::ResourceUnavailable(format!("cannot read formulas of '{}': {}", sheet, e))
        })?;
        let (row0, col0) = range.start().unwrap_or_default();

        let mut sites = Vec::new();
        for (row, col, formula) in range.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let address = absolute(row0, col0, row, col)?;
            sites.push(FormulaSite::new(sheet, address, formula.as_str()));
        }
        Ok(sites)
    }
}

impl Iterator for SheetFormulaIter {
    type Item = PruneResult<FormulaSite>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(site) = self.buffered.next() {
                return Some(Ok(site));
            }
            let sheet = self.pending.pop_front()?;
            match self.load(&sheet) {
                Ok(sites) => self.buffered = sites.into_iter(),
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}
