//! Excel exporter implementation - MemoryWorkbook → Excel (.xlsx)

use crate::error::{PruneError, PruneResult};
use crate::types::{CellValue, NameScope, NamedRange};
use crate::workbook::{MemoryCell, MemorySheet, MemoryWorkbook};
use rust_xlsxwriter::{Formula, Workbook, Worksheet};
use std::path::Path;
use tracing::{debug, warn};

/// Writes values, formulas with cached results, sheet visibility and
/// defined names. External link parts are not written.
pub struct XlsxExporter<'a> {
    document: &'a MemoryWorkbook,
}

impl<'a> XlsxExporter<'a> {
    pub fn new(document: &'a MemoryWorkbook) -> Self {
        Self { document }
    }

    pub fn export(&self, output_path: &Path) -> PruneResult<()> {
        let mut workbook = Workbook::new();

        let first_visible = self
            .document
            .sheets()
            .iter()
            .position(|s| !s.visibility().is_hidden());

        for (i, sheet) in self.document.sheets().iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            self.export_sheet(worksheet, sheet)?;
            if Some(i) == first_visible {
                worksheet.set_active(true);
            }
        }

        for range in self.document.names() {
            let name = qualified_name(range);
            if let Err(e) = workbook.define_name(name.as_str(), &range.refers_to) {
                warn!(name = %name, error = %e, "defined name not written");
            }
        }

        if !self.document.links().is_empty() {
            warn!(
                links = self.document.links().len(),
                "external link parts are not written; linked formulas keep their cached values on reload"
            );
        }

        workbook
            .save(output_path)
            .map_err(|e| PruneError::Excel(format!("Failed to save Excel file: {}", e)))?;
        debug!(path = %output_path.display(), "workbook saved");

        Ok(())
    }

    fn export_sheet(&self, worksheet: &mut Worksheet, sheet: &MemorySheet) -> PruneResult<()> {
        worksheet
            .set_name(sheet.name())
            .map_err(|e| PruneError::Excel(format!("Failed to set worksheet name: {}", e)))?;
        if sheet.visibility().is_hidden() {
            worksheet.set_hidden(true);
        }

        for (address, cell) in sheet.cells() {
            write_cell(worksheet, address.row, address.col, cell).map_err(|e| {
                PruneError::Excel(format!(
                    "Failed to write {}!{}: {}",
                    sheet.name(),
                    address,
                    e
                ))
            })?;
        }
        Ok(())
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &MemoryCell,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    if let Some(formula) = &cell.formula {
        let mut formula = Formula::new(formula.as_str());
        if !cell.value.is_empty() {
            formula = formula.set_result(cell.value.to_string());
        }
        worksheet.write_formula(row, col, formula)?;
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        // The writer has no literal error cells; keep the token as text
        CellValue::Error(token) => {
            worksheet.write_string(row, col, token)?;
        }
    }
    Ok(())
}

/// `Sheet!Name` for sheet-scoped names, quoting the sheet when needed
fn qualified_name(range: &NamedRange) -> String {
    match &range.scope {
        NameScope::Workbook => range.name.clone(),
        NameScope::Sheet(sheet) => {
            let needs_quotes = sheet
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '_'));
            if needs_quotes {
                format!("'{}'!{}", sheet.replace('\'', "''"), range.name)
            } else {
                format!("{}!{}", sheet, range.name)
            }
        }
    }
}
