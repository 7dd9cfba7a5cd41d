//! Excel importer implementation - Excel (.xlsx) → MemoryWorkbook

use super::package::PackageMetadata;
use crate::error::{PruneError, PruneResult};
use crate::types::{CellAddress, CellValue, SheetVisibility};
use crate::workbook::{ExternalLink, MemorySheet, MemoryWorkbook};
use calamine::{open_workbook, Data, Range, Reader, SheetType, SheetVisible, Xlsx};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads an .xlsx file as a live document whose storage is the file itself
pub struct XlsxImporter {
    path: PathBuf,
}

impl XlsxImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn import(&self) -> PruneResult<MemoryWorkbook> {
        let mut workbook: Xlsx<BufReader<File>> = open_workbook(&self.path)
            .map_err(|e| PruneError::Excel(format!("Failed to open Excel file: {}", e)))?;

        let mut document = MemoryWorkbook::new();
        let sheets = workbook.sheets_metadata().to_vec();
        let sheet_names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();

        for sheet in &sheets {
            if !matches!(sheet.typ, SheetType::WorkSheet) {
                warn!(sheet = %sheet.name, "skipping non-worksheet sheet");
                continue;
            }
            let values = workbook
                .worksheet_range(&sheet.name)
                .map_err(|e| PruneError::Excel(format!("Failed to read '{}': {}", sheet.name, e)))?;
            let formulas = workbook.worksheet_formula(&sheet.name).ok();

            let target = document.add_sheet(&sheet.name)?;
            target.set_visibility(match sheet.visible {
                SheetVisible::Visible => SheetVisibility::Visible,
                SheetVisible::Hidden => SheetVisibility::Hidden,
                SheetVisible::VeryHidden => SheetVisibility::VeryHidden,
            });
            load_cells(target, &values, formulas.as_ref())?;
            debug!(
                sheet = %sheet.name,
                formulas = target.formula_count(),
                "sheet imported"
            );
        }

        let metadata = PackageMetadata::read(&self.path, &sheet_names)?;
        for range in metadata.names {
            document.add_named_range(range);
        }
        for (i, source) in metadata.links.into_iter().enumerate() {
            document.push_link(ExternalLink {
                source,
                index: i + 1,
            });
        }

        document.set_storage(self.path.clone());
        document.mark_clean();
        Ok(document)
    }
}

fn load_cells(
    sheet: &mut MemorySheet,
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
) -> PruneResult<()> {
    let (row0, col0) = values.start().unwrap_or_default();
    for (row, col, value) in values.used_cells() {
        let address = absolute(row0, col0, row, col)?;
        sheet.put(address, None, convert_value(value));
    }

    if let Some(formulas) = formulas {
        let (row0, col0) = formulas.start().unwrap_or_default();
        for (row, col, formula) in formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let address = absolute(row0, col0, row, col)?;
            let cached = sheet
                .cell(address)
                .map(|c| c.value.clone())
                .unwrap_or_default();
            sheet.put(address, Some(formula.clone()), cached);
        }
    }
    Ok(())
}

/// calamine ranges report positions relative to their start
pub(crate) fn absolute(row0: u32, col0: u32, row: usize, col: usize) -> PruneResult<CellAddress> {
    let row = row0 as usize + row;
    let col = col0 as usize + col;
    match (u32::try_from(row), u16::try_from(col)) {
        (Ok(row), Ok(col)) => Ok(CellAddress::new(row, col)),
        _ => Err(PruneError::InvalidAddress(format!("row {} column {}", row, col))),
    }
}

fn convert_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_error_value() {
        let value = convert_value(&Data::Error(calamine::CellErrorType::Ref));
        assert_eq!(value, CellValue::Error("#REF!".to_string()));
    }

    #[test]
    fn test_absolute_offsets() {
        assert_eq!(absolute(3, 2, 1, 1).unwrap(), CellAddress::new(4, 3));
    }

    #[test]
    fn test_missing_file() {
        let result = XlsxImporter::new("/nonexistent/book.xlsx").import();
        assert!(matches!(result, Err(PruneError::Excel(_))));
    }
}
