//! Sheet deletion orchestration and the public mutation surface
//!
//! A [`DocumentSession`] borrows one open workbook mutably for its whole
//! life, which is what keeps two callers from mutating the same document at
//! once. It performs no locking of its own.

use super::alerts::AlertGuard;
use super::named_ranges;
use super::neutralizer::neutralize_all;
use super::links;
use super::scanner::{FormulaScanner, LiveScanner, OfflineReader, OfflineScanner};
use crate::config::{PartialFailurePolicy, PruneConfig};
use crate::error::{PruneError, PruneResult};
use crate::types::{
    DeletionPhase, LinkBreakReport, NamedRangeCleanupReport, ScanOutcome, SheetDeletionReport,
    SheetFailure,
};
use crate::workbook::Workbook;
use tracing::{info, warn};

pub struct DocumentSession<'w, W: Workbook> {
    workbook: &'w mut W,
    reader: Option<Box<dyn OfflineReader>>,
    config: PruneConfig,
}

impl<'w, W: Workbook> DocumentSession<'w, W> {
    /// Session without an offline reader; scans use the live interface
    pub fn new(workbook: &'w mut W, config: PruneConfig) -> Self {
        Self {
            workbook,
            reader: None,
            config,
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn OfflineReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    pub fn workbook(&self) -> &W {
        self.workbook
    }

    pub fn visible_sheet_names(&self) -> PruneResult<Vec<String>> {
        self.sheets_where(|hidden| !hidden)
    }

    pub fn hidden_sheet_names(&self) -> PruneResult<Vec<String>> {
        self.sheets_where(|hidden| hidden)
    }

    fn sheets_where(&self, keep: impl Fn(bool) -> bool) -> PruneResult<Vec<String>> {
        let mut names = Vec::new();
        for name in self.workbook.sheet_names() {
            if keep(self.workbook.sheet_visibility(&name)?.is_hidden()) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Find formulas outside `targets` that reference any sheet in `targets`.
    ///
    /// Uses the offline reader when one is attached and enabled, falling back
    /// to the live walk (with a warning) when it cannot be used.
    pub fn scan_references(&mut self, targets: &[String]) -> PruneResult<ScanOutcome> {
        let mut warnings = Vec::new();

        match (&self.reader, self.config.offline_scan) {
            (Some(reader), true) => {
                let scanner = OfflineScanner::new(reader.as_ref());
                match scanner.scan(&mut *self.workbook, targets) {
                    Ok(sites) => {
                        return Ok(ScanOutcome {
                            strategy: scanner.strategy(),
                            sites,
                            warnings,
                        });
                    }
                    Err(PruneError::ResourceUnavailable(reason)) => {
                        warnings.push(format!(
                            "offline reader unavailable ({}); using slow live scan",
                            reason
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
            (Some(_), false) => {
                warnings.push("offline scanning disabled; using slow live scan".to_string())
            }
            (None, _) => {
                warnings.push("no offline reader attached; using slow live scan".to_string())
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        let sites = LiveScanner.scan(&mut *self.workbook, targets)?;
        Ok(ScanOutcome {
            strategy: LiveScanner.strategy(),
            sites,
            warnings,
        })
    }

    /// Delete one sheet. With `safe`, formulas elsewhere that reference it
    /// are frozen to their values first.
    pub fn delete_sheet(&mut self, name: &str, safe: bool) -> PruneResult<SheetDeletionReport> {
        let mut report = SheetDeletionReport::new(vec![name.to_string()], safe);

        if !self.workbook.has_sheet(name) {
            enter(&mut report, DeletionPhase::Failed);
            return Err(PruneError::SheetNotFound(name.to_string()));
        }

        let targets = vec![name.to_string()];
        if safe {
            self.neutralize_references(&targets, &mut report)?;
        }

        enter(&mut report, DeletionPhase::Deleting);
        let removed = AlertGuard::suppress(&mut *self.workbook).remove_sheet(name);
        if let Err(e) = removed {
            enter(&mut report, DeletionPhase::Failed);
            return Err(e);
        }
        report.deleted.push(name.to_string());

        enter(&mut report, DeletionPhase::Done);
        Ok(report)
    }

    /// Delete every hidden sheet, scanning for references to the whole set
    /// once before anything is removed.
    pub fn delete_hidden_sheets(&mut self, safe: bool) -> PruneResult<SheetDeletionReport> {
        let hidden = self.hidden_sheet_names()?;
        let mut report = SheetDeletionReport::new(hidden.clone(), safe);

        if hidden.is_empty() {
            info!("no hidden sheets to delete");
            enter(&mut report, DeletionPhase::Done);
            return Ok(report);
        }
        info!(count = hidden.len(), safe, "deleting hidden sheets");

        if safe {
            self.neutralize_references(&hidden, &mut report)?;
        }

        enter(&mut report, DeletionPhase::Deleting);
        for name in &hidden {
            let removed = AlertGuard::suppress(&mut *self.workbook).remove_sheet(name);
            match removed {
                Ok(()) => report.deleted.push(name.clone()),
                Err(e) => {
                    warn!(sheet = %name, error = %e, "could not delete sheet");
                    report.sheet_failures.push(SheetFailure {
                        sheet: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        enter(&mut report, DeletionPhase::Done);
        Ok(report)
    }

    /// Scanning → Neutralizing for a deletion set
    fn neutralize_references(
        &mut self,
        targets: &[String],
        report: &mut SheetDeletionReport,
    ) -> PruneResult<()> {
        enter(report, DeletionPhase::Scanning);
        let outcome = match self.scan_references(targets) {
            Ok(outcome) => outcome,
            Err(e) => {
                enter(report, DeletionPhase::Failed);
                return Err(e);
            }
        };
        report.strategy = Some(outcome.strategy);
        report.sites_found = outcome.sites.len();
        report.warnings.extend(outcome.warnings);

        enter(report, DeletionPhase::Neutralizing);
        let neutralized = neutralize_all(&mut *self.workbook, &outcome.sites);
        report.neutralized = neutralized.neutralized;
        report.neutralization_failures = neutralized.failures;

        let failed = report.neutralization_failures.len();
        if failed > 0 {
            match self.config.on_partial_failure {
                PartialFailurePolicy::BestEffort => {
                    warn!(failed, "continuing with deletion despite neutralization failures");
                }
                PartialFailurePolicy::Abort => {
                    enter(report, DeletionPhase::Failed);
                    return Err(PruneError::PartialNeutralization(failed));
                }
            }
        }
        Ok(())
    }

    /// Delete named ranges selected by classification
    pub fn cleanup_named_ranges(
        &mut self,
        broken_only: bool,
        keep_system_ranges: bool,
    ) -> NamedRangeCleanupReport {
        named_ranges::cleanup(&mut *self.workbook, broken_only, keep_system_ranges)
    }

    /// Delete a single named range by name
    pub fn delete_named_range(&mut self, name: &str) -> PruneResult<()> {
        self.workbook.delete_named_range(name)
    }

    pub fn break_external_links(&mut self) -> LinkBreakReport {
        links::break_all(&mut *self.workbook)
    }
}

fn enter(report: &mut SheetDeletionReport, phase: DeletionPhase) {
    info!(sheets = ?report.requested, ?phase, "deletion phase");
    report.phases.push(phase);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellAddress, CellValue};
    use crate::workbook::MemoryWorkbook;

    fn scenario() -> MemoryWorkbook {
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

    #[test]
    fn test_safe_delete_phases() {
        let mut wb = scenario();
        let mut session = DocumentSession::new(&mut wb, PruneConfig::default());

        let report = session.delete_sheet("Hidden1", true).unwrap();

        assert_eq!(
            report.phases,
            vec![
                DeletionPhase::Pending,
                DeletionPhase::Scanning,
                DeletionPhase::Neutralizing,
                DeletionPhase::Deleting,
                DeletionPhase::Done,
            ]
        );
        assert_eq!(report.sites_found, 1);
        assert_eq!(report.neutralized, 1);
        let b2 = CellAddress::parse("B2").unwrap();
        assert_eq!(wb.value("Calc", b2).unwrap(), CellValue::Number(20.0));
        assert!(!wb.has_formula("Calc", b2).unwrap());
    }

    #[test]
    fn test_unsafe_delete_skips_scan() {
        let mut wb = scenario();
        let mut session = DocumentSession::new(&mut wb, PruneConfig::default());

        let report = session.delete_sheet("Hidden1", false).unwrap();

        assert_eq!(
            report.phases,
            vec![DeletionPhase::Pending, DeletionPhase::Deleting, DeletionPhase::Done]
        );
        assert_eq!(report.strategy, None);
        let b2 = CellAddress::parse("B2").unwrap();
        assert!(wb.value("Calc", b2).unwrap().is_error());
    }

    #[test]
    fn test_missing_sheet_is_fatal() {
        let mut wb = scenario();
        let mut session = DocumentSession::new(&mut wb, PruneConfig::default());
        let err = session.delete_sheet("Nope", true).unwrap_err();
        assert!(matches!(err, PruneError::SheetNotFound(name) if name == "Nope"));
        assert!(wb.display_alerts());
    }

    #[test]
    fn test_live_fallback_warns() {
        let mut wb = scenario();
        let mut session = DocumentSession::new(&mut wb, PruneConfig::default());
        let outcome = session.scan_references(&["Hidden1".to_string()]).unwrap();
        assert_eq!(outcome.strategy, crate::types::ScanStrategy::Live);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_hidden_and_visible_names() {
        let mut wb = scenario();
        let session = DocumentSession::new(&mut wb, PruneConfig::default());
        assert_eq!(session.hidden_sheet_names().unwrap(), vec!["Hidden1"]);
        assert_eq!(session.visible_sheet_names().unwrap(), vec!["Data", "Calc"]);
    }
}
