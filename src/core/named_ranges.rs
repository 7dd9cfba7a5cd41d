//! Named range classification and bulk cleanup

use super::reference::BROKEN_REFERENCE;
use crate::types::{NameClass, NameFailure, NamedRange, NamedRangeCleanupReport};
use crate::workbook::Workbook;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Prefixes the host uses for internal encodings (future functions,
/// lambda parameters, built-in names)
const SYSTEM_PREFIXES: [&str; 4] = ["_xlfn.", "_xlpm.", "_xlws.", "_xlnm."];

/// Built-in print settings stored as ordinary names
const PROTECTED_NAMES: [&str; 2] = ["Print_Area", "Print_Titles"];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

static CELL_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{1,3}[0-9]+$").expect("valid cell pattern"));

/// Classify a name; the first matching rule wins
pub fn classify(range: &NamedRange) -> NameClass {
    let name = range.name.as_str();

    if SYSTEM_PREFIXES
        .iter()
        .any(|p| name.get(..p.len()).is_some_and(|head| head.eq_ignore_ascii_case(p)))
    {
        return NameClass::SystemReserved;
    }
    if !IDENTIFIER.is_match(name) {
        return NameClass::MalformedIdentifier;
    }
    if CELL_LIKE.is_match(name) {
        return NameClass::CellLikeIdentifier;
    }
    if range.refers_to.contains(BROKEN_REFERENCE) {
        NameClass::Broken
    } else {
        NameClass::Eligible
    }
}

/// Print-area style names kept when `keep_system_ranges` is set
pub fn is_protected(name: &str) -> bool {
    PROTECTED_NAMES.iter().any(|p| p.eq_ignore_ascii_case(name))
}

/// Names to delete under the given policy, in document order
pub fn select_for_deletion(
    ranges: &[NamedRange],
    broken_only: bool,
    keep_system_ranges: bool,
) -> Vec<String> {
    ranges
        .iter()
        .filter(|range| match classify(range) {
            NameClass::Broken => broken_only,
            NameClass::Eligible => {
                !broken_only && !(keep_system_ranges && is_protected(&range.name))
            }
            _ => false,
        })
        .map(|range| range.name.clone())
        .collect()
}

/// Delete every selected name, one at a time; failures are collected
pub fn cleanup(
    workbook: &mut dyn Workbook,
    broken_only: bool,
    keep_system_ranges: bool,
) -> NamedRangeCleanupReport {
    let selected = select_for_deletion(&workbook.named_ranges(), broken_only, keep_system_ranges);
    let mut report = NamedRangeCleanupReport::default();

    for name in selected {
        report.attempted += 1;
        match workbook.delete_named_range(&name) {
            Ok(()) => {
                info!(name = %name, "named range deleted");
                report.succeeded += 1;
                report.deleted.push(name);
            }
            Err(e) => {
                warn!(name = %name, error = %e, "could not delete named range");
                report.failed += 1;
                report.failures.push(NameFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
