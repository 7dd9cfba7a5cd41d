//! Severing external document links

use crate::types::{LinkBreakReport, LinkFailure};
use crate::workbook::Workbook;
use tracing::{info, warn};

/// Try to break every link source; one failure never blocks the rest
pub fn break_all(workbook: &mut dyn Workbook) -> LinkBreakReport {
    let mut report = LinkBreakReport::default();

    for source in workbook.link_sources() {
        match workbook.break_link(&source) {
            Ok(()) => {
                info!(source = %source, "external link broken");
                report.broken.push(source);
            }
            Err(e) => {
                warn!(source = %source, error = %e, "could not break external link");
                report.failed.push(LinkFailure {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
