//! Freezing formulas to their last computed value

use crate::error::{PruneError, PruneResult};
use crate::types::{CellValue, FormulaSite, NeutralizationFailure};
use crate::workbook::Workbook;
use tracing::{info, warn};

/// Result of neutralizing a batch of sites
#[derive(Debug, Default)]
pub struct NeutralizationOutcome {
    pub neutralized: usize,
    pub failures: Vec<NeutralizationFailure>,
}

/// Replace the formula at `site` with its current value.
///
/// Must run while the referenced sheet still exists; afterwards the value
/// would already be `#REF!`.
pub fn neutralize(workbook: &mut dyn Workbook, site: &FormulaSite) -> PruneResult<CellValue> {
    let wrap = |e: PruneError| PruneError::SiteNeutralizationFailure {
        sheet: site.sheet.clone(),
        address: site.address.to_string(),
        reason: e.to_string(),
    };

    let value = workbook.value(&site.sheet, site.address).map_err(wrap)?;
    workbook
        .set_value(&site.sheet, site.address, value.clone())
        .map_err(wrap)?;
    Ok(value)
}

/// Neutralize every site, recording failures instead of stopping
pub fn neutralize_all(workbook: &mut dyn Workbook, sites: &[FormulaSite]) -> NeutralizationOutcome {
    let mut outcome = NeutralizationOutcome::default();

    for site in sites {
        match neutralize(workbook, site) {
            Ok(value) => {
                info!(site = %site, formula = %site.formula, value = %value, "formula replaced by value");
                outcome.neutralized += 1;
            }
            Err(e) => {
                warn!(site = %site, error = %e, "could not neutralize formula");
                outcome.failures.push(NeutralizationFailure {
                    sheet: site.sheet.clone(),
                    address: site.address,
                    error: e.to_string(),
                });
            }
        }
    }

    outcome
}
