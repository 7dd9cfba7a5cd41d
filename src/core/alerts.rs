//! Scoped suppression of host confirmation prompts

use crate::workbook::Workbook;
use std::ops::{Deref, DerefMut};

/// Turns the host's alerts off for as long as it lives.
///
/// The previous setting comes back on drop, so early returns and errors in
/// the guarded block cannot leave prompts suppressed.
pub struct AlertGuard<'a> {
    workbook: &'a mut dyn Workbook,
    previous: bool,
}

impl<'a> AlertGuard<'a> {
    pub fn suppress(workbook: &'a mut dyn Workbook) -> Self {
        let previous = workbook.display_alerts();
        workbook.set_display_alerts(false);
        Self { workbook, previous }
    }
}

impl<'a> Deref for AlertGuard<'a> {
    type Target = dyn Workbook + 'a;

    fn deref(&self) -> &Self::Target {
        self.workbook
    }
}

impl<'a> DerefMut for AlertGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.workbook
    }
}

impl Drop for AlertGuard<'_> {
    fn drop(&mut self) {
        self.workbook.set_display_alerts(self.previous);
    }
}
