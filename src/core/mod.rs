//! Safe structural mutation: reference scanning, neutralization, sheet
//! deletion, named range cleanup and link breaking

pub mod alerts;
pub mod links;
pub mod named_ranges;
pub mod neutralizer;
pub mod reference;
pub mod scanner;
pub mod session;

pub use alerts::AlertGuard;
pub use scanner::{FormulaScanner, LiveScanner, OfflineReader, OfflineScanner};
pub use session::DocumentSession;
