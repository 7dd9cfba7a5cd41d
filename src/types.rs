use crate::error::{PruneError, PruneResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest column index an .xlsx sheet can address (XFD).
pub const MAX_COLUMN: u16 = 16_383;
/// Largest zero-based row index an .xlsx sheet can address.
pub const MAX_ROW: u32 = 1_048_575;

//==============================================================================
// Cell Addressing
//==============================================================================

/// A zero-based cell position, displayed in A1 notation.
///
/// Ordering is row-major, so sorted addresses follow reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Convert a zero-based column index to its letter form
    ///
    /// Examples:
    /// - 0 → A
    /// - 25 → Z
    /// - 26 → AA
    pub fn column_letter(index: u16) -> String {
        let mut result = String::new();
        let mut idx = index as usize;

        loop {
            let remainder = idx % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if idx < 26 {
                break;
            }
            idx = idx / 26 - 1;
        }

        result
    }

    /// Parse A1 notation (`B2`, `$B$2`, `xfd1048576`)
    pub fn parse(text: &str) -> PruneResult<Self> {
        let invalid = || PruneError::InvalidAddress(text.to_string());
        let cleaned: String = text.trim().chars().filter(|c| *c != '$').collect();

        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row - 1 > MAX_ROW || col - 1 > MAX_COLUMN as u32 {
            return Err(invalid());
        }

        Ok(Self::new(row - 1, (col - 1) as u16))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_letter(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = PruneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Reports carry addresses as "B2" rather than {row, col}
impl Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

//==============================================================================
// Cell Values
//==============================================================================

/// A static cell value, or the cached result of a formula
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Spreadsheet error token such as `#REF!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

//==============================================================================
// Sheets, Formula Sites, Named Ranges
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not restorable from the host's UI
    VeryHidden,
}

impl SheetVisibility {
    pub fn is_hidden(&self) -> bool {
        !matches!(self, SheetVisibility::Visible)
    }
}

/// A formula-bearing cell: `(sheet, address, formula text)`.
///
/// The offline reader yields these for every formula cell; the scanner keeps
/// the ones whose text references a sheet about to be removed.
/// Formula text always starts with `=`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormulaSite {
    pub sheet: String,
    pub address: CellAddress,
    pub formula: String,
}

impl FormulaSite {
    pub fn new(sheet: impl Into<String>, address: CellAddress, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        let formula = if formula.starts_with('=') {
            formula
        } else {
            format!("={}", formula)
        };
        Self {
            sheet: sheet.into(),
            address,
            formula,
        }
    }

    /// `(sheet, address)` key used when comparing scan results
    pub fn location(&self) -> (String, CellAddress) {
        (self.sheet.clone(), self.address)
    }
}

impl fmt::Display for FormulaSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sheet", rename_all = "lowercase")]
pub enum NameScope {
    #[default]
    Workbook,
    Sheet(String),
}

/// A document-level name bound to a reference expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRange {
    pub name: String,
    pub scope: NameScope,
    pub refers_to: String,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: NameScope::Workbook,
            refers_to: refers_to.into(),
        }
    }

    pub fn scoped_to(mut self, sheet: impl Into<String>) -> Self {
        self.scope = NameScope::Sheet(sheet.into());
        self
    }
}

/// Classification of a named range; exactly one applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameClass {
    SystemReserved,
    MalformedIdentifier,
    CellLikeIdentifier,
    Broken,
    Eligible,
}

impl NameClass {
    pub fn label(&self) -> &'static str {
        match self {
            NameClass::SystemReserved => "system",
            NameClass::MalformedIdentifier => "malformed",
            NameClass::CellLikeIdentifier => "cell-like",
            NameClass::Broken => "broken",
            NameClass::Eligible => "eligible",
        }
    }
}

//==============================================================================
// Operation Reports
//==============================================================================

/// Which scanning strategy produced a set of sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStrategy {
    /// Structural read of the persisted file; formula cells only
    Offline,
    /// Cell-by-cell walk of every used cell through the live interface
    Live,
}

/// Lifecycle of a sheet deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPhase {
    Pending,
    Scanning,
    Neutralizing,
    Deleting,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub strategy: ScanStrategy,
    pub sites: Vec<FormulaSite>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeutralizationFailure {
    pub sheet: String,
    pub address: CellAddress,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetFailure {
    pub sheet: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetDeletionReport {
    pub requested: Vec<String>,
    pub deleted: Vec<String>,
    pub safe: bool,
    /// `None` when the scan was skipped (unsafe mode or nothing to delete)
    pub strategy: Option<ScanStrategy>,
    pub sites_found: usize,
    pub neutralized: usize,
    pub neutralization_failures: Vec<NeutralizationFailure>,
    pub sheet_failures: Vec<SheetFailure>,
    pub warnings: Vec<String>,
    pub phases: Vec<DeletionPhase>,
}

impl SheetDeletionReport {
    pub fn new(requested: Vec<String>, safe: bool) -> Self {
        Self {
            requested,
            deleted: Vec::new(),
            safe,
            strategy: None,
            sites_found: 0,
            neutralized: 0,
            neutralization_failures: Vec::new(),
            sheet_failures: Vec::new(),
            warnings: Vec::new(),
            phases: vec![DeletionPhase::Pending],
        }
    }

    /// Final phase reached
    pub fn phase(&self) -> DeletionPhase {
        self.phases.last().copied().unwrap_or(DeletionPhase::Pending)
    }

    pub fn is_success(&self) -> bool {
        self.phase() == DeletionPhase::Done
            && self.sheet_failures.is_empty()
            && self.neutralization_failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NamedRangeCleanupReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<NameFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFailure {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LinkBreakReport {
    pub broken: Vec<String>,
    pub failed: Vec<LinkFailure>,
}
