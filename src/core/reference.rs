//! Textual detection of qualified sheet references
//!
//! A formula references sheet `S` when its text contains `'S'!` or `S!`.
//! This is a substring test, not a parse: a sheet named `Data` also matches
//! `OldData!A1`. Everything that decides "does this formula depend on that
//! sheet" goes through [`ReferenceMatcher`], so a tokenizer can replace it
//! without touching the scanner or the session.
//!
//! Rewriting is stricter than detection: [`invalidate_references`] only
//! replaces a bare `S!` at a name boundary, so `OldData!A1` survives the
//! removal of `Data`.

/// Error token the host writes in place of a reference to a removed sheet
pub const BROKEN_REFERENCE: &str = "#REF!";

/// Returns true if `formula` contains a qualified reference to `sheet`
pub fn references_sheet(formula: &str, sheet: &str) -> bool {
    SheetPattern::new(sheet).is_in(formula)
}

/// The two spellings of a qualified reference to one sheet
#[derive(Debug, Clone)]
struct SheetPattern {
    name: String,
    quoted: String,
    bare: String,
}

impl SheetPattern {
    fn new(sheet: &str) -> Self {
        // Quotes inside a quoted sheet name are doubled
        Self {
            name: sheet.to_string(),
            quoted: format!("'{}'!", sheet.replace('\'', "''")),
            bare: format!("{}!", sheet),
        }
    }

    fn is_in(&self, formula: &str) -> bool {
        formula.contains(&self.quoted) || formula.contains(&self.bare)
    }
}

/// Tests formulas against a whole deletion set in one pass
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    patterns: Vec<SheetPattern>,
}

impl ReferenceMatcher {
    pub fn new<S: AsRef<str>>(targets: &[S]) -> Self {
        Self {
            patterns: targets
                .iter()
                .map(|t| SheetPattern::new(t.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Sheets in the deletion set are never scanned
    pub fn is_target(&self, sheet: &str) -> bool {
        self.patterns.iter().any(|p| p.name == sheet)
    }

    /// True if the formula references any sheet in the set
    pub fn matches(&self, formula: &str) -> bool {
        self.patterns.iter().any(|p| p.is_in(formula))
    }

    /// Names of the target sheets the formula references
    pub fn referenced_targets(&self, formula: &str) -> Vec<&str> {
        self.patterns
            .iter()
            .filter(|p| p.is_in(formula))
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Rewrite every qualified reference to `sheet` as `#REF!`, the way the host
/// does when the sheet disappears. `=Old!A1*2` becomes `=#REF!A1*2`.
pub fn invalidate_references(formula: &str, sheet: &str) -> String {
    let pattern = SheetPattern::new(sheet);
    let unquoted = formula.replace(&pattern.quoted, BROKEN_REFERENCE);

    let mut rewritten = String::with_capacity(unquoted.len());
    let mut copied = 0;
    for (start, matched) in unquoted.match_indices(&pattern.bare) {
        let at_boundary = unquoted[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !continues_name(c));
        if at_boundary {
            rewritten.push_str(&unquoted[copied..start]);
            rewritten.push_str(BROKEN_REFERENCE);
            copied = start + matched.len();
        }
    }
    rewritten.push_str(&unquoted[copied..]);
    rewritten
}

/// Characters that extend a sheet name or prefix it with a workbook or error token
fn continues_name(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '\'' | ']' | '#')
}
