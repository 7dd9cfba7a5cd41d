use crate::config::PruneConfig;
use crate::core::named_ranges::classify;
use crate::core::DocumentSession;
use crate::error::PruneResult;
use crate::excel::{CalamineFormulaReader, XlsxImporter};
use crate::types::{
    LinkBreakReport, NameClass, NameScope, NamedRangeCleanupReport, ScanOutcome,
    SheetDeletionReport, SheetVisibility,
};
use crate::workbook::{MemoryWorkbook, Workbook};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

//==============================================================================
// Shared operations (also used by the API server)
//==============================================================================

/// A mutating operation's report plus where the result was written
#[derive(Debug, Clone, Serialize)]
pub struct Applied<R: Serialize> {
    pub saved_to: PathBuf,
    pub report: R,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub visibility: SheetVisibility,
    pub formulas: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NameInfo {
    pub name: String,
    pub scope: NameScope,
    pub refers_to: String,
    pub class: NameClass,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkbookInfo {
    pub file: PathBuf,
    pub sheets: Vec<SheetInfo>,
    pub names: Vec<NameInfo>,
    pub links: Vec<String>,
}

pub fn open_workbook(file: &Path) -> PruneResult<MemoryWorkbook> {
    XlsxImporter::new(file).import()
}

fn start_session(
    workbook: &mut MemoryWorkbook,
    config: PruneConfig,
) -> DocumentSession<'_, MemoryWorkbook> {
    DocumentSession::new(workbook, config).with_reader(Box::new(CalamineFormulaReader))
}

/// Write to `output`, or back to the source file
fn save_workbook(workbook: &mut MemoryWorkbook, output: Option<&Path>) -> PruneResult<PathBuf> {
    if let Some(output) = output {
        workbook.set_storage(output);
    }
    workbook.save()
}

pub fn inspect(file: &Path) -> PruneResult<WorkbookInfo> {
    let workbook = open_workbook(file)?;
    let sheets = workbook
        .sheets()
        .iter()
        .map(|s| SheetInfo {
            name: s.name().to_string(),
            visibility: s.visibility(),
            formulas: s.formula_count(),
        })
        .collect();
    let names = workbook
        .named_ranges()
        .into_iter()
        .map(|range| NameInfo {
            class: classify(&range),
            name: range.name,
            scope: range.scope,
            refers_to: range.refers_to,
        })
        .collect();

    Ok(WorkbookInfo {
        file: file.to_path_buf(),
        sheets,
        names,
        links: workbook.link_sources(),
    })
}

/// Read-only: the workbook is never written back
pub fn run_scan(file: &Path, sheets: &[String], config: PruneConfig) -> PruneResult<ScanOutcome> {
    let mut workbook = open_workbook(file)?;
    start_session(&mut workbook, config).scan_references(sheets)
}

pub fn run_delete_sheet(
    file: &Path,
    sheet: &str,
    config: PruneConfig,
    output: Option<&Path>,
) -> PruneResult<Applied<SheetDeletionReport>> {
    let mut workbook = open_workbook(file)?;
    let safe = config.safe;
    let report = start_session(&mut workbook, config).delete_sheet(sheet, safe)?;
    let saved_to = save_workbook(&mut workbook, output)?;
    Ok(Applied { saved_to, report })
}

pub fn run_delete_hidden(
    file: &Path,
    config: PruneConfig,
    output: Option<&Path>,
) -> PruneResult<Applied<SheetDeletionReport>> {
    let mut workbook = open_workbook(file)?;
    let safe = config.safe;
    let report = start_session(&mut workbook, config).delete_hidden_sheets(safe)?;
    let saved_to = save_workbook(&mut workbook, output)?;
    Ok(Applied { saved_to, report })
}

pub fn run_clean_names(
    file: &Path,
    broken_only: bool,
    config: PruneConfig,
    output: Option<&Path>,
) -> PruneResult<Applied<NamedRangeCleanupReport>> {
    let mut workbook = open_workbook(file)?;
    let keep = config.keep_system_ranges;
    let report = start_session(&mut workbook, config).cleanup_named_ranges(broken_only, keep);
    let saved_to = save_workbook(&mut workbook, output)?;
    Ok(Applied { saved_to, report })
}

pub fn run_break_links(
    file: &Path,
    config: PruneConfig,
    output: Option<&Path>,
) -> PruneResult<Applied<LinkBreakReport>> {
    let mut workbook = open_workbook(file)?;
    let report = start_session(&mut workbook, config).break_external_links();
    let saved_to = save_workbook(&mut workbook, output)?;
    Ok(Applied { saved_to, report })
}

//==============================================================================
// Command handlers
//==============================================================================

fn print_json<T: Serialize>(value: &T) -> PruneResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("   {} {}", "⚠️ ".yellow(), warning.yellow());
    }
}

/// Execute the info command
pub fn info(file: PathBuf, json: bool) -> PruneResult<()> {
    let info = inspect(&file)?;
    if json {
        return print_json(&info);
    }

    println!("{}", "🔥 Sheetprune - Workbook info".bold().green());
    println!("   File: {}\n", file.display());

    println!("{}", "📄 Sheets:".bold());
    for sheet in &info.sheets {
        let state = match sheet.visibility {
            SheetVisibility::Visible => "visible".green(),
            SheetVisibility::Hidden => "hidden".yellow(),
            SheetVisibility::VeryHidden => "very hidden".red(),
        };
        println!(
            "   {} [{}] {} formulas",
            sheet.name.bright_blue().bold(),
            state,
            sheet.formulas
        );
    }

    println!("\n{}", "🏷️  Named ranges:".bold());
    if info.names.is_empty() {
        println!("   (none)");
    }
    for name in &info.names {
        let scope = match &name.scope {
            NameScope::Workbook => String::new(),
            NameScope::Sheet(sheet) => format!(" ({} only)", sheet),
        };
        println!(
            "   {}{} = {} [{}]",
            name.name.cyan(),
            scope,
            name.refers_to,
            name.class.label()
        );
    }

    println!("\n{}", "🔗 External links:".bold());
    if info.links.is_empty() {
        println!("   (none)");
    }
    for link in &info.links {
        println!("   {}", link);
    }
    println!();
    Ok(())
}

/// Execute the scan command
pub fn scan(file: PathBuf, sheets: Vec<String>, config: PruneConfig, json: bool) -> PruneResult<()> {
    let outcome = run_scan(&file, &sheets, config)?;
    if json {
        return print_json(&outcome);
    }

    println!("{}", "🔥 Sheetprune - Reference scan".bold().green());
    println!("   File:    {}", file.display());
    println!("   Targets: {}", sheets.join(", "));
    println!("   Scan:    {:?}\n", outcome.strategy);
    print_warnings(&outcome.warnings);

    if outcome.sites.is_empty() {
        println!("{}", "✅ No formulas reference these sheets".bold().green());
    } else {
        println!(
            "{}",
            format!("🔍 {} referencing formula(s):", outcome.sites.len()).bold().yellow()
        );
        for site in &outcome.sites {
            println!("   {:<20} {}", site.to_string().bright_blue(), site.formula);
        }
    }
    println!();
    Ok(())
}

fn print_deletion(title: &str, file: &Path, applied: &Applied<SheetDeletionReport>) {
    let report = &applied.report;
    println!("{}", format!("🔥 Sheetprune - {}", title).bold().green());
    println!("   File: {}", file.display());
    println!(
        "   Mode: {}\n",
        if report.safe {
            "safe (references neutralized first)".green()
        } else {
            "unsafe (references left to break)".red()
        }
    );
    print_warnings(&report.warnings);

    if let Some(strategy) = report.strategy {
        println!(
            "   Scan: {:?}, {} site(s) found, {} neutralized",
            strategy, report.sites_found, report.neutralized
        );
    }
    for failure in &report.neutralization_failures {
        println!(
            "   {} {}!{}: {}",
            "❌".red(),
            failure.sheet,
            failure.address,
            failure.error
        );
    }
    for failure in &report.sheet_failures {
        println!("   {} {}: {}", "❌".red(), failure.sheet, failure.error);
    }

    if report.requested.is_empty() {
        println!("{}", "✅ Nothing to delete".bold().green());
    } else if report.is_success() {
        println!(
            "{}",
            format!("✅ Deleted: {}", report.deleted.join(", ")).bold().green()
        );
    } else {
        println!(
            "{}",
            format!(
                "⚠️  Deleted {} of {} sheet(s)",
                report.deleted.len(),
                report.requested.len()
            )
            .bold()
            .yellow()
        );
    }
    println!("   Saved to: {}\n", applied.saved_to.display());
}

/// Execute the delete-sheet command
pub fn delete_sheet(
    file: PathBuf,
    sheet: String,
    config: PruneConfig,
    output: Option<PathBuf>,
    json: bool,
) -> PruneResult<()> {
    let applied = run_delete_sheet(&file, &sheet, config, output.as_deref())?;
    if json {
        return print_json(&applied);
    }
    print_deletion("Delete sheet", &file, &applied);
    Ok(())
}

/// Execute the delete-hidden command
pub fn delete_hidden(
    file: PathBuf,
    config: PruneConfig,
    output: Option<PathBuf>,
    json: bool,
) -> PruneResult<()> {
    let applied = run_delete_hidden(&file, config, output.as_deref())?;
    if json {
        return print_json(&applied);
    }
    print_deletion("Delete hidden sheets", &file, &applied);
    Ok(())
}

/// Execute the clean-names command
pub fn clean_names(
    file: PathBuf,
    broken_only: bool,
    config: PruneConfig,
    output: Option<PathBuf>,
    json: bool,
) -> PruneResult<()> {
    let applied = run_clean_names(&file, broken_only, config, output.as_deref())?;
    if json {
        return print_json(&applied);
    }

    let report = &applied.report;
    println!("{}", "🔥 Sheetprune - Named range cleanup".bold().green());
    println!("   File: {}", file.display());
    println!(
        "   Mode: {}\n",
        if broken_only { "broken only" } else { "all user-defined" }
    );
    for name in &report.deleted {
        println!("   🗑️  {}", name.cyan());
    }
    for failure in &report.failures {
        println!("   {} {}: {}", "❌".red(), failure.name, failure.error);
    }
    println!(
        "{}",
        format!(
            "✅ {} attempted, {} deleted, {} failed",
            report.attempted, report.succeeded, report.failed
        )
        .bold()
        .green()
    );
    println!("   Saved to: {}\n", applied.saved_to.display());
    Ok(())
}

/// Execute the break-links command
pub fn break_links(
    file: PathBuf,
    config: PruneConfig,
    output: Option<PathBuf>,
    json: bool,
) -> PruneResult<()> {
    let applied = run_break_links(&file, config, output.as_deref())?;
    if json {
        return print_json(&applied);
    }

    let report = &applied.report;
    println!("{}", "🔥 Sheetprune - Break external links".bold().green());
    println!("   File: {}\n", file.display());
    for source in &report.broken {
        println!("   🔗 {}", source.cyan());
    }
    for failure in &report.failed {
        println!("   {} {}: {}", "❌".red(), failure.source, failure.error);
    }
    println!(
        "{}",
        format!(
            "✅ {} broken, {} failed",
            report.broken.len(),
            report.failed.len()
        )
        .bold()
        .green()
    );
    println!("   Saved to: {}\n", applied.saved_to.display());
    Ok(())
}
