use clap::{Parser, Subcommand};
use sheetprune::cli;
use sheetprune::config::PruneConfig;
use sheetprune::error::PruneResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetprune")]
#[command(about = "Delete sheets without leaving #REF! behind. Purge named ranges. Break external links.")]
#[command(long_about = "Sheetprune - Safe structural cleanup for .xlsx workbooks

Deleting a sheet breaks every formula that points at it. In safe mode
(the default) sheetprune finds those formulas first and freezes them to
their current values, then deletes the sheet.

COMMANDS:
  info          - Sheets, named ranges and external links
  scan          - List formulas that reference the given sheets
  delete-sheet  - Delete one sheet
  delete-hidden - Delete every hidden sheet
  clean-names   - Delete user-defined named ranges
  break-links   - Sever links to external workbooks

EXAMPLES:
  sheetprune info model.xlsx
  sheetprune scan model.xlsx Inputs Archive
  sheetprune delete-hidden model.xlsx -o model-clean.xlsx
  sheetprune clean-names model.xlsx --broken-only

CONFIG:
  .sheetprune.yaml next to the workbook (or --config FILE):
    safe: true
    offline_scan: true
    keep_system_ranges: true
    on_partial_failure: best-effort   # or: abort")]
#[command(version)]
struct Cli {
    /// Config file (default: .sheetprune.yaml beside the workbook)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sheets, named ranges and external links
    Info {
        /// Path to .xlsx file
        file: PathBuf,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "List formulas in other sheets that reference the given sheets.

The workbook is not modified. The fast path reads the saved file; if it
cannot be read, every used cell is walked instead (slow) and a warning
is printed.")]
    /// List formulas that reference the given sheets
    Scan {
        /// Path to .xlsx file
        file: PathBuf,

        /// Sheets about to be deleted
        #[arg(required = true)]
        sheets: Vec<String>,

        /// Use the slow live scan only
        #[arg(long)]
        no_offline: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Delete one sheet.

SAFE MODE (default):
  1. Scan other sheets for formulas that reference it
  2. Replace each such formula with its current value
  3. Delete the sheet

With --unsafe the sheet is deleted directly and dependent formulas
become #REF!.")]
    /// Delete one sheet
    DeleteSheet {
        /// Path to .xlsx file
        file: PathBuf,

        /// Sheet to delete
        sheet: String,

        /// Skip reference neutralization
        #[arg(long = "unsafe")]
        unsafe_mode: bool,

        /// Use the slow live scan only
        #[arg(long)]
        no_offline: bool,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Delete every hidden and very hidden sheet.

All hidden sheets are scanned for in one pass, so a formula that
references several of them is neutralized once. A sheet that cannot be
deleted is reported and the rest are still deleted.")]
    /// Delete every hidden sheet
    DeleteHidden {
        /// Path to .xlsx file
        file: PathBuf,

        /// Skip reference neutralization
        #[arg(long = "unsafe")]
        unsafe_mode: bool,

        /// Use the slow live scan only
        #[arg(long)]
        no_offline: bool,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Delete user-defined named ranges.

Never deleted: system names (_xlfn., _xlpm., _xlws., _xlnm.), names that
are not plain identifiers, and names that look like cell addresses.
Print_Area and Print_Titles are kept unless --drop-system-names is set.

With --broken-only, only names whose reference contains #REF! are
deleted.")]
    /// Delete user-defined named ranges
    CleanNames {
        /// Path to .xlsx file
        file: PathBuf,

        /// Only delete names whose reference is broken (#REF!)
        #[arg(long)]
        broken_only: bool,

        /// Also delete Print_Area / Print_Titles
        #[arg(long)]
        drop_system_names: bool,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Sever every link to an external workbook
    BreakLinks {
        /// Path to .xlsx file
        file: PathBuf,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sheetprune=info"
    } else {
        "sheetprune=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> PruneResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Info { file, json } => cli::info(file, json),

        Commands::Scan {
            file,
            sheets,
            no_offline,
            json,
        } => {
            let mut config = PruneConfig::resolve(explicit, &file)?;
            config.offline_scan &= !no_offline;
            cli::scan(file, sheets, config, json)
        }

        Commands::DeleteSheet {
            file,
            sheet,
            unsafe_mode,
            no_offline,
            output,
            json,
        } => {
            let mut config = PruneConfig::resolve(explicit, &file)?;
            config.safe &= !unsafe_mode;
            config.offline_scan &= !no_offline;
            cli::delete_sheet(file, sheet, config, output, json)
        }

        Commands::DeleteHidden {
            file,
            unsafe_mode,
            no_offline,
            output,
            json,
        } => {
            let mut config = PruneConfig::resolve(explicit, &file)?;
            config.safe &= !unsafe_mode;
            config.offline_scan &= !no_offline;
            cli::delete_hidden(file, config, output, json)
        }

        Commands::CleanNames {
            file,
            broken_only,
            drop_system_names,
            output,
            json,
        } => {
            let mut config = PruneConfig::resolve(explicit, &file)?;
            config.keep_system_ranges &= !drop_system_names;
            cli::clean_names(file, broken_only, config, output, json)
        }

        Commands::BreakLinks { file, output, json } => {
            let config = PruneConfig::resolve(explicit, &file)?;
            cli::break_links(file, config, output, json)
        }
    }
}
