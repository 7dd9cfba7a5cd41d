//! CLI command handlers

pub mod commands;

pub use commands::{
    break_links, clean_names, delete_hidden, delete_sheet, info, inspect, open_workbook,
    run_break_links, run_clean_names, run_delete_hidden, run_delete_sheet, run_scan, scan,
    Applied, WorkbookInfo,
};
