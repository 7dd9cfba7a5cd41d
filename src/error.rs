use thiserror::Error;

pub type PruneResult<T> = Result<T, PruneError>;

#[derive(Error, Debug)]
pub enum PruneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The offline structural reader cannot be used; callers fall back to a live scan.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Sheet '{sheet}' cannot be removed: {reason}")]
    SheetRemoval { sheet: String, reason: String },

    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Cell {sheet}!{address} is not available: {reason}")]
    CellNotFound {
        sheet: String,
        address: String,
        reason: String,
    },

    #[error("Failed to neutralize {sheet}!{address}: {reason}")]
    SiteNeutralizationFailure {
        sheet: String,
        address: String,
        reason: String,
    },

    #[error("Named range not found: {0}")]
    NameNotFound(String),

    #[error("Failed to delete named range '{name}': {reason}")]
    NameDeletionFailure { name: String, reason: String },

    #[error("Failed to break external link '{source_id}': {reason}")]
    LinkBreakFailure { source_id: String, reason: String },

    #[error("Deletion aborted: {0} formula site(s) could not be neutralized")]
    PartialNeutralization(usize),

    #[error("Validation error: {0}")]
    Validation(String),
}
