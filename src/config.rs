//! Operation defaults loaded from `.sheetprune.yaml`
//!
//! ```yaml
//! safe: true
//! offline_scan: true
//! keep_system_ranges: true
//! on_partial_failure: best-effort   # or: abort
//! ```

use crate::error::{PruneError, PruneResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = ".sheetprune.yaml";

/// What a sheet deletion does when some formulas could not be neutralized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialFailurePolicy {
    /// Delete anyway; unneutralized formulas end up as #REF!
    #[default]
    BestEffort,
    /// Leave every sheet in place and report the failures
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruneConfig {
    /// Neutralize references before deleting sheets
    pub safe: bool,
    /// Prefer the structural file scan over the live cell walk
    pub offline_scan: bool,
    /// Keep Print_Area / Print_Titles during named range cleanup
    pub keep_system_ranges: bool,
    pub on_partial_failure: PartialFailurePolicy,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            safe: true,
            offline_scan: true,
            keep_system_ranges: true,
            on_partial_failure: PartialFailurePolicy::BestEffort,
        }
    }
}

impl PruneConfig {
    pub fn load(path: &Path) -> PruneResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PruneError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> PruneResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Explicit path if given, else `.sheetprune.yaml` beside `target`,
    /// else defaults
    pub fn resolve(explicit: Option<&Path>, target: &Path) -> PruneResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = target
            .parent()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|p| p.is_file());
        match candidate {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
