use crate::error::{Result, RollcallError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ScanOptions
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Glob patterns a file must match (relative to the root). Empty means all.
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Keep checklist items that are already checked off.
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default)]
    pub exclude_archives: bool,
    /// Completion analyses scoring below this are dropped from reports.
    #[serde(default)]
    pub min_confidence: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            use_gitignore: default_true(),
            max_depth: None,
            max_file_size: default_max_file_size(),
            include_completed: false,
            exclude_archives: false,
            min_confidence: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// DetectionOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOptions {
    /// Globs (case-insensitive) selecting planning documents.
    #[serde(default = "default_planning_paths")]
    pub planning_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_planning_paths() -> Vec<String> {
    vec![
        "**/*plan*.md".to_string(),
        "**/*roadmap*.md".to_string(),
        "**/*todo*.md".to_string(),
    ]
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            planning_paths: default_planning_paths(),
            use_gitignore: default_true(),
            exclude: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project configuration stored in `.rollcall/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanOptions,
    #[serde(default)]
    pub detection: DetectionOptions,
}

impl Config {
    /// Load the project config, falling back to defaults when the file is
    /// absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = self.to_yaml()?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.min_confidence > 100 {
            return Err(RollcallError::InvalidConfidence(self.scan.min_confidence));
        }
        for pattern in self
            .scan
            .include
            .iter()
            .chain(&self.scan.exclude)
            .chain(&self.detection.planning_paths)
            .chain(&self.detection.exclude)
        {
            globset::Glob::new(pattern).map_err(|source| RollcallError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
