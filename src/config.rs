use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Resource ceilings and output switches for one analysis run.
///
/// Every field is optional in the TOML file:
///
/// ```toml
/// max_nodes = 50000
/// max_depth = 2000
/// memory_limit_mb = 512
/// include_tree_log = true
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Node-count ceiling of the coverability tree; `None` disables it.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: Option<usize>,
    /// Longest root-to-node branch; `None` disables it.
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
    /// Resident memory is sampled once per this many created nodes.
    #[serde(default = "default_memory_check_interval")]
    pub memory_check_interval: usize,
    /// Attach the per-state listing to the report.
    #[serde(default)]
    pub include_tree_log: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_depth: default_max_depth(),
            memory_limit_mb: None,
            memory_check_interval: default_memory_check_interval(),
            include_tree_log: false,
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// No ceiling at all; only meant for nets known to be small.
    pub fn unlimited() -> Self {
        Self {
            max_nodes: None,
            max_depth: None,
            ..Self::default()
        }
    }
}

fn default_max_nodes() -> Option<usize> {
    Some(100_000)
}

fn default_max_depth() -> Option<usize> {
    Some(10_000)
}

fn default_memory_check_interval() -> usize {
    1024
}
