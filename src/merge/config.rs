use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::merge::constants::*;
use crate::merge::scheduler::MergeMode;

/// How interface descriptors from different inputs are unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum DedupMode {
    /// Every interface of every input becomes its own merged interface.
    #[serde(rename = "none")]
    #[value(name = "none")]
    None,
    /// Reuse the first input's interfaces when all inputs have identical lists.
    #[default]
    #[serde(rename = "all")]
    #[value(name = "all")]
    AllSame,
    /// Merge any interface equivalent to one already seen.
    #[serde(rename = "any")]
    #[value(name = "any")]
    AnySame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub output_format: String,
    pub do_append: bool,
    pub dedup_mode: DedupMode,
    /// Maximum captured length written per record; 0 means unlimited.
    pub snaplen: u32,
    pub app_name: String,
    pub verbose: bool,
    pub progress_interval_records: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            do_append: false,
            dedup_mode: DedupMode::default(),
            snaplen: UNLIMITED_SNAPLEN,
            app_name: format!("{} {}", APP_NAME, APP_VERSION),
            verbose: false,
            progress_interval_records: DEFAULT_PROGRESS_INTERVAL_RECORDS,
        }
    }
}

impl MergeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_format.trim().is_empty() {
            return Err(anyhow::anyhow!("Output format must not be empty"));
        }

        if self.snaplen > MAX_SNAPLEN {
            return Err(anyhow::anyhow!(
                "Snapshot length must be between 1 and {} bytes (or 0 for unlimited)",
                MAX_SNAPLEN
            ));
        }

        if self.progress_interval_records < MIN_PROGRESS_INTERVAL_RECORDS {
            return Err(anyhow::anyhow!(
                "Progress interval must be at least {} record",
                MIN_PROGRESS_INTERVAL_RECORDS
            ));
        }

        Ok(())
    }

    pub fn merge_mode(&self) -> MergeMode {
        if self.do_append {
            MergeMode::Append
        } else {
            MergeMode::Chronological
        }
    }
}
