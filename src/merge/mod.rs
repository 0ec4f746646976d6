pub mod config;
pub mod constants;
pub mod error;
pub mod frame_type;
pub mod input;
pub mod interfaces;
pub mod processor;
pub mod progress;
mod report;
pub mod scheduler;
pub mod writer;

#[cfg(test)]
mod tests;

pub use config::{DedupMode, MergeConfig};
pub use error::{MergeError, MergeStatus};
pub use frame_type::select_frame_type;
pub use input::{InputFile, InputFileSet, InputState};
pub use interfaces::{is_duplicate, merge_interfaces, MergedInterfaces};
pub use processor::{MergeOutcome, MergeProcessor};
pub use progress::{MergeEvent, ProgressCallback};
pub use scheduler::{MergeMode, RecordScheduler};

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::capture::{Encapsulation, FormatRegistry};

#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    pub input_files: usize,
    pub input_bytes: u64,
    pub records_written: u64,
    pub merged_interfaces: usize,
    pub output_encapsulation: Encapsulation,
    pub output_snaplen: u32,
    pub processing_time_ms: u64,
}

pub fn merge_files(
    input_files: &[PathBuf],
    output_file: &Path,
    config: MergeConfig,
    registry: FormatRegistry,
) -> Result<MergeOutcome> {
    let mut processor = MergeProcessor::new(config, registry)?;
    Ok(processor.process(input_files, output_file)?)
}
