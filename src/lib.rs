// Capture readers, writers and the format registry
pub mod capture;

// Merge engine
pub mod merge;

pub mod constants;
pub mod utils;

// Re-export main types for convenience
pub use capture::FormatRegistry;
pub use merge::{merge_files, DedupMode, MergeConfig, MergeError, MergeOutcome, MergeProcessor, MergeStats, MergeStatus};
