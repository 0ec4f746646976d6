pub const DEFAULT_OUTPUT_FORMAT: &str = "jsonl";
pub const DEFAULT_PROGRESS_INTERVAL_RECORDS: u64 = 100_000;
pub const MIN_PROGRESS_INTERVAL_RECORDS: u64 = 1;

pub const UNLIMITED_SNAPLEN: u32 = 0;
pub const MAX_SNAPLEN: u32 = 262_144;

pub const MERGED_SECTION_COMMENT: &str = "File created by merging:";
