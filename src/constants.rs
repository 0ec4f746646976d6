pub const APP_NAME: &str = "capmerge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const BYTES_PER_KB: u64 = 1024;
pub const SECONDS_PER_MINUTE: f64 = 60.0;
pub const SECONDS_PER_HOUR: f64 = 3600.0;
