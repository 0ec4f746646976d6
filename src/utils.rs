use anyhow::Result;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::{APP_NAME, BYTES_PER_KB, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = match verbosity {
        "silent" => Level::ERROR,
        "normal" => Level::INFO,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", APP_NAME, level).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(level == Level::DEBUG)
        .with_line_number(level == Level::DEBUG)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Final path component, used to name inputs in messages.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= BYTES_PER_KB as f64 && unit_index < UNITS.len() - 1 {
        size /= BYTES_PER_KB as f64;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < SECONDS_PER_MINUTE {
        format!("{:.1}s", seconds)
    } else if seconds < SECONDS_PER_HOUR {
        format!("{:.1}m", seconds / SECONDS_PER_MINUTE)
    } else {
        format!("{:.1}h", seconds / SECONDS_PER_HOUR)
    }
}
