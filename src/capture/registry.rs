use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::capture::jsonl::JsonlFormat;
use crate::capture::pcap::PcapFormat;
use crate::capture::{CaptureFormat, CaptureReader, ReadError};

/// The set of capture formats available to a merge.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn CaptureFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PcapFormat));
        registry.register(Arc::new(JsonlFormat));
        registry
    }

    /// Later registrations win name lookups but are probed after earlier ones.
    pub fn register(&mut self, format: Arc<dyn CaptureFormat>) {
        self.formats.push(format);
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn CaptureFormat>> {
        self.formats
            .iter()
            .rev()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.formats.iter().map(|f| f.name()).collect()
    }

    /// Opens an input by probing each registered format in order.
    pub fn open(&self, path: &Path) -> Result<Box<dyn CaptureReader>, ReadError> {
        for format in &self.formats {
            if let Some(reader) = format.open_reader(path)? {
                debug!("Opened {} as {}", path.display(), format.name());
                return Ok(reader);
            }
        }
        Err(ReadError::UnknownFormat)
    }
}
