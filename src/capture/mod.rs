//! Capture file collaborators used by the merge engine.
//!
//! A [`CaptureFormat`] knows how to recognize and read one on-disk (or
//! in-memory) capture format and how to create a writer for it. Formats are
//! looked up through an explicit [`FormatRegistry`] value.

pub mod error;
pub mod interface;
pub mod jsonl;
pub mod memory;
pub mod pcap;
pub mod record;
pub mod registry;

pub use error::{ReadError, WriteError};
pub use interface::{CaptureFilter, InterfaceDescriptor, SectionInfo, TimestampPrecision};
pub use record::{Encapsulation, Record, RecordKind, Timestamp};
pub use registry::FormatRegistry;

use std::path::Path;

/// Sequential reader over one input capture. Dropping the reader closes it.
pub trait CaptureReader: Send {
    /// Next record, or `Ok(None)` at a clean end of input.
    fn read_next(&mut self) -> Result<Option<Record>, ReadError>;

    /// Size of the underlying file in bytes.
    fn size(&self) -> u64;

    fn file_encapsulation(&self) -> Encapsulation;

    fn snapshot_length(&self) -> u32;

    fn interfaces(&self) -> &[InterfaceDescriptor];

    fn section(&self) -> Option<&SectionInfo>;
}

pub trait CaptureWriter: Send {
    fn write_record(&mut self, record: &Record) -> Result<(), WriteError>;

    fn close(self: Box<Self>) -> Result<(), WriteError>;
}

/// Everything a format needs to start an output file.
#[derive(Debug, Clone, Copy)]
pub struct OutputParams<'a> {
    pub encapsulation: Encapsulation,
    pub snaplen: u32,
    pub section: &'a SectionInfo,
    pub interfaces: &'a [InterfaceDescriptor],
}

pub trait CaptureFormat: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens `path` if it is in this format; `Ok(None)` means "not mine".
    fn open_reader(&self, path: &Path) -> Result<Option<Box<dyn CaptureReader>>, ReadError>;

    fn create_writer(
        &self,
        destination: &Path,
        params: &OutputParams<'_>,
    ) -> Result<Box<dyn CaptureWriter>, WriteError>;
}
