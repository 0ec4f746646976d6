//! Captures held in memory.
//!
//! Useful for embedding the merge engine without touching the filesystem and
//! for exercising its failure paths: a [`MemoryStore`] can refuse to open an
//! input, fail a read after N records, fail the Nth output write, or fail on
//! close. The store also counts live readers so callers can verify that every
//! input was closed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::interface::{InterfaceDescriptor, SectionInfo};
use crate::capture::record::{Encapsulation, Record};
use crate::capture::{CaptureFormat, CaptureReader, CaptureWriter, OutputParams, ReadError, WriteError};

pub const MEMORY_FORMAT_NAME: &str = "memory";

#[derive(Debug, Clone, Default)]
pub struct MemoryCapture {
    pub encapsulation: Encapsulation,
    pub snaplen: u32,
    pub section: Option<SectionInfo>,
    pub interfaces: Vec<InterfaceDescriptor>,
    pub records: Vec<Record>,
    pub size: u64,
    pub fail_open: bool,
    /// Reading fails once this many records have been handed out.
    pub fail_read_after: Option<usize>,
}

impl MemoryCapture {
    pub fn new(encapsulation: Encapsulation, interfaces: Vec<InterfaceDescriptor>) -> Self {
        let snaplen = interfaces.iter().map(|i| i.snaplen).max().unwrap_or(0);
        Self {
            encapsulation,
            snaplen,
            interfaces,
            ..Default::default()
        }
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.size = records.iter().map(|r| r.data.len() as u64).sum();
        self.records = records;
        self
    }

    pub fn with_section(mut self, section: SectionInfo) -> Self {
        self.section = Some(section);
        self
    }
}

/// What a merge wrote to a memory destination.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    pub encapsulation: Encapsulation,
    pub snaplen: u32,
    pub section: SectionInfo,
    pub interfaces: Vec<InterfaceDescriptor>,
    pub records: Vec<Record>,
    pub closed: bool,
}

#[derive(Default)]
struct StoreState {
    captures: HashMap<PathBuf, MemoryCapture>,
    outputs: HashMap<PathBuf, MemoryOutput>,
    open_readers: usize,
    readers_opened: usize,
    fail_write_at: Option<usize>,
    fail_close: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, capture: MemoryCapture) {
        self.state.lock().captures.insert(path.into(), capture);
    }

    pub fn output(&self, path: &Path) -> Option<MemoryOutput> {
        self.state.lock().outputs.get(path).cloned()
    }

    /// Readers opened and not yet dropped.
    pub fn open_readers(&self) -> usize {
        self.state.lock().open_readers
    }

    pub fn readers_opened(&self) -> usize {
        self.state.lock().readers_opened
    }

    /// Makes the `record`th write (1-based, across the whole output) fail.
    pub fn fail_write_at(&self, record: usize) {
        self.state.lock().fail_write_at = Some(record);
    }

    pub fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }

    pub fn format(&self) -> MemoryFormat {
        MemoryFormat { store: self.clone() }
    }
}

pub struct MemoryFormat {
    store: MemoryStore,
}

impl CaptureFormat for MemoryFormat {
    fn name(&self) -> &'static str {
        MEMORY_FORMAT_NAME
    }

    fn open_reader(&self, path: &Path) -> Result<Option<Box<dyn CaptureReader>>, ReadError> {
        let mut state = self.store.state.lock();
        let capture = match state.captures.get(path) {
            Some(capture) => capture.clone(),
            None => return Ok(None),
        };
        if capture.fail_open {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }

        state.open_readers += 1;
        state.readers_opened += 1;
        Ok(Some(Box::new(MemoryReader {
            store: self.store.clone(),
            capture,
            position: 0,
        })))
    }

    fn create_writer(
        &self,
        destination: &Path,
        params: &OutputParams<'_>,
    ) -> Result<Box<dyn CaptureWriter>, WriteError> {
        let output = MemoryOutput {
            encapsulation: params.encapsulation,
            snaplen: params.snaplen,
            section: params.section.clone(),
            interfaces: params.interfaces.to_vec(),
            records: Vec::new(),
            closed: false,
        };
        self.store
            .state
            .lock()
            .outputs
            .insert(destination.to_path_buf(), output);

        Ok(Box::new(MemoryWriter {
            store: self.store.clone(),
            destination: destination.to_path_buf(),
            written: 0,
        }))
    }
}

struct MemoryReader {
    store: MemoryStore,
    capture: MemoryCapture,
    position: usize,
}

impl CaptureReader for MemoryReader {
    fn read_next(&mut self) -> Result<Option<Record>, ReadError> {
        if self.capture.fail_read_after == Some(self.position) {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::Other,
                "input/output error",
            )));
        }
        let record = self.capture.records.get(self.position).cloned();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn size(&self) -> u64 {
        self.capture.size
    }

    fn file_encapsulation(&self) -> Encapsulation {
        self.capture.encapsulation
    }

    fn snapshot_length(&self) -> u32 {
        self.capture.snaplen
    }

    fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.capture.interfaces
    }

    fn section(&self) -> Option<&SectionInfo> {
        self.capture.section.as_ref()
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        let mut state = self.store.state.lock();
        state.open_readers = state.open_readers.saturating_sub(1);
    }
}

struct MemoryWriter {
    store: MemoryStore,
    destination: PathBuf,
    written: usize,
}

impl CaptureWriter for MemoryWriter {
    fn write_record(&mut self, record: &Record) -> Result<(), WriteError> {
        self.written += 1;
        let mut state = self.store.state.lock();
        if state.fail_write_at == Some(self.written) {
            return Err(WriteError::Io(io::Error::new(
                io::ErrorKind::Other,
                "no space left on device",
            )));
        }
        if let Some(output) = state.outputs.get_mut(&self.destination) {
            let mut stored = record.clone();
            stored.data.truncate(record.payload().len());
            output.records.push(stored);
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), WriteError> {
        let mut state = self.store.state.lock();
        if let Some(output) = state.outputs.get_mut(&self.destination) {
            output.closed = true;
        }
        if state.fail_close {
            return Err(WriteError::Io(io::Error::new(
                io::ErrorKind::Other,
                "stale file handle",
            )));
        }
        Ok(())
    }
}
