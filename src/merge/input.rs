use std::path::{Path, PathBuf};
use tracing::debug;

use crate::capture::{
    CaptureReader, Encapsulation, FormatRegistry, InterfaceDescriptor, Record, SectionInfo, Timestamp,
};
use crate::merge::error::MergeError;
use crate::utils::base_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Nothing buffered; the next scheduling step reads from this input.
    NotPresent,
    /// One record is buffered and waiting to be scheduled.
    Present,
    AtEof,
    GotError,
}

/// One opened input and its reading state. Dropping it closes the reader.
pub struct InputFile {
    path: PathBuf,
    reader: Box<dyn CaptureReader>,
    size: u64,
    state: InputState,
    record_num: u64,
    interface_map: Vec<u32>,
    pending: Option<Record>,
}

impl InputFile {
    fn new(path: PathBuf, reader: Box<dyn CaptureReader>) -> Self {
        let size = reader.size();
        Self {
            path,
            reader,
            size,
            state: InputState::NotPresent,
            record_num: 0,
            interface_map: Vec::new(),
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    /// Records consumed from this input so far.
    pub fn record_num(&self) -> u64 {
        self.record_num
    }

    pub fn interfaces(&self) -> &[InterfaceDescriptor] {
        self.reader.interfaces()
    }

    pub fn file_encapsulation(&self) -> Encapsulation {
        self.reader.file_encapsulation()
    }

    pub fn snapshot_length(&self) -> u32 {
        self.reader.snapshot_length()
    }

    pub fn section(&self) -> Option<&SectionInfo> {
        self.reader.section()
    }

    pub(crate) fn set_interface_map(&mut self, map: Vec<u32>) {
        self.interface_map = map;
    }

    /// Merged index for a local interface index, if the input has one.
    pub fn map_interface(&self, local: u32) -> Option<u32> {
        self.interface_map.get(local as usize).copied()
    }

    pub(crate) fn pending_timestamp(&self) -> Option<Timestamp> {
        match self.state {
            InputState::Present => self.pending.as_ref().map(|r| r.timestamp),
            _ => None,
        }
    }

    /// Buffers the next record, leaving the input Present or AtEof.
    pub(crate) fn fill(&mut self, index: usize) -> Result<(), MergeError> {
        if let Some(record) = self.read(index)? {
            self.pending = Some(record);
            self.state = InputState::Present;
        }
        Ok(())
    }

    /// Hands out the buffered record.
    pub(crate) fn take(&mut self) -> Option<Record> {
        let record = self.pending.take()?;
        self.state = InputState::NotPresent;
        self.record_num += 1;
        Some(record)
    }

    /// Reads and consumes the next record without buffering it.
    pub(crate) fn read_direct(&mut self, index: usize) -> Result<Option<Record>, MergeError> {
        let record = self.read(index)?;
        if record.is_some() {
            self.record_num += 1;
        }
        Ok(record)
    }

    fn read(&mut self, index: usize) -> Result<Option<Record>, MergeError> {
        match self.reader.read_next() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                debug!("Reached end of {} after {} records", self.path.display(), self.record_num);
                self.state = InputState::AtEof;
                Ok(None)
            }
            Err(source) => {
                self.state = InputState::GotError;
                Err(MergeError::CantReadInFile {
                    index,
                    path: self.path.clone(),
                    record_num: self.record_num + 1,
                    source,
                })
            }
        }
    }
}

/// All inputs of one merge, in command-line order.
pub struct InputFileSet {
    files: Vec<InputFile>,
}

impl InputFileSet {
    /// Opens every path in order. If one fails, the inputs opened before it
    /// are closed and the failing 0-based index is reported.
    pub fn open(paths: &[PathBuf], registry: &FormatRegistry) -> Result<Self, MergeError> {
        let mut files = Vec::with_capacity(paths.len());

        for (index, path) in paths.iter().enumerate() {
            match registry.open(path) {
                Ok(reader) => {
                    let file = InputFile::new(path.clone(), reader);
                    debug!("Opened input {}: {} ({} bytes)", index, path.display(), file.size);
                    files.push(file);
                }
                Err(source) => {
                    debug!("Opening {} failed; closing {} opened inputs", path.display(), files.len());
                    drop(files);
                    return Err(MergeError::CantOpenInFile {
                        index,
                        path: path.clone(),
                        source,
                    });
                }
            }
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[InputFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [InputFile] {
        &mut self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn max_snapshot_length(&self) -> u32 {
        self.files
            .iter()
            .map(|f| f.snapshot_length())
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn assign_interface_maps(&mut self, maps: Vec<Vec<u32>>) {
        for (file, map) in self.files.iter_mut().zip(maps) {
            file.set_interface_map(map);
        }
    }
}
