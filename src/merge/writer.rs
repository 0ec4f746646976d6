use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::capture::{CaptureFormat, CaptureWriter, OutputParams, Record};
use crate::merge::error::MergeError;
use crate::merge::input::InputFile;

/// Clamps, remaps and writes scheduled records to the output sink.
pub struct OutputWriter {
    sink: Box<dyn CaptureWriter>,
    destination: PathBuf,
    snaplen: u32,
    records_written: u64,
}

impl OutputWriter {
    /// `snaplen` is the clamp applied to each record's captured length; 0 disables it.
    pub fn open(
        format: &dyn CaptureFormat,
        destination: &Path,
        params: &OutputParams<'_>,
        snaplen: u32,
    ) -> Result<Self, MergeError> {
        let sink = format
            .create_writer(destination, params)
            .map_err(|source| MergeError::CantOpenOutFile {
                destination: destination.to_path_buf(),
                source,
            })?;
        debug!(
            "Opened {} output {} (encapsulation {}, {} interfaces)",
            format.name(),
            destination.display(),
            params.encapsulation,
            params.interfaces.len()
        );

        Ok(Self {
            sink,
            destination: destination.to_path_buf(),
            snaplen,
            records_written: 0,
        })
    }

    /// Writes one record taken from `files[index]`.
    pub fn write(&mut self, index: usize, input: &InputFile, mut record: Record) -> Result<(), MergeError> {
        // Only the captured length is clamped; the original length stays as read.
        if self.snaplen != 0 && record.captured_len > self.snaplen {
            record.captured_len = self.snaplen;
        }

        if let Some(local) = record.interface_ref() {
            let merged = input
                .map_interface(local)
                .ok_or_else(|| MergeError::BadInterfaceId {
                    index,
                    path: input.path().to_path_buf(),
                    record_num: input.record_num(),
                    interface_id: local,
                })?;
            record.interface_id = Some(merged);
        }

        self.sink
            .write_record(&record)
            .map_err(|source| MergeError::CantWriteOutFile {
                index,
                path: input.path().to_path_buf(),
                record_num: input.record_num(),
                destination: self.destination.clone(),
                source,
            })?;
        self.records_written += 1;
        Ok(())
    }

    pub fn close(self) -> Result<u64, MergeError> {
        let records_written = self.records_written;
        let destination = self.destination;
        self.sink
            .close()
            .map_err(|source| MergeError::CantCloseOutFile { destination, source })?;
        Ok(records_written)
    }

    /// Closes the sink after a failed merge. A close failure is only logged so
    /// the error that stopped the merge is the one reported.
    pub fn abandon(self) {
        if let Err(e) = self.sink.close() {
            warn!("Closing {} after a failed merge also failed: {}", self.destination.display(), e);
        }
    }
}
