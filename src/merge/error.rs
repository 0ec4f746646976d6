use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::capture::{ReadError, WriteError};
use crate::merge::report;

/// Terminal status of a merge, with or without an error attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Ok,
    UserAborted,
    NoInputFiles,
    CantOpenInFile(usize),
    CantReadInFile,
    CantOpenOutFile,
    CantWriteOutFile,
    CantCloseOutFile,
    BadInterfaceId,
}

/// A failed merge. Display renders the user-facing message, naming the
/// offending input and, where there is one, its 1-based record number.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("No input files were given.")]
    NoInputFiles,

    #[error("{}", report::open_failure(.path, .source))]
    CantOpenInFile {
        index: usize,
        path: PathBuf,
        source: ReadError,
    },

    #[error("{}", report::read_failure(.path, .record_num, .source))]
    CantReadInFile {
        index: usize,
        path: PathBuf,
        record_num: u64,
        source: ReadError,
    },

    #[error("{}", report::output_open_failure(.destination, .source))]
    CantOpenOutFile {
        destination: PathBuf,
        source: WriteError,
    },

    #[error("{}", report::write_failure(.path, .record_num, .destination, .source))]
    CantWriteOutFile {
        index: usize,
        path: PathBuf,
        record_num: u64,
        destination: PathBuf,
        source: WriteError,
    },

    #[error("{}", report::close_failure(.destination, .source))]
    CantCloseOutFile {
        destination: PathBuf,
        source: WriteError,
    },

    #[error("{}", report::bad_interface(.path, .record_num, .interface_id))]
    BadInterfaceId {
        index: usize,
        path: PathBuf,
        record_num: u64,
        interface_id: u32,
    },
}

impl MergeError {
    pub fn status(&self) -> MergeStatus {
        match self {
            MergeError::NoInputFiles => MergeStatus::NoInputFiles,
            MergeError::CantOpenInFile { index, .. } => MergeStatus::CantOpenInFile(*index),
            MergeError::CantReadInFile { .. } => MergeStatus::CantReadInFile,
            MergeError::CantOpenOutFile { .. } => MergeStatus::CantOpenOutFile,
            MergeError::CantWriteOutFile { .. } => MergeStatus::CantWriteOutFile,
            MergeError::CantCloseOutFile { .. } => MergeStatus::CantCloseOutFile,
            MergeError::BadInterfaceId { .. } => MergeStatus::BadInterfaceId,
        }
    }

    /// Index of the input the error is attributed to.
    pub fn input_index(&self) -> Option<usize> {
        match self {
            MergeError::CantOpenInFile { index, .. }
            | MergeError::CantReadInFile { index, .. }
            | MergeError::CantWriteOutFile { index, .. }
            | MergeError::BadInterfaceId { index, .. } => Some(*index),
            MergeError::NoInputFiles
            | MergeError::CantOpenOutFile { .. }
            | MergeError::CantCloseOutFile { .. } => None,
        }
    }

    pub fn input_path(&self) -> Option<&Path> {
        match self {
            MergeError::CantOpenInFile { path, .. }
            | MergeError::CantReadInFile { path, .. }
            | MergeError::CantWriteOutFile { path, .. }
            | MergeError::BadInterfaceId { path, .. } => Some(path),
            MergeError::NoInputFiles
            | MergeError::CantOpenOutFile { .. }
            | MergeError::CantCloseOutFile { .. } => None,
        }
    }

    /// 1-based record number within the attributed input.
    pub fn record_num(&self) -> Option<u64> {
        match self {
            MergeError::CantReadInFile { record_num, .. }
            | MergeError::CantWriteOutFile { record_num, .. }
            | MergeError::BadInterfaceId { record_num, .. } => Some(*record_num),
            MergeError::NoInputFiles
            | MergeError::CantOpenInFile { .. }
            | MergeError::CantOpenOutFile { .. }
            | MergeError::CantCloseOutFile { .. } => None,
        }
    }
}
