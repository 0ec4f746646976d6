use std::io;
use thiserror::Error;

use crate::capture::record::{Encapsulation, RecordKind};

/// Failures while opening or reading an input capture.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("the file appears to have been cut short in the middle of a record")]
    ShortRead,

    #[error("the file appears to be damaged or corrupt ({0})")]
    BadFile(String),

    #[error("the file cannot be decompressed ({0})")]
    Decompress(String),

    #[error("the file isn't a capture file in a format we support")]
    UnknownFormat,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ReadError {
    /// Maps an I/O error raised mid-record. Running out of input is a
    /// truncation; inside a compressed stream anything else is a decompression
    /// failure.
    pub fn from_record_io(err: io::Error, compressed: bool) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ReadError::ShortRead,
            _ if compressed => ReadError::Decompress(err.to_string()),
            _ => ReadError::Io(err),
        }
    }
}

/// Failures while creating, writing or closing an output capture.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("encapsulation {encapsulation} can't be saved in a \"{format}\" file")]
    UnwritableEncapsulation {
        format: &'static str,
        encapsulation: Encapsulation,
    },

    #[error("record of {captured_len} bytes is larger than a \"{format}\" file supports ({max} bytes)")]
    PacketTooLarge {
        format: &'static str,
        captured_len: u32,
        max: u32,
    },

    #[error("{kind} records can't be saved in a \"{format}\" file")]
    UnwritableRecordType {
        format: &'static str,
        kind: RecordKind,
    },

    #[error("record data can't be saved in a \"{format}\" file ({detail})")]
    UnwritableRecordData {
        format: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
