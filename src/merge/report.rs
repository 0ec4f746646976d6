//! User-facing text for merge failures.

use std::path::Path;

use crate::capture::{ReadError, WriteError};
use crate::utils::base_name;

pub(crate) fn open_failure(path: &Path, source: &ReadError) -> String {
    let name = base_name(path);
    match source {
        ReadError::UnknownFormat => format!(
            "The file \"{}\" isn't a capture file in a format capmerge understands.",
            name
        ),
        ReadError::ShortRead => format!(
            "The file \"{}\" appears to have been cut short in the middle of its header.",
            name
        ),
        ReadError::BadFile(detail) => format!(
            "The file \"{}\" appears to be damaged or corrupt.\n({})",
            name, detail
        ),
        ReadError::Decompress(detail) => format!(
            "The file \"{}\" cannot be decompressed; it may be damaged or corrupt.\n({})",
            name, detail
        ),
        ReadError::Io(err) => format!("The file \"{}\" could not be opened: {}.", name, err),
    }
}

pub(crate) fn read_failure(path: &Path, record_num: &u64, source: &ReadError) -> String {
    let name = base_name(path);
    match source {
        ReadError::ShortRead => format!(
            "The file \"{}\" appears to have been cut short in the middle of record {}.",
            name, record_num
        ),
        ReadError::BadFile(detail) => format!(
            "The file \"{}\" appears to be damaged or corrupt at record {}.\n({})",
            name, record_num, detail
        ),
        ReadError::Decompress(detail) => format!(
            "Record {} of \"{}\" cannot be decompressed; the file may be damaged or corrupt.\n({})",
            record_num, name, detail
        ),
        ReadError::UnknownFormat => format!(
            "The file \"{}\" isn't a capture file in a format capmerge understands.",
            name
        ),
        ReadError::Io(err) => format!(
            "An error occurred while reading record {} of \"{}\": {}.",
            record_num, name, err
        ),
    }
}

pub(crate) fn output_open_failure(destination: &Path, source: &WriteError) -> String {
    match source {
        WriteError::UnwritableEncapsulation { format, encapsulation } if encapsulation.is_per_record() => {
            format!(
                "The input files have different network types, which can't be merged into a single \"{}\" file.",
                format
            )
        }
        WriteError::UnwritableEncapsulation { format, encapsulation } => format!(
            "Network type {} can't be saved in a \"{}\" file.",
            encapsulation, format
        ),
        WriteError::Io(err) => format!(
            "The output file \"{}\" could not be created: {}.",
            destination.display(),
            err
        ),
        other => format!(
            "The output file \"{}\" could not be created: {}.",
            destination.display(),
            other
        ),
    }
}

pub(crate) fn write_failure(
    path: &Path,
    record_num: &u64,
    destination: &Path,
    source: &WriteError,
) -> String {
    let name = base_name(path);
    match source {
        WriteError::UnwritableEncapsulation { format, encapsulation } => format!(
            "Record {} of \"{}\" has network type {}, which can't be saved in a \"{}\" file.",
            record_num, name, encapsulation, format
        ),
        WriteError::PacketTooLarge { format, captured_len, max } => format!(
            "Record {} of \"{}\" is larger than a \"{}\" file supports ({} > {} bytes).",
            record_num, name, format, captured_len, max
        ),
        WriteError::UnwritableRecordType { format, kind } => format!(
            "Record {} of \"{}\" has a record type ({}) that can't be saved in a \"{}\" file.",
            record_num, name, kind, format
        ),
        WriteError::UnwritableRecordData { format, detail } => format!(
            "Record {} of \"{}\" has data that can't be saved in a \"{}\" file.\n({})",
            record_num, name, format, detail
        ),
        WriteError::Io(err) => format!(
            "An error occurred while writing record {} of \"{}\" to \"{}\": {}.",
            record_num,
            name,
            destination.display(),
            err
        ),
    }
}

pub(crate) fn close_failure(destination: &Path, source: &WriteError) -> String {
    format!(
        "An error occurred while closing \"{}\": {}.",
        destination.display(),
        source
    )
}

pub(crate) fn bad_interface(path: &Path, record_num: &u64, interface_id: &u32) -> String {
    format!(
        "Record {} of \"{}\" has interface ID {}, which does not match any interface in its file.",
        record_num,
        base_name(path),
        interface_id
    )
}
