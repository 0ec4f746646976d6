use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::capture::interface::{InterfaceDescriptor, SectionInfo};
use crate::capture::record::{Encapsulation, Record, RecordKind, Timestamp};
use crate::capture::{CaptureFormat, CaptureReader, CaptureWriter, OutputParams, ReadError, WriteError};

pub const JSONL_FORMAT_NAME: &str = "jsonl";
pub const JSONL_FORMAT_TAG: &str = "capmerge-jsonl";
pub const JSONL_FORMAT_VERSION: u32 = 1;

const IO_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    format: String,
    version: u32,
    encapsulation: Encapsulation,
    snaplen: u32,
    #[serde(default)]
    section: SectionInfo,
    #[serde(default)]
    interfaces: Vec<InterfaceDescriptor>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    kind: RecordKind,
    ts_sec: i64,
    ts_nsec: u32,
    caplen: u32,
    len: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interface_id: Option<u32>,
    encapsulation: Encapsulation,
    data: String,
}

/// Line-delimited JSON captures: a header line, then one record per line.
pub struct JsonlFormat;

impl CaptureFormat for JsonlFormat {
    fn name(&self) -> &'static str {
        JSONL_FORMAT_NAME
    }

    fn open_reader(&self, path: &Path) -> Result<Option<Box<dyn CaptureReader>>, ReadError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, file);

        if reader.fill_buf()?.first() != Some(&b'{') {
            return Ok(None);
        }

        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return Ok(None);
        }
        let value: serde_json::Value = match serde_json::from_str(line.trim()) {
            Ok(value) => value,
            Err(_) => return Ok(None),
        };
        if value.get("format").and_then(|f| f.as_str()) != Some(JSONL_FORMAT_TAG) {
            return Ok(None);
        }

        let header: FileHeader = serde_json::from_value(value)
            .map_err(|e| ReadError::BadFile(format!("invalid header: {}", e)))?;
        if header.version != JSONL_FORMAT_VERSION {
            return Err(ReadError::BadFile(format!(
                "{} version {} is not supported",
                JSONL_FORMAT_TAG, header.version
            )));
        }

        Ok(Some(Box::new(JsonlReader {
            reader,
            size,
            line_number: 1,
            header,
        })))
    }

    fn create_writer(
        &self,
        destination: &Path,
        params: &OutputParams<'_>,
    ) -> Result<Box<dyn CaptureWriter>, WriteError> {
        let header = FileHeader {
            format: JSONL_FORMAT_TAG.to_string(),
            version: JSONL_FORMAT_VERSION,
            encapsulation: params.encapsulation,
            snaplen: params.snaplen,
            section: params.section.clone(),
            interfaces: params.interfaces.to_vec(),
        };

        let file = File::create(destination)?;
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, file);
        serde_json::to_writer(&mut out, &header).map_err(io::Error::from)?;
        out.write_all(b"\n")?;

        Ok(Box::new(JsonlWriter { out }))
    }
}

struct JsonlReader {
    reader: BufReader<File>,
    size: u64,
    line_number: usize,
    header: FileHeader,
}

impl CaptureReader for JsonlReader {
    fn read_next(&mut self) -> Result<Option<Record>, ReadError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = match self.reader.read_line(&mut line) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(ReadError::BadFile(format!(
                        "line {} is not valid UTF-8",
                        self.line_number + 1
                    )));
                }
                Err(e) => return Err(ReadError::Io(e)),
            };
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: RecordLine = match serde_json::from_str(trimmed) {
                Ok(parsed) => parsed,
                // An unterminated final line was cut off mid-write.
                Err(_) if !line.ends_with('\n') => return Err(ReadError::ShortRead),
                Err(e) => {
                    return Err(ReadError::BadFile(format!("line {}: {}", self.line_number, e)));
                }
            };
            return self.decode(parsed).map(Some);
        }
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn file_encapsulation(&self) -> Encapsulation {
        self.header.encapsulation
    }

    fn snapshot_length(&self) -> u32 {
        self.header.snaplen
    }

    fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.header.interfaces
    }

    fn section(&self) -> Option<&SectionInfo> {
        Some(&self.header.section)
    }
}

impl JsonlReader {
    fn decode(&self, line: RecordLine) -> Result<Record, ReadError> {
        let data = hex::decode(&line.data)
            .map_err(|e| ReadError::BadFile(format!("line {}: bad payload: {}", self.line_number, e)))?;
        if data.len() != line.caplen as usize {
            return Err(ReadError::BadFile(format!(
                "line {}: payload has {} bytes but caplen is {}",
                self.line_number,
                data.len(),
                line.caplen
            )));
        }
        if line.ts_nsec >= 1_000_000_000 {
            return Err(ReadError::BadFile(format!(
                "line {}: nanoseconds {} out of range",
                self.line_number, line.ts_nsec
            )));
        }

        Ok(Record {
            kind: line.kind,
            timestamp: Timestamp::new(line.ts_sec, line.ts_nsec),
            captured_len: line.caplen,
            original_len: line.len,
            interface_id: line.interface_id,
            encapsulation: line.encapsulation,
            data,
        })
    }
}

struct JsonlWriter {
    out: BufWriter<File>,
}

impl CaptureWriter for JsonlWriter {
    fn write_record(&mut self, record: &Record) -> Result<(), WriteError> {
        let payload = record.payload();
        let line = RecordLine {
            kind: record.kind,
            ts_sec: record.timestamp.secs,
            ts_nsec: record.timestamp.nanos,
            caplen: payload.len() as u32,
            len: record.original_len,
            interface_id: record.interface_id,
            encapsulation: record.encapsulation,
            data: hex::encode(payload),
        };
        serde_json::to_writer(&mut self.out, &line).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), WriteError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_interfaces() -> Vec<InterfaceDescriptor> {
        vec![
            InterfaceDescriptor::new(Encapsulation::ETHERNET, 1, 65535).with_name("eth0"),
            InterfaceDescriptor::new(Encapsulation::RAW_IP, 101, 65535).with_name("tun0"),
        ]
    }

    #[test]
    fn test_written_file_reads_back() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("out.jsonl");
        let interfaces = sample_interfaces();
        let section = SectionInfo {
            user_application: Some("capmerge test".to_string()),
            ..Default::default()
        };

        let mut writer = JsonlFormat
            .create_writer(
                &path,
                &OutputParams {
                    encapsulation: Encapsulation::PER_RECORD,
                    snaplen: 65535,
                    section: &section,
                    interfaces: &interfaces,
                },
            )
            .unwrap();

        let mut event = Record::packet(Timestamp::new(2, 0), 0, b"hello".to_vec());
        event.kind = RecordKind::Event;
        event.interface_id = None;
        let tun = Record::packet(Timestamp::new(1, 42), 1, vec![0x45, 0, 0, 20])
            .with_encapsulation(Encapsulation::RAW_IP);
        writer.write_record(&tun).unwrap();
        writer.write_record(&event).unwrap();
        writer.close().unwrap();

        let mut reader = JsonlFormat.open_reader(&path).unwrap().unwrap();
        assert_eq!(reader.file_encapsulation(), Encapsulation::PER_RECORD);
        assert_eq!(reader.interfaces(), &interfaces[..]);
        assert_eq!(
            reader.section().and_then(|s| s.user_application.as_deref()),
            Some("capmerge test")
        );

        assert_eq!(reader.read_next().unwrap().unwrap(), tun);
        assert_eq!(reader.read_next().unwrap().unwrap(), event);
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_unterminated_last_line_is_short_read() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cut.jsonl");
        let content = format!(
            "{{\"format\":\"{}\",\"version\":1,\"encapsulation\":1,\"snaplen\":100}}\n{{\"kind\":\"packet\",\"ts_sec\":1,",
            JSONL_FORMAT_TAG
        );
        fs::write(&path, content).unwrap();

        let mut reader = JsonlFormat.open_reader(&path).unwrap().unwrap();
        assert!(matches!(reader.read_next(), Err(ReadError::ShortRead)));
    }

    #[test]
    fn test_garbage_line_is_bad_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.jsonl");
        let content = format!(
            "{{\"format\":\"{}\",\"version\":1,\"encapsulation\":1,\"snaplen\":100}}\nnot json at all\n",
            JSONL_FORMAT_TAG
        );
        fs::write(&path, content).unwrap();

        let mut reader = JsonlFormat.open_reader(&path).unwrap().unwrap();
        match reader.read_next() {
            Err(ReadError::BadFile(detail)) => assert!(detail.starts_with("line 2")),
            other => panic!("unexpected result: {:?}", other.map(|r| r.is_some())),
        }
    }

    #[test]
    fn test_other_json_is_not_recognized() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{\"key\": \"value\"}\n").unwrap();

        assert!(JsonlFormat.open_reader(&path).unwrap().is_none());
    }
}
