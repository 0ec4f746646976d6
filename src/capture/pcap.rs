use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::capture::interface::{InterfaceDescriptor, SectionInfo, TimestampPrecision};
use crate::capture::record::{Encapsulation, Record, RecordKind, Timestamp};
use crate::capture::{CaptureFormat, CaptureReader, CaptureWriter, OutputParams, ReadError, WriteError};

pub const PCAP_FORMAT_NAME: &str = "pcap";
pub const PCAP_MAGIC_MICROS: u32 = 0xa1b2_c3d4;
pub const PCAP_MAGIC_NANOS: u32 = 0xa1b2_3c4d;
pub const PCAP_MAX_SNAPLEN: u32 = 262_144;

const FILE_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;
const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;
const LINK_TYPE_MASK: u32 = 0x0000_ffff;
const FCS_PRESENT_BIT: u32 = 0x0400_0000;
const IO_BUFFER_SIZE: usize = 64 * 1024;
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

const LINK_TYPES: &[(u16, Encapsulation)] = &[
    (0, Encapsulation::NULL),
    (1, Encapsulation::ETHERNET),
    (6, Encapsulation::TOKEN_RING),
    (101, Encapsulation::RAW_IP),
    (105, Encapsulation::IEEE_802_11),
    (113, Encapsulation::LINUX_SLL),
    (127, Encapsulation::IEEE_802_11_RADIOTAP),
    (276, Encapsulation::LINUX_SLL2),
];

pub fn encapsulation_for_link_type(link_type: u16) -> Option<Encapsulation> {
    LINK_TYPES
        .iter()
        .find(|(lt, _)| *lt == link_type)
        .map(|(_, encap)| *encap)
}

pub fn link_type_for_encapsulation(encapsulation: Encapsulation) -> Option<u16> {
    LINK_TYPES
        .iter()
        .find(|(_, encap)| *encap == encapsulation)
        .map(|(lt, _)| *lt)
}

/// Classic libpcap files: one link type, one implicit interface.
pub struct PcapFormat;

impl CaptureFormat for PcapFormat {
    fn name(&self) -> &'static str {
        PCAP_FORMAT_NAME
    }

    fn open_reader(&self, path: &Path) -> Result<Option<Box<dyn CaptureReader>>, ReadError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let mut buffered = BufReader::with_capacity(IO_BUFFER_SIZE, file);

        let compressed = buffered.fill_buf()?.starts_with(&ZSTD_MAGIC);
        let mut reader: Box<dyn Read + Send> = if compressed {
            let decoder = zstd::stream::read::Decoder::with_buffer(buffered)
                .map_err(|e| ReadError::Decompress(e.to_string()))?;
            Box::new(decoder)
        } else {
            Box::new(buffered)
        };

        let mut header = [0u8; FILE_HEADER_LEN];
        let read =
            read_full(&mut reader, &mut header).map_err(|e| ReadError::from_record_io(e, compressed))?;
        if read < 4 {
            return Ok(None);
        }

        let magic = [header[0], header[1], header[2], header[3]];
        let (big_endian, nanos) = match (u32::from_le_bytes(magic), u32::from_be_bytes(magic)) {
            (PCAP_MAGIC_MICROS, _) => (false, false),
            (PCAP_MAGIC_NANOS, _) => (false, true),
            (_, PCAP_MAGIC_MICROS) => (true, false),
            (_, PCAP_MAGIC_NANOS) => (true, true),
            _ => return Ok(None),
        };
        if read < FILE_HEADER_LEN {
            return Err(ReadError::ShortRead);
        }

        let fields = Fields { big_endian };
        let version_major = fields.u16_at(&header, 4);
        let version_minor = fields.u16_at(&header, 6);
        if version_major != VERSION_MAJOR {
            return Err(ReadError::BadFile(format!(
                "pcap version {}.{} is not supported",
                version_major, version_minor
            )));
        }
        let snaplen = fields.u32_at(&header, 16);
        let network = fields.u32_at(&header, 20);

        let link_type = (network & LINK_TYPE_MASK) as u16;
        let encapsulation = encapsulation_for_link_type(link_type).ok_or_else(|| {
            ReadError::BadFile(format!("network type {} unknown or unsupported", link_type))
        })?;

        let tsprecision = if nanos {
            TimestampPrecision::Nanoseconds
        } else {
            TimestampPrecision::Microseconds
        };
        let interface = InterfaceDescriptor {
            encapsulation,
            link_type,
            time_units_per_second: tsprecision.units_per_second(),
            tsprecision,
            snaplen,
            tsresol: nanos.then_some(9),
            // FCS length is stored in 16-bit units in the top nibble.
            fcslen: (network & FCS_PRESENT_BIT != 0).then(|| ((network >> 28) * 2) as u8),
            ..Default::default()
        };

        Ok(Some(Box::new(PcapReader {
            reader,
            size,
            compressed,
            fields,
            nanos,
            encapsulation,
            snaplen,
            interfaces: vec![interface],
        })))
    }

    fn create_writer(
        &self,
        destination: &Path,
        params: &OutputParams<'_>,
    ) -> Result<Box<dyn CaptureWriter>, WriteError> {
        let unwritable = || WriteError::UnwritableEncapsulation {
            format: PCAP_FORMAT_NAME,
            encapsulation: params.encapsulation,
        };
        if params.encapsulation.is_per_record() {
            return Err(unwritable());
        }
        let link_type = link_type_for_encapsulation(params.encapsulation).ok_or_else(unwritable)?;

        let snaplen = if params.snaplen == 0 || params.snaplen > PCAP_MAX_SNAPLEN {
            PCAP_MAX_SNAPLEN
        } else {
            params.snaplen
        };

        let file = File::create(destination)?;
        let mut out = BufWriter::with_capacity(IO_BUFFER_SIZE, file);

        let mut header = Vec::with_capacity(FILE_HEADER_LEN);
        header.extend_from_slice(&PCAP_MAGIC_MICROS.to_le_bytes());
        header.extend_from_slice(&VERSION_MAJOR.to_le_bytes());
        header.extend_from_slice(&VERSION_MINOR.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&snaplen.to_le_bytes());
        header.extend_from_slice(&u32::from(link_type).to_le_bytes());
        out.write_all(&header)?;

        Ok(Box::new(PcapWriter {
            out,
            encapsulation: params.encapsulation,
        }))
    }
}

#[derive(Clone, Copy)]
struct Fields {
    big_endian: bool,
}

impl Fields {
    fn u16_at(&self, buf: &[u8], offset: usize) -> u16 {
        let bytes = [buf[offset], buf[offset + 1]];
        if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    }

    fn u32_at(&self, buf: &[u8], offset: usize) -> u32 {
        let bytes = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        }
    }
}

struct PcapReader {
    reader: Box<dyn Read + Send>,
    size: u64,
    /// Input is a zstd stream; failures while inflating are decompression errors.
    compressed: bool,
    fields: Fields,
    nanos: bool,
    encapsulation: Encapsulation,
    snaplen: u32,
    interfaces: Vec<InterfaceDescriptor>,
}

impl CaptureReader for PcapReader {
    fn read_next(&mut self) -> Result<Option<Record>, ReadError> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let read = read_full(&mut self.reader, &mut header)
            .map_err(|e| ReadError::from_record_io(e, self.compressed))?;
        match read {
            0 => return Ok(None),
            RECORD_HEADER_LEN => {}
            _ => return Err(ReadError::ShortRead),
        }

        let ts_secs = self.fields.u32_at(&header, 0);
        let ts_frac = self.fields.u32_at(&header, 4);
        let captured_len = self.fields.u32_at(&header, 8);
        let original_len = self.fields.u32_at(&header, 12);

        if captured_len > PCAP_MAX_SNAPLEN {
            return Err(ReadError::BadFile(format!(
                "record length {} is bigger than the maximum of {}",
                captured_len, PCAP_MAX_SNAPLEN
            )));
        }
        let nanos = if self.nanos { ts_frac } else { ts_frac.saturating_mul(1_000) };
        if nanos >= 1_000_000_000 {
            return Err(ReadError::BadFile(format!(
                "sub-second timestamp {} is out of range",
                ts_frac
            )));
        }

        let mut data = vec![0u8; captured_len as usize];
        self.reader
            .read_exact(&mut data)
            .map_err(|e| ReadError::from_record_io(e, self.compressed))?;

        Ok(Some(Record {
            kind: RecordKind::Packet,
            timestamp: Timestamp::new(i64::from(ts_secs), nanos),
            captured_len,
            original_len,
            interface_id: Some(0),
            encapsulation: self.encapsulation,
            data,
        }))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn file_encapsulation(&self) -> Encapsulation {
        self.encapsulation
    }

    fn snapshot_length(&self) -> u32 {
        self.snaplen
    }

    fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.interfaces
    }

    fn section(&self) -> Option<&SectionInfo> {
        None
    }
}

struct PcapWriter {
    out: BufWriter<File>,
    encapsulation: Encapsulation,
}

impl CaptureWriter for PcapWriter {
    fn write_record(&mut self, record: &Record) -> Result<(), WriteError> {
        if record.kind != RecordKind::Packet {
            return Err(WriteError::UnwritableRecordType {
                format: PCAP_FORMAT_NAME,
                kind: record.kind,
            });
        }
        if record.encapsulation != self.encapsulation {
            return Err(WriteError::UnwritableEncapsulation {
                format: PCAP_FORMAT_NAME,
                encapsulation: record.encapsulation,
            });
        }
        if record.captured_len > PCAP_MAX_SNAPLEN {
            return Err(WriteError::PacketTooLarge {
                format: PCAP_FORMAT_NAME,
                captured_len: record.captured_len,
                max: PCAP_MAX_SNAPLEN,
            });
        }
        let secs = u32::try_from(record.timestamp.secs).map_err(|_| WriteError::UnwritableRecordData {
            format: PCAP_FORMAT_NAME,
            detail: format!("timestamp {} is outside the 32-bit range", record.timestamp),
        })?;

        let payload = record.payload();
        let mut header = [0u8; RECORD_HEADER_LEN];
        header[0..4].copy_from_slice(&secs.to_le_bytes());
        header[4..8].copy_from_slice(&(record.timestamp.nanos / 1_000).to_le_bytes());
        header[8..12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        header[12..16].copy_from_slice(&record.original_len.to_le_bytes());

        self.out.write_all(&header)?;
        self.out.write_all(payload)?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), WriteError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Reads until `buf` is full or the input ends; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
