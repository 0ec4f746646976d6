use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Link-layer encapsulation of a file, an interface or a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Encapsulation(pub i32);

impl Encapsulation {
    /// Records carry their own encapsulation; the file has no single type.
    pub const PER_RECORD: Encapsulation = Encapsulation(-1);
    pub const UNKNOWN: Encapsulation = Encapsulation(0);
    pub const ETHERNET: Encapsulation = Encapsulation(1);
    pub const TOKEN_RING: Encapsulation = Encapsulation(2);
    pub const RAW_IP: Encapsulation = Encapsulation(7);
    pub const IEEE_802_11: Encapsulation = Encapsulation(20);
    pub const LINUX_SLL: Encapsulation = Encapsulation(25);
    pub const NULL: Encapsulation = Encapsulation(15);
    pub const IEEE_802_11_RADIOTAP: Encapsulation = Encapsulation(23);
    pub const LINUX_SLL2: Encapsulation = Encapsulation(210);

    pub fn is_per_record(self) -> bool {
        self == Self::PER_RECORD
    }
}

impl fmt::Display for Encapsulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::PER_RECORD => write!(f, "per-record"),
            Self::UNKNOWN => write!(f, "unknown"),
            Self::ETHERNET => write!(f, "ethernet"),
            Self::TOKEN_RING => write!(f, "token-ring"),
            Self::RAW_IP => write!(f, "raw-ip"),
            Self::IEEE_802_11 => write!(f, "ieee-802-11"),
            Self::LINUX_SLL => write!(f, "linux-sll"),
            Self::NULL => write!(f, "null"),
            Self::IEEE_802_11_RADIOTAP => write!(f, "ieee-802-11-radiotap"),
            Self::LINUX_SLL2 => write!(f, "linux-sll2"),
            Encapsulation(other) => write!(f, "encap-{}", other),
        }
    }
}

/// Absolute record time: whole seconds since the epoch plus a nanosecond fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            secs: millis.div_euclid(1000),
            nanos: (millis.rem_euclid(1000) as u32) * 1_000_000,
        }
    }

    pub fn is_earlier_than(&self, other: &Timestamp) -> bool {
        self < other
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.secs
            .cmp(&other.secs)
            .then_with(|| self.nanos.cmp(&other.nanos))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Packet,
    Event,
    SystemdJournal,
    Custom,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Packet => "packet",
            RecordKind::Event => "event",
            RecordKind::SystemdJournal => "systemd journal entry",
            RecordKind::Custom => "custom block",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub timestamp: Timestamp,
    pub captured_len: u32,
    pub original_len: u32,
    pub interface_id: Option<u32>,
    pub encapsulation: Encapsulation,
    pub data: Vec<u8>,
}

impl Record {
    pub fn packet(timestamp: Timestamp, interface_id: u32, data: Vec<u8>) -> Self {
        let len = data.len() as u32;
        Self {
            kind: RecordKind::Packet,
            timestamp,
            captured_len: len,
            original_len: len,
            interface_id: Some(interface_id),
            encapsulation: Encapsulation::ETHERNET,
            data,
        }
    }

    pub fn with_encapsulation(mut self, encapsulation: Encapsulation) -> Self {
        self.encapsulation = encapsulation;
        self
    }

    /// Interface reference that must be remapped on output, if any.
    pub fn interface_ref(&self) -> Option<u32> {
        match self.kind {
            RecordKind::Packet => self.interface_id,
            RecordKind::Event | RecordKind::SystemdJournal | RecordKind::Custom => None,
        }
    }

    /// Bytes covered by the captured length; never longer than the stored data.
    pub fn payload(&self) -> &[u8] {
        let end = (self.captured_len as usize).min(self.data.len());
        &self.data[..end]
    }
}
