use serde::{Deserialize, Serialize};

use crate::capture::record::{Encapsulation, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPrecision {
    Seconds,
    Milliseconds,
    #[default]
    Microseconds,
    Nanoseconds,
}

impl TimestampPrecision {
    pub fn units_per_second(self) -> u64 {
        match self {
            TimestampPrecision::Seconds => 1,
            TimestampPrecision::Milliseconds => 1_000,
            TimestampPrecision::Microseconds => 1_000_000,
            TimestampPrecision::Nanoseconds => 1_000_000_000,
        }
    }
}

/// One instruction of a compiled BPF program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpfInstruction {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

/// Capture filter attached to an interface, either as source text or compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CaptureFilter {
    Expression(String),
    Bpf(Vec<BpfInstruction>),
}

/// Counters a capture tool accumulated for an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InterfaceStatistics {
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InterfaceDescriptor {
    pub encapsulation: Encapsulation,
    pub link_type: u16,
    pub time_units_per_second: u64,
    pub tsprecision: TimestampPrecision,
    pub snaplen: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsresol: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcslen: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<CaptureFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statistics: Vec<InterfaceStatistics>,
}

impl InterfaceDescriptor {
    pub fn new(encapsulation: Encapsulation, link_type: u16, snaplen: u32) -> Self {
        let tsprecision = TimestampPrecision::Microseconds;
        Self {
            encapsulation,
            link_type,
            time_units_per_second: tsprecision.units_per_second(),
            tsprecision,
            snaplen,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Copy for the merged interface set. Filters and statistics belong to
    /// the source file and are not carried over.
    pub fn clone_for_merge(&self) -> Self {
        Self {
            filter: None,
            statistics: Vec::new(),
            ..self.clone()
        }
    }
}

/// Section-level metadata written at the head of an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SectionInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_application: Option<String>,
}
