//! The AT vocabulary used by the driver and the shape of each response.

use serde::Serialize;

use crate::response::{SESSION_PREFIX, STATUS_PREFIX};

/// Which device buffers a clear command erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferClear {
    Mo,
    Mt,
    Both,
}

impl BufferClear {
    fn digit(self) -> u8 {
        match self {
            BufferClear::Mo => 0,
            BufferClear::Mt => 1,
            BufferClear::Both => 2,
        }
    }

    pub fn clears_mo(self) -> bool {
        matches!(self, BufferClear::Mo | BufferClear::Both)
    }

    pub fn clears_mt(self) -> bool {
        matches!(self, BufferClear::Mt | BufferClear::Both)
    }
}

impl std::str::FromStr for BufferClear {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mo" => Ok(BufferClear::Mo),
            "mt" => Ok(BufferClear::Mt),
            "both" | "all" => Ok(BufferClear::Both),
            other => Err(format!("unknown buffer '{other}' (expected mo, mt or both)")),
        }
    }
}

/// Expected response shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Only a terminal line.
    Bare,
    /// One body line starting with the given prefix.
    Prefixed(&'static str),
    /// One free-form body line (serial number, model name).
    Identity,
    /// One numeric status line.
    StatusLine,
    /// The `+SBDIX:` session line.
    Session,
    /// `READY`, then an upload, then a numeric status line.
    Upload,
    /// A length-prefixed, checksummed binary block.
    BinaryBlock,
}

impl Grammar {
    /// Prefix of the body line that carries the response data.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Grammar::Prefixed(prefix) => Some(prefix),
            Grammar::Session => Some(SESSION_PREFIX),
            _ => None,
        }
    }

    /// Whether the response carries a text line to parse.
    pub fn has_line(self) -> bool {
        !matches!(self, Grammar::Bare | Grammar::BinaryBlock)
    }
}

/// Commands understood by 9602/9603-class transceivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    Attention,
    SignalQuality,
    Imei,
    Model,
    NetworkTime,
    QueryEnergy,
    SetEnergy(u32),
    Radio(bool),
    WriteText(String),
    WriteBinary(usize),
    Session,
    ReadBinary,
    BufferStatus,
    ClearBuffers(BufferClear),
}

impl AtCommand {
    /// The command line, without terminator.
    pub fn line(&self) -> String {
        match self {
            AtCommand::Attention => "AT".to_string(),
            AtCommand::SignalQuality => "AT+CSQ".to_string(),
            AtCommand::Imei => "AT+CGSN".to_string(),
            AtCommand::Model => "AT+CGMM".to_string(),
            AtCommand::NetworkTime => "AT-MSSTM".to_string(),
            AtCommand::QueryEnergy => "AT+GEMON".to_string(),
            AtCommand::SetEnergy(value) => format!("AT+GEMON={value}"),
            AtCommand::Radio(true) => "AT*R1".to_string(),
            AtCommand::Radio(false) => "AT*R0".to_string(),
            AtCommand::WriteText(text) => format!("AT+SBDWT={text}"),
            AtCommand::WriteBinary(len) => format!("AT+SBDWB={len}"),
            AtCommand::Session => "AT+SBDIX".to_string(),
            AtCommand::ReadBinary => "AT+SBDRB".to_string(),
            AtCommand::BufferStatus => "AT+SBDS".to_string(),
            AtCommand::ClearBuffers(which) => format!("AT+SBDD{}", which.digit()),
        }
    }

    pub fn grammar(&self) -> Grammar {
        match self {
            AtCommand::Attention
            | AtCommand::SetEnergy(_)
            | AtCommand::Radio(_)
            | AtCommand::WriteText(_) => Grammar::Bare,
            AtCommand::SignalQuality => Grammar::Prefixed("+CSQ:"),
            AtCommand::Imei | AtCommand::Model => Grammar::Identity,
            AtCommand::NetworkTime => Grammar::Prefixed("-MSSTM:"),
            AtCommand::QueryEnergy => Grammar::Prefixed("+GEMON:"),
            AtCommand::BufferStatus => Grammar::Prefixed(STATUS_PREFIX),
            AtCommand::ClearBuffers(_) => Grammar::StatusLine,
            AtCommand::Session => Grammar::Session,
            AtCommand::WriteBinary(_) => Grammar::Upload,
            AtCommand::ReadBinary => Grammar::BinaryBlock,
        }
    }

    /// Read-only commands, safe to re-issue after an echo mismatch.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            AtCommand::Attention
                | AtCommand::SignalQuality
                | AtCommand::Imei
                | AtCommand::Model
                | AtCommand::NetworkTime
                | AtCommand::QueryEnergy
                | AtCommand::BufferStatus
        )
    }
}

impl std::fmt::Display for AtCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line())
    }
}

/// SBD checksum: the low 16 bits of the byte sum.
pub fn checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

/// Payload followed by its big-endian checksum, as `AT+SBDWB` expects.
pub fn encode_upload(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.extend_from_slice(payload);
    out.extend_from_slice(&checksum(payload).to_be_bytes());
    out
}
