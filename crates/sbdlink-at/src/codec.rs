use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::error::{AtError, Result};

/// Command line terminator sent to the modem.
pub const TERMINATOR: u8 = b'\r';

/// Longest line accepted before the reader gives up on finding a terminator.
pub const MAX_LINE_LENGTH: usize = 2048;

/// How an AT exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `OK`
    Ok,
    /// `ERROR` (code 0) or `ERROR:<code>`.
    Error(u16),
    /// No terminal line arrived before the exchange deadline.
    Timeout,
}

impl Terminal {
    pub fn is_ok(self) -> bool {
        matches!(self, Terminal::Ok)
    }
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminal::Ok => f.write_str("OK"),
            Terminal::Error(0) => f.write_str("ERROR"),
            Terminal::Error(code) => write!(f, "ERROR:{code}"),
            Terminal::Timeout => f.write_str("timeout"),
        }
    }
}

/// Append a command line and its terminator to `dst`.
pub fn encode_command(command: &str, dst: &mut BytesMut) {
    dst.reserve(command.len() + 1);
    dst.put_slice(command.as_bytes());
    dst.put_u8(TERMINATOR);
}

/// Decode the next line from a buffer.
///
/// A line ends at the first `\r` or `\n`. Only that one terminator byte is
/// consumed, so a `\r\n` pair yields an empty line next time around; callers
/// that want content lines skip blanks themselves. Bytes that are not valid
/// UTF-8 are replaced rather than rejected.
///
/// Returns `Ok(None)` if the buffer doesn't contain a terminator yet.
pub fn decode_line(src: &mut BytesMut, max_len: usize) -> Result<Option<String>> {
    let Some(end) = src.iter().position(|b| *b == b'\r' || *b == b'\n') else {
        if src.len() > max_len {
            return Err(AtError::LineTooLong {
                size: src.len(),
                max: max_len,
            });
        }
        return Ok(None);
    };

    if end > max_len {
        return Err(AtError::LineTooLong {
            size: end,
            max: max_len,
        });
    }

    let line = src.split_to(end);
    let _ = src.split_to(1);
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Drop any leading `\r`/`\n` bytes. Returns how many were removed.
pub fn skip_line_terminators(src: &mut BytesMut) -> usize {
    let count = src
        .iter()
        .take_while(|b| **b == b'\r' || **b == b'\n')
        .count();
    let _ = src.split_to(count);
    count
}

/// Recognize a terminal response line.
///
/// `ERROR` followed by something other than a numeric code is still an
/// error, reported with code 0.
pub fn classify(line: &str) -> Option<Terminal> {
    let line = line.trim();
    if line == "OK" {
        return Some(Terminal::Ok);
    }

    let rest = line.strip_prefix("ERROR")?;
    if rest.is_empty() {
        return Some(Terminal::Error(0));
    }

    let code = rest.strip_prefix(':').unwrap_or(rest).trim();
    match code.parse::<u16>() {
        Ok(code) => Some(Terminal::Error(code)),
        Err(_) => {
            warn!(line, "unparseable error code in terminal line");
            Some(Terminal::Error(0))
        }
    }
}
