//! Pure parsers for the response lines of each [`Grammar`](crate::command::Grammar).

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{ModemError, Result};
use crate::status::{decode, decode_mt, SbdStatus};

/// Iridium system time epoch, 2014-05-11T14:23:55Z, in Unix seconds.
pub const IRIDIUM_EPOCH_SECS: i64 = 1_399_818_235;

/// Length of one Iridium system time tick.
pub const TICK_MILLIS: i64 = 90;

pub(crate) const SESSION_PREFIX: &str = "+SBDIX:";
pub(crate) const STATUS_PREFIX: &str = "+SBDS:";
const NO_NETWORK: &str = "no network service";

/// Outcome of one `AT+SBDIX` satellite session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionResponse {
    pub mo_status: SbdStatus,
    /// MOMSN: sequence number of the last MO message attempt.
    pub mo_sequence: u16,
    pub mt_status: SbdStatus,
    /// MTMSN: sequence number of the received MT message, if any.
    pub mt_sequence: u16,
    /// Bytes of MT data now in the device buffer.
    pub mt_length: u16,
    /// MT messages still waiting at the gateway.
    pub mt_queued: u16,
    /// An `SBDRING` alert arrived during the session.
    pub ring_alert: bool,
}

impl SessionResponse {
    /// Parse `+SBDIX: <mo>, <momsn>, <mt>, <mtmsn>, <mtlen>, <mtqueued>`.
    pub fn parse(line: &str) -> Result<Self> {
        let rest = line
            .trim()
            .strip_prefix(SESSION_PREFIX)
            .ok_or_else(|| ModemError::Protocol(format!("expected session line, got {line:?}")))?;

        let fields = parse_fields(rest)?;
        let [mo, mo_sequence, mt, mt_sequence, mt_length, mt_queued] = fields[..] else {
            return Err(ModemError::Protocol(format!(
                "session line has {} fields, expected 6: {line:?}",
                fields.len()
            )));
        };

        Ok(Self {
            mo_status: decode(to_u16(mo, line)?),
            mo_sequence: to_u16(mo_sequence, line)?,
            mt_status: decode_mt(to_u16(mt, line)?),
            mt_sequence: to_u16(mt_sequence, line)?,
            mt_length: to_u16(mt_length, line)?,
            mt_queued: to_u16(mt_queued, line)?,
            ring_alert: false,
        })
    }

    /// The outbound message reached the gateway.
    pub fn mo_success(&self) -> bool {
        matches!(self.mo_status, SbdStatus::Success(_))
    }

    /// A mobile-terminated message is waiting in the device buffer.
    pub fn has_inbound(&self) -> bool {
        self.mt_length > 0
    }
}

/// Contents of the device message buffers (`AT+SBDS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferStatus {
    pub mo_buffered: bool,
    pub mo_sequence: u16,
    pub mt_buffered: bool,
    /// `None` when the device reports -1 (no MT message received yet).
    pub mt_sequence: Option<u16>,
}

impl BufferStatus {
    /// Parse `+SBDS: <mo flag>, <momsn>, <mt flag>, <mtmsn>`.
    pub fn parse(line: &str) -> Result<Self> {
        let rest = line
            .trim()
            .strip_prefix(STATUS_PREFIX)
            .ok_or_else(|| ModemError::Protocol(format!("expected buffer status, got {line:?}")))?;

        let fields = parse_fields(rest)?;
        let [mo_flag, mo_sequence, mt_flag, mt_sequence] = fields[..] else {
            return Err(ModemError::Protocol(format!(
                "buffer status has {} fields, expected 4: {line:?}",
                fields.len()
            )));
        };

        Ok(Self {
            mo_buffered: mo_flag != 0,
            mo_sequence: to_u16(mo_sequence, line)?,
            mt_buffered: mt_flag != 0,
            mt_sequence: if mt_sequence < 0 {
                None
            } else {
                Some(to_u16(mt_sequence, line)?)
            },
        })
    }
}

/// Signal strength in bars, 0-5.
pub fn parse_signal(value: &str) -> Result<u8> {
    match value.trim().parse::<u8>() {
        Ok(bars) if bars <= 5 => Ok(bars),
        _ => Err(ModemError::Protocol(format!(
            "invalid signal quality {value:?}"
        ))),
    }
}

/// Accumulated energy estimate in microamp-hours.
pub fn parse_energy(value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ModemError::Protocol(format!("invalid energy value {value:?}")))
}

/// Numeric status line (`0`, `1`, ...).
pub fn parse_status_code(line: &str) -> Result<u16> {
    line.trim()
        .parse::<u16>()
        .map_err(|_| ModemError::Protocol(format!("expected status code, got {line:?}")))
}

/// Serial number or model name, with an optional `+CGSN:`-style prefix.
pub fn parse_identity(line: &str) -> Result<String> {
    let line = line.trim();
    let value = match line.split_once(':') {
        Some((prefix, rest)) if prefix.starts_with('+') => rest.trim(),
        _ => line,
    };
    if value.is_empty() {
        return Err(ModemError::Protocol("empty identity response".to_string()));
    }
    Ok(value.to_string())
}

/// Iridium system time from the `-MSSTM:` value.
///
/// Returns `Ok(None)` when the modem reports no network service.
pub fn parse_network_time(value: &str) -> Result<Option<DateTime<Utc>>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(NO_NETWORK) {
        return Ok(None);
    }

    let ticks = u32::from_str_radix(value, 16)
        .map_err(|_| ModemError::Protocol(format!("invalid system time {value:?}")))?;
    let elapsed = TimeDelta::try_milliseconds(i64::from(ticks) * TICK_MILLIS)
        .ok_or_else(|| ModemError::Protocol(format!("system time out of range {value:?}")))?;

    iridium_epoch()?
        .checked_add_signed(elapsed)
        .map(Some)
        .ok_or_else(|| ModemError::Protocol(format!("system time out of range {value:?}")))
}

pub fn iridium_epoch() -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(IRIDIUM_EPOCH_SECS, 0)
        .ok_or_else(|| ModemError::Protocol("invalid Iridium epoch".to_string()))
}

fn parse_fields(rest: &str) -> Result<Vec<i64>> {
    rest.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<i64>()
                .map_err(|_| ModemError::Protocol(format!("non-numeric field {field:?}")))
        })
        .collect()
}

fn to_u16(value: i64, line: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| ModemError::Protocol(format!("field {value} out of range in {line:?}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parse_successful_session() {
        let resp = SessionResponse::parse("+SBDIX: 0, 12, 0, 0, 0, 0").unwrap();
        assert_eq!(resp.mo_status, SbdStatus::Success(0));
        assert_eq!(resp.mo_sequence, 12);
        assert_eq!(resp.mt_status, SbdStatus::Ok(0));
        assert!(resp.mo_success());
        assert!(!resp.has_inbound());
        assert!(!resp.ring_alert);
    }

    #[test]
    fn parse_session_with_inbound() {
        let resp = SessionResponse::parse("+SBDIX: 1, 13, 1, 7, 12, 2").unwrap();
        assert!(resp.mo_success());
        assert_eq!(resp.mt_status, SbdStatus::Success(1));
        assert_eq!(resp.mt_sequence, 7);
        assert_eq!(resp.mt_length, 12);
        assert_eq!(resp.mt_queued, 2);
        assert!(resp.has_inbound());
    }

    #[test]
    fn parse_session_tolerates_spacing() {
        let resp = SessionResponse::parse("+SBDIX:32,4,2,0,0,0").unwrap();
        assert_eq!(resp.mo_status, SbdStatus::NoNetwork(32));
        assert!(!resp.mo_success());
        assert_eq!(resp.mt_status, SbdStatus::MailboxError(2));

        let resp = SessionResponse::parse("+SBDIX: 18 5 0 0 0 0").unwrap();
        assert_eq!(resp.mo_status, SbdStatus::ConnectionLost(18));
    }

    #[test]
    fn malformed_session_lines() {
        assert!(SessionResponse::parse("+SBDIX: 0, 1, 0").is_err());
        assert!(SessionResponse::parse("+SBDIX: 0, x, 0, 0, 0, 0").is_err());
        assert!(SessionResponse::parse("+SBDIX: 0, -1, 0, 0, 0, 0").is_err());
        assert!(SessionResponse::parse("+SBDS: 0, 1, 0, 0").is_err());
        assert!(SessionResponse::parse("").is_err());
    }

    #[test]
    fn parse_buffer_status() {
        let status = BufferStatus::parse("+SBDS: 1, 42, 0, -1").unwrap();
        assert!(status.mo_buffered);
        assert_eq!(status.mo_sequence, 42);
        assert!(!status.mt_buffered);
        assert_eq!(status.mt_sequence, None);

        let status = BufferStatus::parse("+SBDS: 0, 42, 1, 9").unwrap();
        assert!(status.mt_buffered);
        assert_eq!(status.mt_sequence, Some(9));

        assert!(BufferStatus::parse("+SBDS: 0, 42").is_err());
    }

    #[test]
    fn signal_bars() {
        assert_eq!(parse_signal("5").unwrap(), 5);
        assert_eq!(parse_signal(" 0").unwrap(), 0);
        assert!(parse_signal("6").is_err());
        assert!(parse_signal("").is_err());
    }

    #[test]
    fn status_and_energy_values() {
        assert_eq!(parse_status_code("0").unwrap(), 0);
        assert!(parse_status_code("READY").is_err());
        assert_eq!(parse_energy("1234").unwrap(), 1234);
        assert!(parse_energy("-1").is_err());
    }

    #[test]
    fn identity_lines() {
        assert_eq!(parse_identity("300234010753370").unwrap(), "300234010753370");
        assert_eq!(parse_identity("+CGSN: 300234010753370").unwrap(), "300234010753370");
        assert_eq!(
            parse_identity("IRIDIUM 9600 Family SBD Transceiver").unwrap(),
            "IRIDIUM 9600 Family SBD Transceiver"
        );
        assert!(parse_identity("  ").is_err());
    }

    #[test]
    fn network_time_counts_90ms_ticks() {
        let epoch = Utc.with_ymd_and_hms(2014, 5, 11, 14, 23, 55).unwrap();
        assert_eq!(iridium_epoch().unwrap(), epoch);

        assert_eq!(parse_network_time("0").unwrap(), Some(epoch));
        let time = parse_network_time("a").unwrap().unwrap();
        assert_eq!(time - epoch, TimeDelta::milliseconds(900));

        let time = parse_network_time("62a7f6cd").unwrap().unwrap();
        assert_eq!(
            (time - epoch).num_milliseconds(),
            0x62a7_f6cd_i64 * 90
        );
    }

    #[test]
    fn network_time_without_service() {
        assert_eq!(parse_network_time("no network service").unwrap(), None);
        assert!(parse_network_time("zz").is_err());
    }
}
