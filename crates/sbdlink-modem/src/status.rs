//! Decoding of the numeric status codes reported by the modem.
//!
//! The device reuses small integers with different meanings depending on the
//! command that produced them, so each table has its own decoder. All of them
//! are total: codes outside a table decode to [`SbdStatus::Unknown`].

use serde::Serialize;

/// Unsolicited ring alert line emitted when a mobile-terminated message is
/// waiting at the gateway.
pub const RING_ALERT: &str = "SBDRING";

/// Structured outcome of a status-bearing exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum SbdStatus {
    /// MO codes 0-4, MT code 1.
    Success(u16),
    /// Nothing to do / accepted (MT 0, write 0, clear 0).
    Ok(u16),
    /// MO codes 5-8, clear code 1.
    Failure(u16),
    UnknownError(u16),
    /// The gateway did not complete the call in the allowed time.
    Timeout(u16),
    QueueFull(u16),
    /// Too many segments or an invalid segment size.
    ProtocolError(u16),
    SessionIncomplete(u16),
    AccessDenied(u16),
    Locked(u16),
    GatewayNotResponding(u16),
    ConnectionLost(u16),
    LinkFailure(u16),
    NoNetwork(u16),
    AntennaFault(u16),
    RadioDisabled(u16),
    Busy(u16),
    /// Registration happened less than three minutes ago.
    TryLater(u16),
    ServiceDisabled(u16),
    TrafficManagement(u16),
    BandViolation(u16),
    PllLockFailure(u16),
    MailboxError(u16),
    ChecksumMismatch(u16),
    SizeMismatch(u16),
    /// `SBDRING` arrived in the middle of an exchange.
    RingAlertReceived,
    Unknown(u16),
}

/// Decode a mobile-originated session status (the first `+SBDIX` field).
pub fn decode(code: u16) -> SbdStatus {
    use SbdStatus::*;
    match code {
        0..=4 => Success(code),
        5..=8 => Failure(code),
        9 => UnknownError(code),
        10 => Timeout(code),
        11 => QueueFull(code),
        12 | 14 => ProtocolError(code),
        13 => SessionIncomplete(code),
        15 => AccessDenied(code),
        16 => Locked(code),
        17 => GatewayNotResponding(code),
        18 => ConnectionLost(code),
        19 => LinkFailure(code),
        32 => NoNetwork(code),
        33 => AntennaFault(code),
        34 => RadioDisabled(code),
        35 => Busy(code),
        36 => TryLater(code),
        37 => ServiceDisabled(code),
        38 => TrafficManagement(code),
        64 => BandViolation(code),
        65 => PllLockFailure(code),
        _ => Unknown(code),
    }
}

/// Decode a mobile-terminated status (the third `+SBDIX` field).
pub fn decode_mt(code: u16) -> SbdStatus {
    match code {
        0 => SbdStatus::Ok(code),
        1 => SbdStatus::Success(code),
        2 => SbdStatus::MailboxError(code),
        _ => SbdStatus::Unknown(code),
    }
}

/// Decode the status line that follows a binary upload (`AT+SBDWB`).
pub fn decode_write(code: u16) -> SbdStatus {
    match code {
        0 => SbdStatus::Ok(code),
        1 => SbdStatus::Timeout(code),
        2 => SbdStatus::ChecksumMismatch(code),
        3 => SbdStatus::SizeMismatch(code),
        _ => SbdStatus::Unknown(code),
    }
}

/// Decode the status line of a buffer clear (`AT+SBDD<n>`).
pub fn decode_clear(code: u16) -> SbdStatus {
    match code {
        0 => SbdStatus::Ok(code),
        1 => SbdStatus::Failure(code),
        _ => SbdStatus::Unknown(code),
    }
}

/// Recognize unsolicited lines.
pub fn decode_unsolicited(line: &str) -> Option<SbdStatus> {
    (line.trim() == RING_ALERT).then_some(SbdStatus::RingAlertReceived)
}

impl SbdStatus {
    /// The numeric code this status was decoded from.
    pub fn code(&self) -> Option<u16> {
        use SbdStatus::*;
        match *self {
            RingAlertReceived => None,
            Success(c) | Ok(c) | Failure(c) | UnknownError(c) | Timeout(c) | QueueFull(c)
            | ProtocolError(c) | SessionIncomplete(c) | AccessDenied(c) | Locked(c)
            | GatewayNotResponding(c) | ConnectionLost(c) | LinkFailure(c) | NoNetwork(c)
            | AntennaFault(c) | RadioDisabled(c) | Busy(c) | TryLater(c) | ServiceDisabled(c)
            | TrafficManagement(c) | BandViolation(c) | PllLockFailure(c) | MailboxError(c)
            | ChecksumMismatch(c) | SizeMismatch(c) | Unknown(c) => Some(c),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SbdStatus::Success(_) | SbdStatus::Ok(_))
    }

    /// Transient conditions worth another session attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SbdStatus::Timeout(_)
                | SbdStatus::SessionIncomplete(_)
                | SbdStatus::GatewayNotResponding(_)
                | SbdStatus::ConnectionLost(_)
                | SbdStatus::LinkFailure(_)
                | SbdStatus::NoNetwork(_)
                | SbdStatus::Busy(_)
                | SbdStatus::TrafficManagement(_)
                | SbdStatus::RingAlertReceived
        )
    }

    /// Conditions another attempt cannot fix without outside intervention.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SbdStatus::AccessDenied(_)
                | SbdStatus::Locked(_)
                | SbdStatus::ProtocolError(_)
                | SbdStatus::RadioDisabled(_)
        )
    }

    pub fn description(&self) -> &'static str {
        use SbdStatus::*;
        match *self {
            Success(1) => "success, MT message too big for transfer",
            Success(2) => "success, location update not accepted",
            Success(_) => "success",
            Ok(_) => "ok",
            Failure(_) => "failure",
            UnknownError(_) => "unknown error",
            Timeout(_) => "call did not complete in the allowed time",
            QueueFull(_) => "MO message queue full at the gateway",
            ProtocolError(12) => "MO message has too many segments",
            ProtocolError(_) => "invalid segment size",
            SessionIncomplete(_) => "gateway reports session did not complete",
            AccessDenied(_) => "access denied",
            Locked(_) => "transceiver is locked and may not make SBD calls",
            GatewayNotResponding(_) => "gateway not responding",
            ConnectionLost(_) => "connection lost",
            LinkFailure(_) => "link failure",
            NoNetwork(_) => "no network service",
            AntennaFault(_) => "antenna fault",
            RadioDisabled(_) => "radio is disabled",
            Busy(_) => "transceiver is busy",
            TryLater(_) => "try later, must wait 3 minutes since last registration",
            ServiceDisabled(_) => "SBD service is temporarily disabled",
            TrafficManagement(_) => "try later, traffic management period",
            BandViolation(_) => "band violation",
            PllLockFailure(_) => "PLL lock failure, hardware error during transmit",
            MailboxError(_) => "error during mailbox check or MT receive",
            ChecksumMismatch(_) => "checksum does not match the message",
            SizeMismatch(_) => "message size does not match the announced length",
            RingAlertReceived => "ring alert received",
            Unknown(_) => "unrecognized status code",
        }
    }
}

impl std::fmt::Display for SbdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} ({code})", self.description()),
            None => f.write_str(self.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mo_table_maps_documented_codes() {
        assert_eq!(decode(0), SbdStatus::Success(0));
        assert_eq!(decode(4), SbdStatus::Success(4));
        assert_eq!(decode(5), SbdStatus::Failure(5));
        assert_eq!(decode(9), SbdStatus::UnknownError(9));
        assert_eq!(decode(10), SbdStatus::Timeout(10));
        assert_eq!(decode(12), SbdStatus::ProtocolError(12));
        assert_eq!(decode(13), SbdStatus::SessionIncomplete(13));
        assert_eq!(decode(14), SbdStatus::ProtocolError(14));
        assert_eq!(decode(32), SbdStatus::NoNetwork(32));
        assert_eq!(decode(36), SbdStatus::TryLater(36));
        assert_eq!(decode(65), SbdStatus::PllLockFailure(65));
    }

    #[test]
    fn permanent_statuses_are_never_retryable() {
        for code in 0..=70 {
            let status = decode(code);
            assert!(!(status.is_permanent() && status.is_retryable()), "code {code}");
        }
        assert!(decode(15).is_permanent());
        assert!(decode(16).is_permanent());
        assert!(!decode(32).is_permanent());
        assert!(!decode(5).is_permanent());
    }

    #[test]
    fn reserved_and_out_of_range_codes_are_unknown() {
        for code in (20..=31).chain(39..=63).chain([66, 255, 1000, u16::MAX]) {
            assert_eq!(decode(code), SbdStatus::Unknown(code), "code {code}");
        }
    }

    #[test]
    fn decode_is_total_and_preserves_code() {
        for code in 0..=u16::MAX {
            let status = decode(code);
            assert_eq!(status.code(), Some(code));
            assert_eq!(decode(code), status);
        }
    }

    #[test]
    fn tables_disagree_on_small_codes() {
        assert_eq!(decode(1), SbdStatus::Success(1));
        assert_eq!(decode_mt(1), SbdStatus::Success(1));
        assert_eq!(decode_write(1), SbdStatus::Timeout(1));
        assert_eq!(decode_clear(1), SbdStatus::Failure(1));

        assert_eq!(decode_mt(0), SbdStatus::Ok(0));
        assert_eq!(decode_mt(2), SbdStatus::MailboxError(2));
        assert_eq!(decode_write(2), SbdStatus::ChecksumMismatch(2));
        assert_eq!(decode_write(3), SbdStatus::SizeMismatch(3));
        assert_eq!(decode_clear(7), SbdStatus::Unknown(7));
    }

    #[test]
    fn ring_alert_has_no_code() {
        assert_eq!(decode_unsolicited("SBDRING"), Some(SbdStatus::RingAlertReceived));
        assert_eq!(decode_unsolicited(" SBDRING "), Some(SbdStatus::RingAlertReceived));
        assert_eq!(decode_unsolicited("+SBDIX: 0"), None);
        assert_eq!(SbdStatus::RingAlertReceived.code(), None);
    }

    #[test]
    fn retryable_set() {
        for code in [10, 13, 17, 18, 19, 32, 35, 38] {
            assert!(decode(code).is_retryable(), "code {code}");
        }
        for code in [0, 5, 11, 15, 16, 33, 34, 36, 37, 64, 65, 99] {
            assert!(!decode(code).is_retryable(), "code {code}");
        }
        assert!(SbdStatus::RingAlertReceived.is_retryable());
    }

    #[test]
    fn success_set() {
        assert!((0..=4).all(|c| decode(c).is_success()));
        assert!(!(5..=65).any(|c| decode(c).is_success()));
        assert!(decode_mt(0).is_success());
        assert!(!decode_mt(2).is_success());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(decode(32).to_string(), "no network service (32)");
        assert_eq!(SbdStatus::RingAlertReceived.to_string(), "ring alert received");
    }

    #[test]
    fn serializes_with_tag_and_code() {
        let json = serde_json::to_value(decode(35)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "busy", "code": 35}));
    }
}
