use std::time::Duration;

use sbdlink_at::AtError;
use sbdlink_transport::TransportError;

use crate::status::decode;

/// Errors that can occur in modem operations.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// The serial link failed or was closed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The modem did not answer within the budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The modem answered with something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A previous exchange was abandoned; call `clear_buffer` first.
    #[error("command channel desynchronized (clear the buffer first)")]
    Desynchronized,

    /// The command ended with `ERROR`.
    #[error("{command} returned ERROR:{code} ({})", describe_code(.code))]
    CommandError { command: String, code: u16 },

    /// The payload exceeds what the device accepts.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload cannot be sent with the requested command.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The device refused to stage the outbound message.
    #[error("device rejected the message (code {code})")]
    QueueRejected { code: u16 },

    /// The satellite session did not complete, or its outcome is ambiguous.
    #[error("session failed: {0}")]
    SessionFailed(String),

    /// No mobile-terminated message is known to be waiting.
    #[error("no inbound message pending")]
    NoInboundData,

    /// Inbound data is not valid UTF-8.
    #[error("inbound message is not UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// The device could not be opened or did not answer the liveness probe.
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The modem reports no network service.
    #[error("no network service")]
    NoNetwork,

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,
}

fn describe_code(code: &u16) -> &'static str {
    decode(*code).description()
}

impl ModemError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModemError::Timeout(_))
    }
}

impl From<AtError> for ModemError {
    fn from(err: AtError) -> Self {
        match err {
            AtError::Transport(err) => ModemError::Transport(err),
            AtError::Io(io) => ModemError::Transport(TransportError::Io(io)),
            AtError::ConnectionClosed => ModemError::Transport(TransportError::Closed),
            AtError::Timeout(budget) => ModemError::Timeout(budget),
            AtError::Protocol(msg) => ModemError::Protocol(msg),
            AtError::Desynchronized => ModemError::Desynchronized,
            AtError::LineTooLong { size, max } => {
                ModemError::Protocol(format!("line too long ({size} bytes, max {max})"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_errors_map_onto_modem_taxonomy() {
        let err: ModemError = AtError::Timeout(Duration::from_secs(5)).into();
        assert!(err.is_timeout());

        let err: ModemError = AtError::ConnectionClosed.into();
        assert!(matches!(err, ModemError::Transport(TransportError::Closed)));

        let err: ModemError = AtError::LineTooLong { size: 4000, max: 2048 }.into();
        assert!(matches!(err, ModemError::Protocol(_)));

        let err: ModemError = AtError::Desynchronized.into();
        assert!(matches!(err, ModemError::Desynchronized));
    }

    #[test]
    fn command_error_message_describes_code() {
        let err = ModemError::CommandError {
            command: "AT+SBDIX".to_string(),
            code: 32,
        };
        assert_eq!(
            err.to_string(),
            "AT+SBDIX returned ERROR:32 (no network service)"
        );
    }
}
