use std::time::Duration;

/// Errors that can occur while exchanging AT lines with the modem.
#[derive(Debug, thiserror::Error)]
pub enum AtError {
    /// The underlying stream could not be configured.
    #[error("transport error: {0}")]
    Transport(#[from] sbdlink_transport::TransportError),

    /// An I/O error occurred while reading or writing lines.
    #[error("line I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reported end-of-file.
    #[error("connection closed")]
    ConnectionClosed,

    /// No complete line arrived within the budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The modem produced something the exchange did not expect.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A previous exchange failed part-way; the buffer must be cleared first.
    #[error("channel desynchronized (clear the buffer before the next command)")]
    Desynchronized,

    /// Bytes kept arriving without a line terminator.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },
}

impl AtError {
    /// True for the deadline-expired case.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AtError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, AtError>;
