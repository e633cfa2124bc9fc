//! AT command framing for SBD modems.
//!
//! This is the protocol engine of sbdlink. Every exchange follows the same
//! discipline:
//! - the command line is written with a `\r` terminator
//! - the modem's echo of that line is consumed and checked
//! - response lines are collected until `OK`, `ERROR[:<code>]`, or the
//!   exchange deadline
//!
//! A timed-out or mismatched exchange leaves the channel desynchronized
//! until the buffer is cleared.

pub mod channel;
pub mod codec;
pub mod error;
pub mod line;

#[cfg(test)]
mod mock;

pub use channel::{CommandChannel, CommandResult, ExchangeConfig, Reply, DEFAULT_COMMAND_TIMEOUT};
pub use codec::{classify, decode_line, encode_command, Terminal, MAX_LINE_LENGTH, TERMINATOR};
pub use error::{AtError, Result};
pub use line::{Deadline, LineTransport};
