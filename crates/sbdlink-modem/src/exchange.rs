//! Command helpers shared by [`Modem`](crate::Modem) and
//! [`SessionManager`](crate::SessionManager).

use sbdlink_at::{AtError, CommandChannel, CommandResult, ExchangeConfig, Terminal};
use sbdlink_transport::ByteStream;
use tracing::{info, warn};

use crate::command::AtCommand;
use crate::error::{ModemError, Result};
use crate::status::decode_unsolicited;

/// Run `command` and require an `OK` terminal.
///
/// Queries whose echo comes back garbled are re-issued once after a buffer
/// clear; anything that changes device state is never re-sent.
pub(crate) fn run<S: ByteStream>(
    channel: &mut CommandChannel<S>,
    command: &AtCommand,
    exchange: &ExchangeConfig,
) -> Result<CommandResult> {
    let line = command.line();
    let mut result = if command.is_query() {
        execute_query(channel, &line, exchange)?
    } else {
        channel.execute(&line, exchange)?
    };
    strip_ring_alerts(&mut result.body);
    check(result, exchange)
}

/// Map the terminal line onto the error taxonomy.
pub(crate) fn check(result: CommandResult, exchange: &ExchangeConfig) -> Result<CommandResult> {
    match result.terminal {
        Terminal::Ok => Ok(result),
        Terminal::Error(code) => Err(ModemError::CommandError {
            command: result.command,
            code,
        }),
        Terminal::Timeout => Err(ModemError::Timeout(exchange.timeout)),
    }
}

/// The body line the command's [`Grammar`](crate::Grammar) says carries its data.
///
/// Prefixed grammars select the first line with the prefix; the others take
/// the first body line.
pub(crate) fn response_line<'r>(command: &AtCommand, result: &'r CommandResult) -> Result<&'r str> {
    let grammar = command.grammar();
    if !grammar.has_line() {
        return Err(ModemError::Protocol(format!(
            "{} has no response line",
            result.command
        )));
    }

    match grammar.prefix() {
        Some(prefix) => result
            .body
            .iter()
            .find(|line| line.starts_with(prefix))
            .map(String::as_str)
            .ok_or_else(|| {
                ModemError::Protocol(format!(
                    "{} response missing {prefix:?} line",
                    result.command
                ))
            }),
        None => result
            .first_line()
            .ok_or_else(|| ModemError::Protocol(format!("{} returned no data", result.command))),
    }
}

/// [`response_line`] with any grammar prefix removed, trimmed.
pub(crate) fn response_value<'r>(command: &AtCommand, result: &'r CommandResult) -> Result<&'r str> {
    let line = response_line(command, result)?;
    let value = match command.grammar().prefix() {
        Some(prefix) => line.strip_prefix(prefix).unwrap_or(line),
        None => line,
    };
    Ok(value.trim())
}

/// Remove `SBDRING` lines from a response body. Returns whether any were seen.
pub(crate) fn strip_ring_alerts(body: &mut Vec<String>) -> bool {
    let before = body.len();
    body.retain(|line| decode_unsolicited(line).is_none());
    let seen = body.len() != before;
    if seen {
        info!("ring alert: mobile-terminated message waiting at the gateway");
    }
    seen
}

fn execute_query<S: ByteStream>(
    channel: &mut CommandChannel<S>,
    line: &str,
    exchange: &ExchangeConfig,
) -> Result<CommandResult> {
    match channel.execute(line, exchange) {
        Err(AtError::Protocol(reason)) => {
            warn!(command = line, %reason, "re-issuing query after echo mismatch");
            channel.clear_buffer()?;
            Ok(channel.execute(line, exchange)?)
        }
        other => Ok(other?),
    }
}
