use std::time::Duration;

use bytes::Bytes;
use sbdlink_transport::ByteStream;
use tracing::warn;

use crate::codec::{classify, Terminal};
use crate::error::{AtError, Result};
use crate::line::{Deadline, LineTransport};

/// Default budget for a single AT exchange.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-exchange settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Budget for the whole exchange, from writing the command to the
    /// terminal line.
    pub timeout: Duration,
    /// Whether the modem echoes commands (`ATE1`, the factory setting).
    pub expect_echo: bool,
}

impl ExchangeConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            expect_echo: true,
        }
    }
}

/// Lines collected between the echo and the terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    pub body: Vec<String>,
    pub terminal: Terminal,
}

impl CommandResult {
    pub fn new(command: &str, body: Vec<String>, terminal: Terminal) -> Self {
        Self {
            command: command.to_string(),
            body,
            terminal,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.terminal == Terminal::Ok
    }

    pub fn is_timeout(&self) -> bool {
        self.terminal == Terminal::Timeout
    }

    /// The numeric code of an `ERROR` terminal.
    pub fn error_code(&self) -> Option<u16> {
        match self.terminal {
            Terminal::Error(code) => Some(code),
            _ => None,
        }
    }

    /// First body line, if any.
    pub fn first_line(&self) -> Option<&str> {
        self.body.first().map(String::as_str)
    }

    /// The remainder of the first body line starting with `prefix`, trimmed.
    pub fn value_after(&self, prefix: &str) -> Option<&str> {
        self.body
            .iter()
            .find_map(|line| line.strip_prefix(prefix))
            .map(str::trim)
    }
}

/// One step of an in-progress exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Line(String),
    Terminal(Terminal),
}

/// Runs AT exchanges over a [`LineTransport`].
///
/// Only one exchange is ever in flight. If an exchange ends any way other
/// than with a terminal line (timeout, echo mismatch, I/O failure), the
/// channel refuses further commands with [`AtError::Desynchronized`] until
/// [`CommandChannel::clear_buffer`] is called, so stale output cannot be
/// mistaken for the next command's response.
pub struct CommandChannel<S> {
    transport: LineTransport<S>,
    desynchronized: bool,
}

impl<S: ByteStream> CommandChannel<S> {
    pub fn new(stream: S) -> Self {
        Self::with_transport(LineTransport::new(stream))
    }

    pub fn with_transport(transport: LineTransport<S>) -> Self {
        Self {
            transport,
            desynchronized: false,
        }
    }

    /// Send `command` and collect its response.
    ///
    /// A missing echo or terminal line is not an error: the result comes back
    /// with [`Terminal::Timeout`] and whatever body lines arrived.
    pub fn execute(&mut self, command: &str, config: &ExchangeConfig) -> Result<CommandResult> {
        let deadline = match self.start(command, config) {
            Ok(deadline) => deadline,
            Err(AtError::Timeout(budget)) => {
                warn!(command, ?budget, "no echo from modem");
                return Ok(CommandResult::new(command, Vec::new(), Terminal::Timeout));
            }
            Err(err) => return Err(err),
        };
        self.finish(command, &deadline)
    }

    /// Write `command` and consume its echo. The returned deadline covers
    /// the rest of the exchange.
    pub fn start(&mut self, command: &str, config: &ExchangeConfig) -> Result<Deadline> {
        if self.desynchronized {
            return Err(AtError::Desynchronized);
        }

        let deadline = Deadline::after(config.timeout);
        self.desynchronized = true;
        self.transport.write_line(command)?;

        if config.expect_echo {
            let echo = self.transport.read_line_until(&deadline)?;
            if echo != command.trim() {
                warn!(command, echo = %echo, "echo mismatch");
                return Err(AtError::Protocol(format!(
                    "echo mismatch: sent {command:?}, received {echo:?}"
                )));
            }
        }

        Ok(deadline)
    }

    /// Read the next non-blank line of the current exchange.
    pub fn next_reply(&mut self, deadline: &Deadline) -> Result<Reply> {
        let line = self.transport.read_line_until(deadline)?;
        match classify(&line) {
            Some(terminal) => {
                self.desynchronized = false;
                Ok(Reply::Terminal(terminal))
            }
            None => Ok(Reply::Line(line)),
        }
    }

    /// Collect body lines until the terminal line or the deadline.
    pub fn finish(&mut self, command: &str, deadline: &Deadline) -> Result<CommandResult> {
        let mut body = Vec::new();
        loop {
            match self.next_reply(deadline) {
                Ok(Reply::Line(line)) => body.push(line),
                Ok(Reply::Terminal(terminal)) => {
                    return Ok(CommandResult::new(command, body, terminal));
                }
                Err(AtError::Timeout(budget)) => {
                    warn!(command, ?budget, lines = body.len(), "no terminal response");
                    return Ok(CommandResult::new(command, body, Terminal::Timeout));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Write raw bytes mid-exchange (binary uploads).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.write_raw(bytes)
    }

    /// Read a raw block mid-exchange (binary downloads).
    pub fn read_exact(&mut self, len: usize, deadline: &Deadline) -> Result<Bytes> {
        self.transport.read_exact(len, deadline)
    }

    /// Skip line terminators ahead of a raw block.
    pub fn skip_terminators(&mut self, deadline: &Deadline) -> Result<()> {
        self.transport.skip_terminators(deadline)
    }

    /// Skip an unsolicited `text` line ahead of a raw block.
    pub fn skip_line(&mut self, text: &str, deadline: &Deadline) -> Result<bool> {
        self.transport.skip_line(text, deadline)
    }

    /// Abandon the current exchange; the next command needs a buffer clear.
    pub fn abandon(&mut self) {
        self.desynchronized = true;
    }

    /// Discard pending input and accept commands again.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.transport.clear_buffer()?;
        self.desynchronized = false;
        Ok(())
    }

    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    pub fn transport(&self) -> &LineTransport<S> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut LineTransport<S> {
        &mut self.transport
    }

    pub fn into_inner(self) -> S {
        self.transport.into_inner()
    }
}

impl<S: ByteStream> std::fmt::Debug for CommandChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("transport", &self.transport)
            .field("desynchronized", &self.desynchronized)
            .finish()
    }
}
