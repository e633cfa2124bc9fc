use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use sbdlink_transport::ByteStream;
use tracing::{debug, trace};

use crate::codec::{decode_line, encode_command, skip_line_terminators, MAX_LINE_LENGTH};
use crate::error::{AtError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 512;

/// Shortest per-read timeout handed to the stream.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Fallback horizon when `now + budget` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Point in time after which a read gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(budget)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self { at, budget }
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }

    /// The total budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

/// Line-oriented reader/writer over a modem byte stream.
///
/// Bytes read past the end of a line stay buffered for the next call, so
/// callers always see complete lines (or exact-length binary blocks).
pub struct LineTransport<S> {
    inner: S,
    buf: BytesMut,
    out: BytesMut,
    max_line_length: usize,
}

impl<S: ByteStream> LineTransport<S> {
    /// Wrap a stream with the default line length limit.
    pub fn new(inner: S) -> Self {
        Self::with_max_line_length(inner, MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(inner: S, max_line_length: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            out: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_line_length,
        }
    }

    /// Write `text` followed by `\r`.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        debug!("<- {text}");
        let mut out = std::mem::take(&mut self.out);
        out.clear();
        encode_command(text, &mut out);
        let result = self.write_all(&out);
        self.out = out;
        result
    }

    /// Write bytes exactly as given.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        debug!(len = bytes.len(), "<- (binary)");
        self.write_all(bytes)
    }

    /// Next non-blank line, trimmed, waiting at most `timeout`.
    pub fn read_next(&mut self, timeout: Duration) -> Result<String> {
        self.read_line_until(&Deadline::after(timeout))
    }

    /// Next non-blank line, trimmed, waiting until `deadline`.
    pub fn read_line_until(&mut self, deadline: &Deadline) -> Result<String> {
        loop {
            while let Some(line) = decode_line(&mut self.buf, self.max_line_length)? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("-> {line}");
                return Ok(line.to_string());
            }
            self.fill(deadline)?;
        }
    }

    /// Exactly `len` raw bytes, waiting until `deadline`.
    pub fn read_exact(&mut self, len: usize, deadline: &Deadline) -> Result<Bytes> {
        while self.buf.len() < len {
            self.fill(deadline)?;
        }
        debug!(len, "-> (binary)");
        Ok(self.buf.split_to(len).freeze())
    }

    /// Consume line terminators ahead of a binary block.
    ///
    /// Returns once a non-terminator byte is buffered.
    pub fn skip_terminators(&mut self, deadline: &Deadline) -> Result<()> {
        loop {
            let skipped = skip_line_terminators(&mut self.buf);
            if skipped > 0 {
                trace!(skipped, "skipped line terminators");
            }
            if !self.buf.is_empty() {
                return Ok(());
            }
            self.fill(deadline)?;
        }
    }

    /// Consume `text` and its terminator if that line is next in the input.
    ///
    /// Leading terminators are skipped first. Nothing else is consumed when
    /// the next bytes differ, so a binary block can follow.
    pub fn skip_line(&mut self, text: &str, deadline: &Deadline) -> Result<bool> {
        let expected = text.as_bytes();
        loop {
            self.skip_terminators(deadline)?;
            let n = self.buf.len().min(expected.len());
            if self.buf[..n] != expected[..n] {
                return Ok(false);
            }
            if self.buf.len() > expected.len() {
                if !matches!(self.buf[expected.len()], b'\r' | b'\n') {
                    return Ok(false);
                }
                let _ = self.buf.split_to(expected.len());
                debug!("-> {text}");
                return Ok(true);
            }
            self.fill(deadline)?;
        }
    }

    /// Drop buffered bytes and anything pending in the device driver.
    pub fn clear_buffer(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            debug!(dropped = self.buf.len(), "discarding buffered modem output");
        }
        self.buf.clear();
        self.inner.discard_input()?;
        Ok(())
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn fill(&mut self, deadline: &Deadline) -> Result<()> {
        loop {
            let remaining = deadline
                .remaining()
                .ok_or(AtError::Timeout(deadline.budget()))?;
            self.inner
                .set_read_timeout(remaining.max(MIN_READ_TIMEOUT))?;

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(AtError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    continue
                }
                Err(err) => return Err(AtError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(AtError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(AtError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(AtError::Io(err)),
            }
        }
    }
}

impl<S: ByteStream> std::fmt::Debug for LineTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTransport")
            .field("stream", &self.inner.describe())
            .field("buffered", &self.buf.len())
            .finish()
    }
}
