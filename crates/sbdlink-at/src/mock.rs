use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use sbdlink_transport::ByteStream;

/// Pre-loaded modem output; idle reads time out, or hit EOF once `closed`.
#[derive(Debug, Default)]
pub(crate) struct MockStream {
    pub input: VecDeque<u8>,
    pub written: Vec<u8>,
    pub closed: bool,
    pub chunk: Option<usize>,
    pub discards: usize,
    read_timeout: Duration,
}

impl MockStream {
    pub fn with_input(bytes: &[u8]) -> Self {
        Self {
            input: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.input.is_empty() {
            if self.closed {
                return Ok(0);
            }
            std::thread::sleep(self.read_timeout.min(Duration::from_millis(5)));
            return Err(ErrorKind::TimedOut.into());
        }

        let limit = self.chunk.unwrap_or(buf.len()).min(buf.len());
        let mut n = 0;
        while n < limit {
            match self.input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ByteStream for MockStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> sbdlink_transport::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn discard_input(&mut self) -> sbdlink_transport::Result<()> {
        self.input.clear();
        self.discards += 1;
        Ok(())
    }
}
