use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A blocking, half-duplex byte stream to a modem.
///
/// Reads block for at most the configured read timeout and then fail with
/// `ErrorKind::TimedOut` (or `WouldBlock`). Closing is done by dropping the
/// stream.
pub trait ByteStream: Read + Write {
    /// Set the timeout applied to each subsequent blocking read.
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard any input received by the device driver but not yet read.
    fn discard_input(&mut self) -> Result<()>;

    /// Short description used in logs.
    fn describe(&self) -> String {
        "byte-stream".to_string()
    }
}

impl<T: ByteStream + ?Sized> ByteStream for Box<T> {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::ErrorKind;

    use super::*;

    #[derive(Default)]
    struct QueueStream {
        input: VecDeque<u8>,
        written: Vec<u8>,
        timeout: Option<Duration>,
    }

    impl Read for QueueStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.input.is_empty() {
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            let n = buf.len().min(self.input.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.input.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for QueueStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl ByteStream for QueueStream {
        fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.timeout = Some(timeout);
            Ok(())
        }

        fn discard_input(&mut self) -> Result<()> {
            self.input.clear();
            Ok(())
        }
    }

    #[test]
    fn boxed_stream_forwards_calls() {
        let mut stream: Box<dyn ByteStream> = Box::new(QueueStream {
            input: VecDeque::from(b"OK\r\n".to_vec()),
            ..QueueStream::default()
        });

        stream.set_read_timeout(Duration::from_millis(25)).unwrap();
        stream.write_all(b"AT\r").unwrap();
        stream.discard_input().unwrap();

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert_eq!(stream.describe(), "byte-stream");
    }
}
