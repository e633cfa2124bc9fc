use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteStream;

/// Serial port transport.
///
/// Opens the device 8N1 with no flow control, which is what the RockBLOCK and
/// bare Iridium 9602/9603 boards expect on their host UART.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialStream {
    /// Factory default baud rate of the SBD transceivers.
    pub const DEFAULT_BAUD_RATE: u32 = 19_200;

    /// Open a serial device (blocking reads bounded by `timeout`).
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source,
            })?;

        info!(path, baud_rate, "opened serial port");

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// The device path this stream was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Baud rate currently configured on the port.
    pub fn baud_rate(&self) -> Result<u32> {
        self.port.baud_rate().map_err(TransportError::Configure)
    }
}

fn port_label(path: &str, baud_rate: Option<u32>) -> String {
    match baud_rate {
        Some(baud) => format!("serial:{path}@{baud}"),
        None => format!("serial:{path}"),
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl ByteStream for SerialStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(TransportError::Configure)
    }

    fn discard_input(&mut self) -> Result<()> {
        debug!(path = %self.path, "discarding serial input buffer");
        self.port
            .clear(ClearBuffer::Input)
            .map_err(TransportError::Configure)
    }

    fn describe(&self) -> String {
        port_label(&self.path, self.baud_rate().ok())
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .finish()
    }
}
