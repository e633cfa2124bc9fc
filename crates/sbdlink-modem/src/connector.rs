use sbdlink_transport::{ByteStream, SerialStream};

use crate::config::ModemConfig;
use crate::error::Result;
use crate::modem::Modem;

/// Opens the byte stream a [`Modem`] talks over.
pub trait Opener {
    type Stream: ByteStream;

    fn open(&self, address: &str, config: &ModemConfig) -> Result<Self::Stream>;
}

/// Opens serial devices with the configured baud rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl Opener for SerialOpener {
    type Stream = SerialStream;

    fn open(&self, address: &str, config: &ModemConfig) -> Result<SerialStream> {
        Ok(SerialStream::open(
            address,
            config.baud_rate,
            config.command_timeout,
        )?)
    }
}

/// Connect to a modem on a serial device with default settings.
pub fn connect(address: &str) -> Result<Modem> {
    connect_with_config(address, ModemConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(address: &str, config: ModemConfig) -> Result<Modem> {
    let mut modem = Modem::new(config);
    modem.connect(address)?;
    Ok(modem)
}
