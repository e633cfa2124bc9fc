//! Driver for Iridium short-burst-data modems (RockBLOCK, 9602/9603).
//!
//! A [`Modem`] owns one serial connection and the [`DeviceState`] tracked
//! alongside it. Device queries live on the modem; message queueing and
//! satellite sessions go through the [`SessionManager`] it lends out:
//!
//! ```no_run
//! use sbdlink_modem::{connect, BufferClear};
//!
//! let mut modem = connect("/dev/ttyUSB0")?;
//! println!("signal: {}/5", modem.signal_quality()?);
//!
//! let mut session = modem.session()?;
//! let response = session.send_text("HELLO")?;
//! if response.has_inbound() {
//!     println!("received {:?}", session.read_bytes()?);
//!     session.clear_buffers(BufferClear::Mt)?;
//! }
//! # Ok::<(), sbdlink_modem::ModemError>(())
//! ```

pub mod command;
pub mod config;
pub mod connector;
pub mod error;
mod exchange;
pub mod modem;
pub mod response;
pub mod session;
pub mod status;
pub mod testing;

pub use command::{AtCommand, BufferClear, Grammar};
pub use config::{ModemConfig, RetryPolicy, MAX_MO_LEN, MAX_MT_LEN, MAX_TEXT_LEN};
pub use connector::{connect, connect_with_config, Opener, SerialOpener};
pub use error::{ModemError, Result};
pub use modem::{ConnectionState, DeviceState, Modem};
pub use response::{BufferStatus, SessionResponse};
pub use session::SessionManager;
pub use status::{decode, decode_clear, decode_mt, decode_unsolicited, decode_write, SbdStatus};
