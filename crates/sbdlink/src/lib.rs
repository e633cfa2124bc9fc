//! Driver for Iridium short-burst-data modems.
//!
//! sbdlink talks to RockBLOCK and bare 9602/9603 transceivers over their
//! serial AT interface: queueing outbound messages, running satellite
//! sessions, reading inbound messages and reporting device status.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte stream boundary and the serial port implementation
//! - [`at`]: AT command framing, echo handling and response collection
//! - [`modem`]: sessions, status decoding and device state (behind the
//!   `modem` feature, on by default)

/// Re-export transport types.
pub mod transport {
    pub use sbdlink_transport::*;
}

/// Re-export AT framing types.
pub mod at {
    pub use sbdlink_at::*;
}

/// Re-export modem types (requires `modem` feature).
#[cfg(feature = "modem")]
pub mod modem {
    pub use sbdlink_modem::*;
}
