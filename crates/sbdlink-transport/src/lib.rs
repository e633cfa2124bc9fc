//! Byte-stream boundary for satellite SBD modems.
//!
//! The modem is reachable only through a serial command channel. This crate
//! hides the port behind [`ByteStream`]: blocking read/write with a
//! caller-settable read timeout and a way to drop stale input.
//!
//! This is the lowest layer of sbdlink. The AT line protocol in
//! `sbdlink-at` builds on any [`ByteStream`], so tests can substitute an
//! in-memory device for the real [`SerialStream`].

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::SerialStream;
pub use traits::ByteStream;
