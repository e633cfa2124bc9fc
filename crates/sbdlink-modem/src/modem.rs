use chrono::{DateTime, Utc};
use sbdlink_at::CommandChannel;
use sbdlink_transport::{ByteStream, SerialStream};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::{AtCommand, BufferClear};
use crate::config::ModemConfig;
use crate::connector::{Opener, SerialOpener};
use crate::error::{ModemError, Result};
use crate::exchange::{response_value, run};
use crate::response::{
    parse_energy, parse_identity, parse_network_time, parse_signal, BufferStatus, SessionResponse,
};
use crate::session::SessionManager;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the driver knows about the device beyond what it reports on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    connection: ConnectionState,
    energy_used: u32,
    #[serde(skip)]
    buffer: Vec<u8>,
    radio_active: bool,
    inbound_pending: bool,
    inbound_length: u16,
    imei: Option<String>,
    model: Option<String>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            energy_used: 0,
            buffer: Vec::new(),
            radio_active: true,
            inbound_pending: false,
            inbound_length: 0,
            imei: None,
            model: None,
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Last energy counter value acknowledged by the device.
    pub fn energy_used(&self) -> u32 {
        self.energy_used
    }

    /// Outbound payload the device accepted and has not yet delivered.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn radio_active(&self) -> bool {
        self.radio_active
    }

    pub fn inbound_pending(&self) -> bool {
        self.inbound_pending
    }

    /// Length of the pending inbound message, 0 when unknown.
    pub fn inbound_length(&self) -> u16 {
        self.inbound_length
    }

    pub fn imei(&self) -> Option<&str> {
        self.imei.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub(crate) fn stage(&mut self, payload: &[u8]) {
        self.buffer = payload.to_vec();
    }

    pub(crate) fn record_session(&mut self, response: &SessionResponse) {
        if response.mo_success() {
            self.buffer.clear();
        }
        if response.has_inbound() {
            self.inbound_pending = true;
            self.inbound_length = response.mt_length;
        }
    }

    pub(crate) fn record_buffer_status(&mut self, status: &BufferStatus) {
        self.inbound_pending = status.mt_buffered;
        if !status.mt_buffered {
            self.inbound_length = 0;
        }
    }

    pub(crate) fn clear_local(&mut self, which: BufferClear) {
        if which.clears_mo() {
            self.buffer.clear();
        }
        if which.clears_mt() {
            self.inbound_pending = false;
            self.inbound_length = 0;
        }
    }

    fn reset_connection(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.buffer.clear();
        self.inbound_pending = false;
        self.inbound_length = 0;
        self.imei = None;
        self.model = None;
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection to one SBD modem.
///
/// Owns the command channel for as long as the connection is open and the
/// [`DeviceState`] for as long as the value lives. Every exchange takes
/// `&mut self`; wrap the modem in a `Mutex` to share it between threads.
pub struct Modem<S: ByteStream = SerialStream> {
    config: ModemConfig,
    address: Option<String>,
    channel: Option<CommandChannel<S>>,
    state: DeviceState,
}

impl Modem<SerialStream> {
    /// Open a serial device and probe it.
    pub fn connect(&mut self, address: &str) -> Result<()> {
        self.connect_with(&SerialOpener, address)
    }
}

impl<S: ByteStream> Modem<S> {
    /// A disconnected modem.
    pub fn new(config: ModemConfig) -> Self {
        Self {
            config,
            address: None,
            channel: None,
            state: DeviceState::new(),
        }
    }

    /// Open `address` through `opener` and probe it with `AT`.
    ///
    /// An existing connection is closed first. On failure the modem is left
    /// disconnected.
    pub fn connect_with<O>(&mut self, opener: &O, address: &str) -> Result<()>
    where
        O: Opener<Stream = S>,
    {
        self.disconnect();
        self.state.connection = ConnectionState::Connecting;

        let stream = match opener.open(address, &self.config) {
            Ok(stream) => stream,
            Err(err) => {
                self.state.connection = ConnectionState::Disconnected;
                return Err(ModemError::Connect {
                    address: address.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        let mut channel = CommandChannel::new(stream);
        let attempts = self.config.probe_attempts.max(1);
        let exchange = self.config.command_exchange();
        let mut last_error = None;

        for attempt in 1..=attempts {
            if let Err(err) = channel.clear_buffer() {
                last_error = Some(ModemError::from(err));
                break;
            }
            match run(&mut channel, &AtCommand::Attention, &exchange) {
                Ok(_) => {
                    info!(address, attempt, "modem connected");
                    self.channel = Some(channel);
                    self.address = Some(address.to_string());
                    self.state.connection = ConnectionState::Connected;
                    return Ok(());
                }
                Err(err) => {
                    warn!(address, attempt, error = %err, "liveness probe failed");
                    last_error = Some(err);
                }
            }
        }

        self.state.connection = ConnectionState::Disconnected;
        let reason = match last_error {
            Some(err) => format!("no answer to AT after {attempts} attempt(s): {err}"),
            None => format!("no answer to AT after {attempts} attempt(s)"),
        };
        Err(ModemError::Connect {
            address: address.to_string(),
            reason,
        })
    }

    /// Close the connection. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.channel.take().is_some() {
            info!(address = self.address.as_deref().unwrap_or(""), "modem disconnected");
        }
        self.address = None;
        self.state.reset_connection();
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Address of the open connection.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Description of the open stream, such as `serial:/dev/ttyUSB0@19200`.
    pub fn transport_description(&self) -> Option<String> {
        self.channel
            .as_ref()
            .map(|channel| channel.transport().get_ref().describe())
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Resynchronize, then probe with `AT`.
    pub fn check_serial_connection(&mut self) -> bool {
        let exchange = self.config.command_exchange();
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        if let Err(err) = channel.clear_buffer() {
            warn!(error = %err, "could not clear modem input");
            return false;
        }
        match run(channel, &AtCommand::Attention, &exchange) {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "serial connection check failed");
                false
            }
        }
    }

    /// Discard pending modem output and accept commands again after a
    /// timeout or echo mismatch.
    pub fn clear_buffer(&mut self) -> Result<()> {
        Ok(self.channel_mut()?.clear_buffer()?)
    }

    /// Signal strength in bars, 0-5.
    pub fn signal_quality(&mut self) -> Result<u8> {
        let exchange = self.config.command_exchange();
        let command = AtCommand::SignalQuality;
        let result = run(self.channel_mut()?, &command, &exchange)?;
        parse_signal(response_value(&command, &result)?)
    }

    /// Serial number, cached after the first successful query.
    pub fn imei(&mut self) -> Result<String> {
        if let Some(imei) = &self.state.imei {
            return Ok(imei.clone());
        }
        let exchange = self.config.command_exchange();
        let command = AtCommand::Imei;
        let result = run(self.channel_mut()?, &command, &exchange)?;
        let imei = parse_identity(response_value(&command, &result)?)?;
        self.state.imei = Some(imei.clone());
        Ok(imei)
    }

    /// Model name, cached after the first successful query.
    pub fn model(&mut self) -> Result<String> {
        if let Some(model) = &self.state.model {
            return Ok(model.clone());
        }
        let exchange = self.config.command_exchange();
        let command = AtCommand::Model;
        let result = run(self.channel_mut()?, &command, &exchange)?;
        let model = parse_identity(response_value(&command, &result)?)?;
        self.state.model = Some(model.clone());
        Ok(model)
    }

    /// Iridium network time.
    ///
    /// While the modem reports no network service the query is repeated per
    /// the configured network retry policy, then [`ModemError::NoNetwork`].
    pub fn network_time(&mut self) -> Result<DateTime<Utc>> {
        let exchange = self.config.command_exchange();
        let policy = self.config.network_retry;
        let attempts = policy.attempts();
        let command = AtCommand::NetworkTime;

        for attempt in 1..=attempts {
            let result = run(self.channel_mut()?, &command, &exchange)?;
            if let Some(time) = parse_network_time(response_value(&command, &result)?)? {
                return Ok(time);
            }
            warn!(attempt, attempts, "no network service for system time");
            if attempt < attempts {
                std::thread::sleep(policy.backoff);
            }
        }

        Err(ModemError::NoNetwork)
    }

    /// Read the device energy counter (microamp-hours).
    pub fn get_energy_used(&mut self) -> Result<u32> {
        let exchange = self.config.command_exchange();
        let command = AtCommand::QueryEnergy;
        let result = run(self.channel_mut()?, &command, &exchange)?;
        let energy = parse_energy(response_value(&command, &result)?)?;
        self.state.energy_used = energy;
        Ok(energy)
    }

    /// Set (usually reset) the device energy counter.
    pub fn set_energy_used(&mut self, energy: u32) -> Result<()> {
        let exchange = self.config.command_exchange();
        run(self.channel_mut()?, &AtCommand::SetEnergy(energy), &exchange)?;
        self.state.energy_used = energy;
        Ok(())
    }

    /// Turn the radio on or off.
    pub fn set_radio_activity(&mut self, enabled: bool) -> Result<()> {
        let exchange = self.config.command_exchange();
        run(self.channel_mut()?, &AtCommand::Radio(enabled), &exchange)?;
        self.state.radio_active = enabled;
        info!(enabled, "radio activity set");
        Ok(())
    }

    /// Borrow a session manager over the open connection.
    pub fn session(&mut self) -> Result<SessionManager<'_, S>> {
        let channel = self.channel.as_mut().ok_or(ModemError::NotConnected)?;
        Ok(SessionManager::new(channel, &mut self.state, &self.config))
    }

    fn channel_mut(&mut self) -> Result<&mut CommandChannel<S>> {
        self.channel.as_mut().ok_or(ModemError::NotConnected)
    }
}

impl<S: ByteStream> std::fmt::Debug for Modem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("address", &self.address)
            .field("state", &self.state)
            .finish()
    }
}
