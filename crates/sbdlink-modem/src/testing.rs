//! In-memory SBD modem for tests and dry runs.
//!
//! [`SimulatedModem`] implements [`ByteStream`] and answers the command set
//! the driver uses with the same framing as a 9602/9603 transceiver: echoed
//! command lines, `\r\n`-wrapped response lines, `READY` handshakes for binary
//! uploads and checksummed binary downloads. Clones share one device, so a
//! test can keep a handle for scripting and inspection while a [`Modem`]
//! owns another.
//!
//! ```
//! use sbdlink_modem::testing::{SimulatedModem, SimulatedOpener};
//! use sbdlink_modem::{Modem, ModemConfig};
//!
//! let sim = SimulatedModem::new();
//! let mut modem = Modem::new(ModemConfig::default());
//! modem.connect_with(&SimulatedOpener::new(sim.clone()), "/dev/simulated0")?;
//! let response = modem.session()?.send_text("HELLO")?;
//! assert!(response.mo_success());
//! # Ok::<(), sbdlink_modem::ModemError>(())
//! ```
//!
//! [`Modem`]: crate::Modem

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sbdlink_transport::{ByteStream, TransportError};

use crate::command::checksum;
use crate::config::{ModemConfig, MAX_MO_LEN, MAX_TEXT_LEN};
use crate::connector::Opener;
use crate::error::Result;

/// Scripted outcome for the next `AT+SBDIX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScript {
    /// Report this MO status; the attempt consumes a MOMSN.
    Status(u16),
    /// Echo the command and never answer; MOMSN unchanged.
    Hang,
    /// Consume a MOMSN, then never answer.
    HangAfterSend,
    /// Answer `OK` without a `+SBDIX:` line.
    NoResult,
}

#[derive(Debug)]
struct Device {
    output: VecDeque<u8>,
    line: Vec<u8>,
    upload: Option<(usize, Vec<u8>)>,
    echo: bool,
    silent: bool,
    unplugged: bool,
    closed: bool,
    corrupt_next_echo: bool,
    corrupt_next_upload: bool,
    corrupt_next_download: bool,
    ring_next_session: bool,
    ring_next_upload: bool,
    ring_next_download: bool,
    fail_next_clear: bool,
    reject_next: Option<u16>,
    sessions: VecDeque<SessionScript>,
    session_count: usize,
    loopback: bool,
    mo_buffer: Vec<u8>,
    mt_buffer: Vec<u8>,
    gateway: VecDeque<Vec<u8>>,
    momsn: u16,
    mtmsn: Option<u16>,
    signal: u8,
    imei: String,
    model: String,
    network_ticks: Option<u32>,
    network_failures: u32,
    energy: u32,
    radio: bool,
    commands: Vec<String>,
    bytes_written: usize,
}

impl Device {
    fn new() -> Self {
        Self {
            output: VecDeque::new(),
            line: Vec::new(),
            upload: None,
            echo: true,
            silent: false,
            unplugged: false,
            closed: false,
            corrupt_next_echo: false,
            corrupt_next_upload: false,
            corrupt_next_download: false,
            ring_next_session: false,
            ring_next_upload: false,
            ring_next_download: false,
            fail_next_clear: false,
            reject_next: None,
            sessions: VecDeque::new(),
            session_count: 0,
            loopback: false,
            mo_buffer: Vec::new(),
            mt_buffer: Vec::new(),
            gateway: VecDeque::new(),
            momsn: 0,
            mtmsn: None,
            signal: 5,
            imei: SimulatedModem::DEFAULT_IMEI.to_string(),
            model: SimulatedModem::DEFAULT_MODEL.to_string(),
            network_ticks: Some(0x62a7_f6cd),
            network_failures: 0,
            energy: 0,
            radio: true,
            commands: Vec::new(),
            bytes_written: 0,
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.output.extend(bytes.iter().copied());
    }

    fn reply(&mut self, line: &str) {
        self.emit(format!("\r\n{line}\r\n").as_bytes());
    }

    fn ok(&mut self) {
        self.reply("OK");
    }

    fn error(&mut self, code: u16) {
        match code {
            0 => self.reply("ERROR"),
            code => self.reply(&format!("ERROR:{code}")),
        }
    }

    fn receive(&mut self, bytes: &[u8]) {
        self.bytes_written += bytes.len();
        for &byte in bytes {
            if let Some((expected, data)) = self.upload.as_mut() {
                data.push(byte);
                if data.len() == *expected + 2 {
                    let (_, data) = self.upload.take().unwrap_or_default();
                    self.finish_upload(data);
                }
                continue;
            }

            match byte {
                b'\r' => {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    self.command(line.trim());
                }
                b'\n' => {}
                other => self.line.push(other),
            }
        }
    }

    fn command(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        self.commands.push(line.to_string());
        if self.silent {
            return;
        }

        if self.echo {
            if self.corrupt_next_echo {
                self.corrupt_next_echo = false;
                self.emit(format!("{line}#\r").as_bytes());
            } else {
                self.emit(format!("{line}\r").as_bytes());
            }
        }

        if let Some(code) = self.reject_next.take() {
            self.error(code);
            return;
        }

        match line {
            "AT" => self.ok(),
            "ATE0" => {
                self.echo = false;
                self.ok();
            }
            "ATE1" => {
                self.echo = true;
                self.ok();
            }
            "AT+CSQ" => {
                self.reply(&format!("+CSQ:{}", self.signal));
                self.ok();
            }
            "AT+CGSN" => {
                let imei = self.imei.clone();
                self.reply(&imei);
                self.ok();
            }
            "AT+CGMM" => {
                let model = self.model.clone();
                self.reply(&model);
                self.ok();
            }
            "AT-MSSTM" => {
                let ticks = if self.network_failures > 0 {
                    self.network_failures -= 1;
                    None
                } else {
                    self.network_ticks
                };
                match ticks {
                    Some(ticks) => self.reply(&format!("-MSSTM: {ticks:08x}")),
                    None => self.reply("-MSSTM: no network service"),
                }
                self.ok();
            }
            "AT+GEMON" => {
                self.reply(&format!("+GEMON:{}", self.energy));
                self.ok();
            }
            "AT*R0" | "AT*R1" => {
                self.radio = line == "AT*R1";
                self.ok();
            }
            "AT+SBDIX" => self.session(),
            "AT+SBDRB" => self.download(),
            "AT+SBDS" => {
                let mt = self.mtmsn.map_or(-1, i32::from);
                let status = format!(
                    "+SBDS: {}, {}, {}, {}",
                    u8::from(!self.mo_buffer.is_empty()),
                    self.momsn,
                    u8::from(!self.mt_buffer.is_empty()),
                    mt
                );
                self.reply(&status);
                self.ok();
            }
            "AT+SBDD0" | "AT+SBDD1" | "AT+SBDD2" => {
                if self.fail_next_clear {
                    self.fail_next_clear = false;
                    self.reply("1");
                    self.ok();
                    return;
                }
                if line != "AT+SBDD1" {
                    self.mo_buffer.clear();
                }
                if line != "AT+SBDD0" {
                    self.mt_buffer.clear();
                }
                self.reply("0");
                self.ok();
            }
            _ => self.parameterized(line),
        }
    }

    fn parameterized(&mut self, line: &str) {
        if let Some(value) = line.strip_prefix("AT+GEMON=") {
            match value.parse() {
                Ok(energy) => {
                    self.energy = energy;
                    self.ok();
                }
                Err(_) => self.error(0),
            }
        } else if let Some(text) = line.strip_prefix("AT+SBDWT=") {
            if text.len() > MAX_TEXT_LEN {
                self.error(0);
            } else {
                self.mo_buffer = text.as_bytes().to_vec();
                self.ok();
            }
        } else if let Some(len) = line.strip_prefix("AT+SBDWB=") {
            match len.parse::<usize>() {
                Ok(len) if (1..=MAX_MO_LEN).contains(&len) => {
                    self.upload = Some((len, Vec::with_capacity(len + 2)));
                    if self.ring_next_upload {
                        self.reply("SBDRING");
                    }
                    self.reply("READY");
                }
                _ => {
                    self.reply("3");
                    self.ok();
                }
            }
        } else {
            self.error(0);
        }
    }

    fn finish_upload(&mut self, data: Vec<u8>) {
        let (payload, trailer) = data.split_at(data.len() - 2);
        let mut sum = checksum(payload);
        if self.corrupt_next_upload {
            self.corrupt_next_upload = false;
            sum = sum.wrapping_add(1);
        }
        if self.ring_next_upload {
            self.ring_next_upload = false;
            self.reply("SBDRING");
        }
        if sum.to_be_bytes() == [trailer[0], trailer[1]] {
            self.mo_buffer = payload.to_vec();
            self.reply("0");
        } else {
            self.reply("2");
        }
        self.ok();
    }

    fn session(&mut self) {
        self.session_count += 1;
        let script = self.sessions.pop_front();

        match script {
            Some(SessionScript::Hang) => return,
            Some(SessionScript::HangAfterSend) => {
                self.momsn = self.momsn.wrapping_add(1);
                return;
            }
            Some(SessionScript::NoResult) => {
                self.ok();
                return;
            }
            _ => {}
        }

        if self.ring_next_session {
            self.ring_next_session = false;
            self.reply("SBDRING");
        }

        let mo_status = match script {
            Some(SessionScript::Status(code)) => code,
            _ if !self.radio => 34,
            _ => 0,
        };
        let momsn = self.momsn;
        self.momsn = self.momsn.wrapping_add(1);

        if mo_status > 4 {
            self.reply(&format!("+SBDIX: {mo_status}, {momsn}, 2, 0, 0, 0"));
            self.ok();
            return;
        }

        if self.loopback && !self.mo_buffer.is_empty() {
            self.gateway.push_back(self.mo_buffer.clone());
        }

        let (mt_status, mtmsn, mt_length) = match self.gateway.pop_front() {
            Some(message) => {
                let mtmsn = self.mtmsn.map_or(1, |n| n.wrapping_add(1));
                self.mtmsn = Some(mtmsn);
                let len = message.len();
                self.mt_buffer = message;
                (1, mtmsn, len)
            }
            None => (0, 0, 0),
        };
        let queued = self.gateway.len();
        self.reply(&format!(
            "+SBDIX: {mo_status}, {momsn}, {mt_status}, {mtmsn}, {mt_length}, {queued}"
        ));
        self.ok();
    }

    fn download(&mut self) {
        let payload = self.mt_buffer.clone();
        let mut sum = checksum(&payload);
        if self.corrupt_next_download {
            self.corrupt_next_download = false;
            sum = sum.wrapping_add(1);
        }

        if self.ring_next_download {
            self.ring_next_download = false;
            self.reply("SBDRING");
        }
        let len = u16::try_from(payload.len()).unwrap_or(u16::MAX);
        self.emit(&len.to_be_bytes());
        self.emit(&payload);
        self.emit(&sum.to_be_bytes());
        self.ok();
    }
}

/// Simulated transceiver. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SimulatedModem {
    device: Arc<Mutex<Device>>,
    read_timeout: Duration,
}

impl SimulatedModem {
    pub const DEFAULT_IMEI: &'static str = "300234010753370";
    pub const DEFAULT_MODEL: &'static str = "IRIDIUM 9600 Family SBD Transceiver";

    pub fn new() -> Self {
        Self {
            device: Arc::new(Mutex::new(Device::new())),
            read_timeout: Duration::from_millis(100),
        }
    }

    fn device(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swallow commands without echo or reply.
    pub fn set_silent(&self, silent: bool) {
        self.device().silent = silent;
    }

    /// Make the next open attempt fail.
    pub fn set_unplugged(&self, unplugged: bool) {
        self.device().unplugged = unplugged;
    }

    /// Report end-of-file on subsequent reads.
    pub fn close(&self) {
        self.device().closed = true;
    }

    pub fn set_echo(&self, echo: bool) {
        self.device().echo = echo;
    }

    /// Garble the echo of the next command.
    pub fn corrupt_next_echo(&self) {
        self.device().corrupt_next_echo = true;
    }

    /// Fail the checksum check of the next binary upload.
    pub fn corrupt_next_upload(&self) {
        self.device().corrupt_next_upload = true;
    }

    /// Send a wrong checksum with the next binary download.
    pub fn corrupt_next_download(&self) {
        self.device().corrupt_next_download = true;
    }

    /// Answer the next command with `ERROR` (code 0) or `ERROR:<code>`.
    pub fn reject_next(&self, code: u16) {
        self.device().reject_next = Some(code);
    }

    /// Queue an outcome for an upcoming session. Unscripted sessions succeed.
    pub fn script_session(&self, script: SessionScript) {
        self.device().sessions.push_back(script);
    }

    /// Emit `SBDRING` during the next session.
    pub fn ring_during_next_session(&self) {
        self.device().ring_next_session = true;
    }

    /// Emit `SBDRING` before `READY` and before the status line of the next
    /// binary upload.
    pub fn ring_during_next_upload(&self) {
        self.device().ring_next_upload = true;
    }

    /// Emit `SBDRING` ahead of the next binary download.
    pub fn ring_during_next_download(&self) {
        self.device().ring_next_download = true;
    }

    /// Answer the next buffer clear with status 1.
    pub fn fail_next_clear(&self) {
        self.device().fail_next_clear = true;
    }

    /// Deliver each successfully sent MO message back as an MT message.
    pub fn set_loopback(&self, loopback: bool) {
        self.device().loopback = loopback;
    }

    /// Queue a message at the gateway for delivery in a later session.
    pub fn stage_inbound(&self, message: &[u8]) {
        self.device().gateway.push_back(message.to_vec());
    }

    pub fn set_signal(&self, bars: u8) {
        self.device().signal = bars;
    }

    /// System time ticks, or `None` for no network service.
    pub fn set_network_ticks(&self, ticks: Option<u32>) {
        self.device().network_ticks = ticks;
    }

    /// Report no network service for the next `count` time queries.
    pub fn fail_network_queries(&self, count: u32) {
        self.device().network_failures = count;
    }

    pub fn set_energy(&self, energy: u32) {
        self.device().energy = energy;
    }

    pub fn energy(&self) -> u32 {
        self.device().energy
    }

    pub fn radio(&self) -> bool {
        self.device().radio
    }

    /// Contents of the device MO buffer.
    pub fn mo_buffer(&self) -> Vec<u8> {
        self.device().mo_buffer.clone()
    }

    /// Every command line received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.device().commands.clone()
    }

    /// Number of `AT+SBDIX` commands received.
    pub fn session_count(&self) -> usize {
        self.device().session_count
    }

    /// Total bytes written by the host.
    pub fn bytes_written(&self) -> usize {
        self.device().bytes_written
    }
}

impl Default for SimulatedModem {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for SimulatedModem {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        {
            let mut device = self.device();
            if !device.output.is_empty() {
                let n = buf.len().min(device.output.len());
                for (slot, byte) in buf.iter_mut().zip(device.output.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if device.closed {
                return Ok(0);
            }
        }

        std::thread::sleep(self.read_timeout);
        Err(ErrorKind::TimedOut.into())
    }
}

impl Write for SimulatedModem {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut device = self.device();
        if device.closed {
            return Err(ErrorKind::BrokenPipe.into());
        }
        device.receive(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ByteStream for SimulatedModem {
    fn set_read_timeout(&mut self, timeout: Duration) -> sbdlink_transport::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn discard_input(&mut self) -> sbdlink_transport::Result<()> {
        self.device().output.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "simulated".to_string()
    }
}

/// Opens a clone of one [`SimulatedModem`] for any address.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOpener {
    modem: SimulatedModem,
}

impl SimulatedOpener {
    pub fn new(modem: SimulatedModem) -> Self {
        Self { modem }
    }
}

impl Opener for SimulatedOpener {
    type Stream = SimulatedModem;

    fn open(&self, address: &str, _config: &ModemConfig) -> Result<SimulatedModem> {
        if self.modem.device().unplugged {
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{address}: no such device"),
            ))
            .into());
        }
        Ok(self.modem.clone())
    }
}
