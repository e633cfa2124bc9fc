use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use sbdlink_modem::testing::SimulatedModem;
use sbdlink_modem::{BufferClear, Modem, ModemConfig, Opener, SerialOpener};
use sbdlink_transport::ByteStream;

use crate::exit::{modem_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod buffer;
pub mod device;
pub mod doctor;
pub mod probe;
pub mod send;
pub mod session;
pub mod version;

/// Port name that selects the built-in loopback device.
pub const SIMULATED_PORT: &str = "simulated";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, check liveness and print the device identity.
    Probe(ProbeArgs),
    /// Print identity, signal, energy and buffer status.
    Info(InfoArgs),
    /// Queue a message and run a satellite session.
    Send(SendArgs),
    /// Run a session without queueing (mailbox check).
    Session(SessionArgs),
    /// Read the pending inbound message.
    Read(ReadArgs),
    /// Show the device message buffers.
    Status(StatusArgs),
    /// Show Iridium network time.
    Time(TimeArgs),
    /// Turn the radio on or off.
    Radio(RadioArgs),
    /// Show or preset the energy counter.
    Energy(EnergyArgs),
    /// Erase device message buffers.
    Clear(ClearArgs),
    /// Run connection health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, conn, format),
        Command::Info(args) => probe::info(args, conn, format),
        Command::Send(args) => send::run(args, conn, format),
        Command::Session(args) => session::run(args, conn, format),
        Command::Read(args) => session::read(args, conn, format),
        Command::Status(args) => buffer::status(args, conn, format),
        Command::Time(args) => device::time(args, conn, format),
        Command::Radio(args) => device::radio(args, conn, format),
        Command::Energy(args) => device::energy(args, conn, format),
        Command::Clear(args) => buffer::clear(args, conn, format),
        Command::Doctor(args) => doctor::run(args, conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Serial device of the modem, or `simulated` for a built-in loopback device.
    #[arg(long, short = 'p', env = "SBDLINK_PORT", global = true)]
    pub port: Option<String>,
    /// Serial baud rate.
    #[arg(long, default_value_t = 19_200, global = true)]
    pub baud: u32,
    /// Command timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
    /// Satellite session timeout.
    #[arg(long, default_value = "90s", global = true)]
    pub session_timeout: String,
}

pub type CliModem = Modem<Box<dyn ByteStream>>;

impl ConnectionArgs {
    pub fn config(&self) -> CliResult<ModemConfig> {
        Ok(ModemConfig {
            baud_rate: self.baud,
            command_timeout: parse_duration(&self.timeout)?,
            session_timeout: parse_duration(&self.session_timeout)?,
            ..ModemConfig::default()
        })
    }

    pub fn port(&self) -> CliResult<&str> {
        self.port
            .as_deref()
            .filter(|port| !port.trim().is_empty())
            .ok_or_else(|| CliError::new(USAGE, "no modem port given (use --port or SBDLINK_PORT)"))
    }

    /// Open the configured port and probe the modem.
    pub fn connect(&self) -> CliResult<CliModem> {
        let port = self.port()?;
        let mut modem = Modem::new(self.config()?);
        modem
            .connect_with(&CliOpener, port)
            .map_err(|err| modem_error("connect failed", err))?;
        Ok(modem)
    }
}

/// Serial devices, plus the loopback simulator under [`SIMULATED_PORT`].
struct CliOpener;

impl Opener for CliOpener {
    type Stream = Box<dyn ByteStream>;

    fn open(&self, address: &str, config: &ModemConfig) -> sbdlink_modem::Result<Self::Stream> {
        if address == SIMULATED_PORT {
            let sim = SimulatedModem::new();
            sim.set_loopback(true);
            return Ok(Box::new(sim));
        }
        Ok(Box::new(SerialOpener.open(address, config)?))
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Text message (AT+SBDWT, up to 120 bytes).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub text: Option<String>,
    /// Binary message as hex (AT+SBDWB, up to 340 bytes).
    #[arg(long, conflicts_with_all = ["text", "file"])]
    pub data: Option<String>,
    /// Read a binary message from file.
    #[arg(long, conflicts_with_all = ["text", "data"])]
    pub file: Option<PathBuf>,
    /// Session attempts before giving up.
    #[arg(long, default_value_t = 1)]
    pub retries: u32,
    /// Stage the message without starting a session.
    #[arg(long)]
    pub queue_only: bool,
}

#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Read and print an inbound message if one arrived.
    #[arg(long)]
    pub read: bool,
}

#[derive(Args, Debug, Default)]
pub struct ReadArgs {
    /// Decode the message as UTF-8 text.
    #[arg(long)]
    pub text: bool,
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Args, Debug, Default)]
pub struct TimeArgs {}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RadioState {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct RadioArgs {
    /// Desired radio state.
    pub state: RadioState,
}

#[derive(Args, Debug, Default)]
pub struct EnergyArgs {
    /// Preset the counter (microamp-hours) instead of reading it.
    #[arg(long, value_name = "UAH")]
    pub set: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Buffer to erase: mo, mt or both.
    pub which: BufferClear,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
