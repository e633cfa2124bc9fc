use sbdlink_modem::BufferStatus;
use serde::Serialize;

use crate::cmd::{CliModem, ConnectionArgs, InfoArgs, ProbeArgs};
use crate::exit::{modem_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, Report};

#[derive(Debug, Serialize)]
struct ProbeOutput {
    port: String,
    connected: bool,
    imei: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    port: String,
    imei: String,
    model: String,
    signal_bars: u8,
    energy_used_uah: u32,
    buffers: BufferStatus,
}

pub fn run(_args: ProbeArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let out = ProbeOutput {
        port: conn.port()?.to_string(),
        connected: modem.check_serial_connection(),
        imei: modem.imei().map_err(|err| modem_error("imei query failed", err))?,
        model: modem.model().map_err(|err| modem_error("model query failed", err))?,
    };
    modem.disconnect();

    Report::new("Modem", &out)
        .row("imei", &out.imei)
        .row("model", &out.model)
        .row("port", &out.port)
        .row("connected", out.connected)
        .print(format);
    Ok(SUCCESS)
}

pub fn info(_args: InfoArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let out = collect_info(&mut modem, conn.port()?)?;
    modem.disconnect();

    Report::new("Modem info", &out)
        .row("imei", &out.imei)
        .row("model", &out.model)
        .row("port", &out.port)
        .row("signal", format!("{}/5", out.signal_bars))
        .row("energy used", format!("{} uAh", out.energy_used_uah))
        .row("mo buffered", out.buffers.mo_buffered)
        .row("momsn", out.buffers.mo_sequence)
        .row("mt buffered", out.buffers.mt_buffered)
        .row(
            "mtmsn",
            out.buffers
                .mt_sequence
                .map_or_else(|| "none".to_string(), |n| n.to_string()),
        )
        .print(format);
    Ok(SUCCESS)
}

fn collect_info(modem: &mut CliModem, port: &str) -> CliResult<InfoOutput> {
    let imei = modem
        .imei()
        .map_err(|err| modem_error("imei query failed", err))?;
    let model = modem
        .model()
        .map_err(|err| modem_error("model query failed", err))?;
    let signal_bars = modem
        .signal_quality()
        .map_err(|err| modem_error("signal query failed", err))?;
    let energy_used_uah = modem
        .get_energy_used()
        .map_err(|err| modem_error("energy query failed", err))?;
    let buffers = modem
        .session()
        .and_then(|mut session| session.buffer_status())
        .map_err(|err| modem_error("buffer status failed", err))?;

    Ok(InfoOutput {
        port: port.to_string(),
        imei,
        model,
        signal_bars,
        energy_used_uah,
        buffers,
    })
}
