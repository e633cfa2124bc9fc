use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::cmd::{ConnectionArgs, EnergyArgs, RadioArgs, RadioState, TimeArgs};
use crate::exit::{modem_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, Report};

#[derive(Debug, Serialize)]
struct TimeOutput {
    network_time: DateTime<Utc>,
    offset_ms: i64,
}

#[derive(Debug, Serialize)]
struct RadioOutput {
    radio_active: bool,
}

#[derive(Debug, Serialize)]
struct EnergyOutput {
    energy_used_uah: u32,
}

pub fn time(_args: TimeArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let network_time = modem
        .network_time()
        .map_err(|err| modem_error("network time failed", err))?;

    let out = TimeOutput {
        network_time,
        offset_ms: (network_time - Utc::now()).num_milliseconds(),
    };
    Report::new("Network time", &out)
        .row(
            "network time",
            out.network_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
        .row("offset from host", format!("{} ms", out.offset_ms))
        .print(format);
    Ok(SUCCESS)
}

pub fn radio(args: RadioArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let enabled = matches!(args.state, RadioState::On);
    let mut modem = conn.connect()?;
    modem
        .set_radio_activity(enabled)
        .map_err(|err| modem_error("radio command failed", err))?;

    let out = RadioOutput {
        radio_active: modem.state().radio_active(),
    };
    Report::new("Radio", &out)
        .row("radio", if out.radio_active { "on" } else { "off" })
        .print(format);
    Ok(SUCCESS)
}

pub fn energy(args: EnergyArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    if let Some(value) = args.set {
        modem
            .set_energy_used(value)
            .map_err(|err| modem_error("energy preset failed", err))?;
    }
    let energy_used_uah = modem
        .get_energy_used()
        .map_err(|err| modem_error("energy query failed", err))?;

    let out = EnergyOutput { energy_used_uah };
    Report::new("Energy", &out)
        .row("energy used", format!("{energy_used_uah} uAh"))
        .print(format);
    Ok(SUCCESS)
}
