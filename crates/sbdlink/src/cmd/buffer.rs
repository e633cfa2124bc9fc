use serde::Serialize;

use sbdlink_modem::{BufferClear, SbdStatus};

use crate::cmd::{ClearArgs, ConnectionArgs, StatusArgs};
use crate::exit::{modem_error, CliResult, FAILURE, SUCCESS};
use crate::output::{OutputFormat, Report};

#[derive(Debug, Serialize)]
struct ClearOutput {
    buffer: BufferClear,
    status: SbdStatus,
    cleared: bool,
}

pub fn status(_args: StatusArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let status = modem
        .session()
        .and_then(|mut session| session.buffer_status())
        .map_err(|err| modem_error("buffer status failed", err))?;

    Report::new("Buffers", &status)
        .row("mo buffered", status.mo_buffered)
        .row("momsn", status.mo_sequence)
        .row("mt buffered", status.mt_buffered)
        .row(
            "mtmsn",
            status
                .mt_sequence
                .map_or_else(|| "none".to_string(), |n| n.to_string()),
        )
        .print(format);
    Ok(SUCCESS)
}

pub fn clear(args: ClearArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let status = modem
        .session()
        .and_then(|mut session| session.clear_buffers(args.which))
        .map_err(|err| modem_error("clear failed", err))?;

    let out = ClearOutput {
        buffer: args.which,
        status,
        cleared: status.is_success(),
    };
    Report::new("Clear", &out)
        .row("cleared", out.cleared)
        .row("buffer", format!("{:?}", out.buffer).to_lowercase())
        .row("status", out.status)
        .print(format);

    Ok(if out.cleared { SUCCESS } else { FAILURE })
}
