use serde::Serialize;

use crate::cmd::send::print_session;
use crate::cmd::{ConnectionArgs, ReadArgs, SessionArgs};
use crate::exit::{modem_error, CliResult, FAILURE, SUCCESS};
use crate::output::{payload_preview, print_raw, to_hex, OutputFormat, Report};

#[derive(Debug, Serialize)]
struct InboundOutput {
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    hex: String,
}

pub fn run(args: SessionArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let mut session = modem
        .session()
        .map_err(|err| modem_error("session unavailable", err))?;

    let response = session
        .initiate_session()
        .map_err(|err| modem_error("session failed", err))?;
    print_session(&response, format);

    if args.read && response.has_inbound() {
        let data = session
            .read_bytes()
            .map_err(|err| modem_error("read failed", err))?;
        print_inbound(&data, None, format);
    }

    Ok(if response.mo_status.is_success() {
        SUCCESS
    } else {
        FAILURE
    })
}

pub fn read(args: ReadArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut modem = conn.connect()?;
    let mut session = modem
        .session()
        .map_err(|err| modem_error("session unavailable", err))?;

    // A fresh connection only learns about a waiting message from SBDS.
    session
        .buffer_status()
        .map_err(|err| modem_error("buffer status failed", err))?;

    if args.text {
        let text = session
            .read_text()
            .map_err(|err| modem_error("read failed", err))?;
        print_inbound(text.as_bytes(), Some(&text), format);
    } else {
        let data = session
            .read_bytes()
            .map_err(|err| modem_error("read failed", err))?;
        print_inbound(&data, None, format);
    }
    Ok(SUCCESS)
}

fn print_inbound(data: &[u8], text: Option<&str>, format: OutputFormat) {
    if matches!(format, OutputFormat::Raw) {
        print_raw(data);
        return;
    }

    let out = InboundOutput {
        length: data.len(),
        text: text.map(str::to_string),
        hex: to_hex(data),
    };
    Report::new("Inbound message", &out)
        .row("message", text.map_or_else(|| payload_preview(data), str::to_string))
        .row("length", out.length)
        .row("hex", &out.hex)
        .print(format);
}
