use std::fs;

use sbdlink_modem::{RetryPolicy, SessionManager, SessionResponse};
use sbdlink_transport::ByteStream;
use serde::Serialize;
use tracing::info;

use crate::cmd::{ConnectionArgs, SendArgs};
use crate::exit::{io_error, modem_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{from_hex, payload_preview, OutputFormat, Report};

#[derive(Debug, PartialEq, Eq)]
enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct QueuedOutput {
    queued_bytes: usize,
    preview: String,
}

pub fn run(args: SendArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let mut modem = conn.connect()?;
    let session_retry = modem.config().session_retry;
    let mut session = modem
        .session()
        .map_err(|err| modem_error("session unavailable", err))?;

    queue(&mut session, &payload)?;
    info!(bytes = payload.len(), "message queued");

    if args.queue_only {
        let out = QueuedOutput {
            queued_bytes: payload.len(),
            preview: payload_preview(session.state().buffer()),
        };
        Report::new("Queued", &out)
            .row("queued bytes", out.queued_bytes)
            .row("message", &out.preview)
            .print(format);
        return Ok(SUCCESS);
    }

    let response = if args.retries > 1 {
        let policy = RetryPolicy {
            max_attempts: args.retries,
            ..session_retry
        };
        session.initiate_session_with_retry(&policy)
    } else {
        session.initiate_session()
    }
    .map_err(|err| modem_error("session failed", err))?;

    print_session(&response, format);
    Ok(if response.mo_success() { SUCCESS } else { FAILURE })
}

fn queue<S: ByteStream>(session: &mut SessionManager<'_, S>, payload: &Payload) -> CliResult<()> {
    let result = match payload {
        Payload::Text(text) => session.queue_text(text),
        Payload::Binary(data) => session.queue_bytes(data),
    };
    result.map_err(|err| modem_error("queue failed", err))
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(text) = &args.text {
        return Ok(Payload::Text(text.clone()));
    }
    if let Some(data) = &args.data {
        return from_hex(data)
            .map(Payload::Binary)
            .ok_or_else(|| CliError::new(USAGE, "--data must be an even-length hex string"));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map(Payload::Binary)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --text, --data or --file is required"))
}

pub(crate) fn print_session(response: &SessionResponse, format: OutputFormat) {
    Report::new("Session", response)
        .row("mo status", response.mo_status)
        .row("momsn", response.mo_sequence)
        .row("mt status", response.mt_status)
        .row("mtmsn", response.mt_sequence)
        .row("mt length", response.mt_length)
        .row("mt queued", response.mt_queued)
        .row("ring alert", response.ring_alert)
        .print(format);
}
