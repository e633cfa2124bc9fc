use sbdlink_at::{CommandChannel, Reply, Terminal};
use sbdlink_transport::ByteStream;
use tracing::{debug, info, warn};

use crate::command::{checksum, encode_upload, AtCommand, BufferClear};
use crate::config::{ModemConfig, RetryPolicy, MAX_MO_LEN, MAX_MT_LEN, MAX_TEXT_LEN};
use crate::error::{ModemError, Result};
use crate::exchange::{check, response_line, response_value, run, strip_ring_alerts};
use crate::modem::DeviceState;
use crate::response::{parse_status_code, BufferStatus, SessionResponse};
use crate::status::{decode_clear, decode_unsolicited, decode_write, SbdStatus, RING_ALERT};

const READY: &str = "READY";

/// Message queueing and satellite sessions over a borrowed connection.
///
/// Obtained from [`Modem::session`](crate::Modem::session).
pub struct SessionManager<'a, S> {
    channel: &'a mut CommandChannel<S>,
    state: &'a mut DeviceState,
    config: &'a ModemConfig,
}

impl<'a, S: ByteStream> SessionManager<'a, S> {
    pub(crate) fn new(
        channel: &'a mut CommandChannel<S>,
        state: &'a mut DeviceState,
        config: &'a ModemConfig,
    ) -> Self {
        Self {
            channel,
            state,
            config,
        }
    }

    /// Stage a text message in the device MO buffer (`AT+SBDWT`).
    pub fn queue_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(ModemError::InvalidPayload("empty text message".to_string()));
        }
        if text.len() > MAX_TEXT_LEN {
            return Err(ModemError::PayloadTooLarge {
                size: text.len(),
                max: MAX_TEXT_LEN,
            });
        }
        if text.chars().any(char::is_control) {
            return Err(ModemError::InvalidPayload(
                "text messages cannot contain control characters".to_string(),
            ));
        }

        let exchange = self.config.command_exchange();
        match run(self.channel, &AtCommand::WriteText(text.to_string()), &exchange) {
            Ok(_) => {}
            Err(ModemError::CommandError { code, .. }) => {
                return Err(ModemError::QueueRejected { code })
            }
            Err(err) => return Err(err),
        }

        self.state.stage(text.as_bytes());
        debug!(len = text.len(), "text message queued");
        Ok(())
    }

    /// Stage a binary message in the device MO buffer (`AT+SBDWB`).
    pub fn queue_bytes(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(ModemError::InvalidPayload("empty binary message".to_string()));
        }
        if data.len() > MAX_MO_LEN {
            return Err(ModemError::PayloadTooLarge {
                size: data.len(),
                max: MAX_MO_LEN,
            });
        }

        let exchange = self.config.command_exchange();
        let command = AtCommand::WriteBinary(data.len());
        let line = command.line();
        let deadline = self.channel.start(&line, &exchange)?;

        let mut reply = self.channel.next_reply(&deadline)?;
        while matches!(&reply, Reply::Line(text) if decode_unsolicited(text).is_some()) {
            info!("ring alert: mobile-terminated message waiting at the gateway");
            reply = self.channel.next_reply(&deadline)?;
        }
        match reply {
            Reply::Line(reply) if reply == READY => {}
            Reply::Terminal(Terminal::Error(code)) => {
                return Err(ModemError::QueueRejected { code })
            }
            Reply::Terminal(terminal) => {
                return Err(ModemError::Protocol(format!(
                    "{line}: expected {READY}, got {terminal}"
                )))
            }
            Reply::Line(other) => {
                self.channel.abandon();
                return Err(ModemError::Protocol(format!(
                    "{line}: expected {READY}, got {other:?}"
                )));
            }
        }

        self.channel.write_raw(&encode_upload(data))?;

        let mut result = self.channel.finish(&line, &deadline)?;
        strip_ring_alerts(&mut result.body);
        let result = match check(result, &exchange) {
            Ok(result) => result,
            Err(ModemError::CommandError { code, .. }) => {
                return Err(ModemError::QueueRejected { code })
            }
            Err(err) => return Err(err),
        };

        let code = parse_status_code(response_value(&command, &result)?)?;
        let status = decode_write(code);
        if !status.is_success() {
            warn!(%status, "binary upload rejected");
            return Err(ModemError::QueueRejected { code });
        }

        self.state.stage(data);
        debug!(len = data.len(), "binary message queued");
        Ok(())
    }

    /// Run one satellite session (`AT+SBDIX`).
    ///
    /// The returned response may carry a failure status; only a missing or
    /// malformed session line is an error.
    pub fn initiate_session(&mut self) -> Result<SessionResponse> {
        let exchange = self.config.session_exchange();
        let command = AtCommand::Session;
        let mut result = self.channel.execute(&command.line(), &exchange)?;
        let ring_alert = strip_ring_alerts(&mut result.body);

        match result.terminal {
            Terminal::Ok => {}
            Terminal::Error(code) => {
                return Err(ModemError::CommandError {
                    command: result.command,
                    code,
                })
            }
            Terminal::Timeout => {
                warn!(timeout = ?exchange.timeout, "satellite session timed out");
                return Err(ModemError::SessionFailed(format!(
                    "no session result within {:?}",
                    exchange.timeout
                )));
            }
        }

        let mut response = SessionResponse::parse(response_line(&command, &result)?)?;
        response.ring_alert = ring_alert;

        self.state.record_session(&response);
        info!(
            mo = %response.mo_status,
            momsn = response.mo_sequence,
            mt = %response.mt_status,
            mt_length = response.mt_length,
            mt_queued = response.mt_queued,
            "session complete"
        );
        Ok(response)
    }

    /// Run sessions until one succeeds or the policy is exhausted.
    ///
    /// Retryable MO statuses are retried, and so is any other failure that
    /// raced a ring alert unless the status is permanent. A timed-out
    /// session is retried only if the MO sequence number did not move, since
    /// otherwise the gateway may already have the message; that case fails
    /// with [`ModemError::SessionFailed`]. When attempts run out the last
    /// response is returned as-is.
    pub fn initiate_session_with_retry(&mut self, policy: &RetryPolicy) -> Result<SessionResponse> {
        let attempts = policy.attempts();
        let mut attempt = 1;

        loop {
            let before = self.buffer_status()?.mo_sequence;

            match self.initiate_session() {
                Ok(response) if response.mo_success() => return Ok(response),
                Ok(response) => {
                    let retryable = response.mo_status.is_retryable()
                        || (response.ring_alert && !response.mo_status.is_permanent());
                    if !retryable || attempt >= attempts {
                        return Ok(response);
                    }
                    warn!(attempt, attempts, status = %response.mo_status, "session unsuccessful, retrying");
                }
                Err(ModemError::SessionFailed(reason)) => {
                    self.channel.clear_buffer()?;
                    let after = self.buffer_status()?.mo_sequence;
                    if after != before {
                        return Err(ModemError::SessionFailed(format!(
                            "{reason}; MOMSN moved from {before} to {after}, delivery unknown"
                        )));
                    }
                    if attempt >= attempts {
                        return Err(ModemError::SessionFailed(reason));
                    }
                    warn!(attempt, attempts, %reason, "session timed out, retrying");
                }
                Err(err) => return Err(err),
            }

            attempt += 1;
            std::thread::sleep(policy.backoff);
        }
    }

    /// Read the pending mobile-terminated message (`AT+SBDRB`).
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        if !self.state.inbound_pending() {
            return Err(ModemError::NoInboundData);
        }

        let exchange = self.config.command_exchange();
        let line = AtCommand::ReadBinary.line();
        let deadline = self.channel.start(&line, &exchange)?;

        while self.channel.skip_line(RING_ALERT, &deadline)? {
            info!("ring alert: mobile-terminated message waiting at the gateway");
        }
        let header = self.channel.read_exact(2, &deadline)?;
        let len = usize::from(u16::from_be_bytes([header[0], header[1]]));
        if len > MAX_MT_LEN {
            self.channel.abandon();
            return Err(ModemError::Protocol(format!(
                "inbound message length {len} exceeds {MAX_MT_LEN}"
            )));
        }

        let block = self.channel.read_exact(len + 2, &deadline)?;
        let (payload, trailer) = block.split_at(len);
        let expected = u16::from_be_bytes([trailer[0], trailer[1]]);

        check(self.channel.finish(&line, &deadline)?, &exchange)?;

        let actual = checksum(payload);
        if actual != expected {
            return Err(ModemError::Protocol(format!(
                "inbound checksum mismatch (device {expected:#06x}, computed {actual:#06x})"
            )));
        }

        debug!(len, "inbound message read");
        Ok(payload.to_vec())
    }

    /// Read the pending message as UTF-8 text.
    pub fn read_text(&mut self) -> Result<String> {
        Ok(String::from_utf8(self.read_bytes()?)?)
    }

    /// Queue `text` and run a session. The staged message is not rolled back
    /// if the session fails.
    pub fn send_text(&mut self, text: &str) -> Result<SessionResponse> {
        self.queue_text(text)?;
        self.initiate_session()
    }

    /// Queue `data` and run a session.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<SessionResponse> {
        self.queue_bytes(data)?;
        self.initiate_session()
    }

    /// Erase device buffers (`AT+SBDD<n>`).
    pub fn clear_buffers(&mut self, which: BufferClear) -> Result<SbdStatus> {
        let exchange = self.config.command_exchange();
        let command = AtCommand::ClearBuffers(which);
        let result = run(self.channel, &command, &exchange)?;
        let status = decode_clear(parse_status_code(response_value(&command, &result)?)?);

        if status.is_success() {
            self.state.clear_local(which);
        } else {
            warn!(?which, %status, "buffer clear failed");
        }
        Ok(status)
    }

    /// Query the device buffers (`AT+SBDS`).
    pub fn buffer_status(&mut self) -> Result<BufferStatus> {
        let exchange = self.config.command_exchange();
        let command = AtCommand::BufferStatus;
        let result = run(self.channel, &command, &exchange)?;
        let status = BufferStatus::parse(response_line(&command, &result)?)?;
        self.state.record_buffer_status(&status);
        Ok(status)
    }

    pub fn state(&self) -> &DeviceState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::modem::Modem;
    use crate::testing::{SessionScript, SimulatedModem, SimulatedOpener};

    fn connected(sim: &SimulatedModem) -> Modem<SimulatedModem> {
        let mut modem = Modem::new(ModemConfig {
            command_timeout: Duration::from_millis(200),
            session_timeout: Duration::from_millis(150),
            ..ModemConfig::default()
        });
        modem
            .connect_with(&SimulatedOpener::new(sim.clone()), "/dev/simulated0")
            .unwrap();
        modem
    }

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn queue_text_stages_payload() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);

        modem.session().unwrap().queue_text("HELLO").unwrap();
        assert_eq!(modem.state().buffer(), b"HELLO");
        assert_eq!(sim.mo_buffer(), b"HELLO");
    }

    #[test]
    fn queue_text_validates_before_writing() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let written = sim.bytes_written();
        let mut session = modem.session().unwrap();

        assert!(matches!(
            session.queue_text(&"x".repeat(MAX_TEXT_LEN + 1)),
            Err(ModemError::PayloadTooLarge { size: 121, max: 120 })
        ));
        assert!(matches!(session.queue_text(""), Err(ModemError::InvalidPayload(_))));
        assert!(matches!(
            session.queue_text("two\r\nlines"),
            Err(ModemError::InvalidPayload(_))
        ));
        assert_eq!(sim.bytes_written(), written);
    }

    #[test]
    fn queue_text_at_limit_is_accepted() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let text = "y".repeat(MAX_TEXT_LEN);

        modem.session().unwrap().queue_text(&text).unwrap();
        assert_eq!(sim.mo_buffer(), text.as_bytes());
    }

    #[test]
    fn queue_text_error_is_rejection() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        sim.reject_next(0);

        let err = modem.session().unwrap().queue_text("HELLO").unwrap_err();
        assert!(matches!(err, ModemError::QueueRejected { code: 0 }));
        assert!(modem.state().buffer().is_empty());
    }

    #[test]
    fn queue_bytes_uploads_with_checksum() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let payload = [0x00, 0x01, 0xfe, 0xff, b'\r', b'\n'];

        modem.session().unwrap().queue_bytes(&payload).unwrap();
        assert_eq!(sim.mo_buffer(), payload);
        assert_eq!(modem.state().buffer(), payload);
        assert!(sim.commands().contains(&"AT+SBDWB=6".to_string()));
    }

    #[test]
    fn queue_bytes_rejects_oversize_without_writing() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let written = sim.bytes_written();

        let err = modem
            .session()
            .unwrap()
            .queue_bytes(&[0u8; MAX_MO_LEN + 1])
            .unwrap_err();
        assert!(matches!(err, ModemError::PayloadTooLarge { size: 341, max: 340 }));
        assert_eq!(sim.bytes_written(), written);

        let err = modem.session().unwrap().queue_bytes(&[]).unwrap_err();
        assert!(matches!(err, ModemError::InvalidPayload(_)));
    }

    #[test]
    fn queue_bytes_checksum_failure_is_rejection() {
        let sim = SimulatedModem::new();
        sim.corrupt_next_upload();
        let mut modem = connected(&sim);

        let err = modem.session().unwrap().queue_bytes(b"data").unwrap_err();
        assert!(matches!(err, ModemError::QueueRejected { code: 2 }));
        assert!(modem.state().buffer().is_empty());
    }

    #[test]
    fn queue_bytes_ignores_ring_alerts() {
        let sim = SimulatedModem::new();
        sim.ring_during_next_upload();
        let mut modem = connected(&sim);

        modem.session().unwrap().queue_bytes(b"hi").unwrap();
        assert_eq!(modem.state().buffer(), b"hi");
        assert_eq!(sim.mo_buffer(), b"hi");
        assert_eq!(modem.signal_quality().unwrap(), 5);
    }

    #[test]
    fn send_bytes_queues_then_runs_session() {
        let sim = SimulatedModem::new();
        sim.set_loopback(true);
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();
        let payload = [0x00, 0xff, b'\r', b'\n'];

        let response = session.send_bytes(&payload).unwrap();
        assert!(response.mo_success());
        assert_eq!(response.mt_length, 4);
        assert!(session.state().buffer().is_empty());
        assert_eq!(session.read_bytes().unwrap(), payload);

        let commands = sim.commands();
        let upload = commands.iter().position(|c| c == "AT+SBDWB=4").unwrap();
        let sbdix = commands.iter().position(|c| c == "AT+SBDIX").unwrap();
        assert!(upload < sbdix);
    }

    #[test]
    fn send_bytes_stops_when_queue_fails() {
        let sim = SimulatedModem::new();
        sim.corrupt_next_upload();
        let mut modem = connected(&sim);

        let err = modem.session().unwrap().send_bytes(b"data").unwrap_err();
        assert!(matches!(err, ModemError::QueueRejected { code: 2 }));
        assert_eq!(sim.session_count(), 0);
    }

    #[test]
    fn session_success_clears_staged_buffer() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        let response = session.send_text("HELLO").unwrap();
        assert_eq!(response.mo_status, SbdStatus::Success(0));
        assert!(session.state().buffer().is_empty());
        assert!(!session.state().inbound_pending());
    }

    #[test]
    fn session_failure_keeps_staged_buffer() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Status(32));
        let mut modem = connected(&sim);

        let response = modem.session().unwrap().send_text("HELLO").unwrap();
        assert_eq!(response.mo_status, SbdStatus::NoNetwork(32));
        assert!(!response.mo_success());
        assert_eq!(modem.state().buffer(), b"HELLO");
    }

    #[test]
    fn session_timeout_is_session_failed_and_desynchronizes() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Hang);
        let mut modem = connected(&sim);

        let err = modem.session().unwrap().initiate_session().unwrap_err();
        assert!(matches!(err, ModemError::SessionFailed(_)));
        assert!(matches!(
            modem.signal_quality(),
            Err(ModemError::Desynchronized)
        ));
    }

    #[test]
    fn session_error_terminal_is_command_error() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        sim.reject_next(0);

        let err = modem.session().unwrap().initiate_session().unwrap_err();
        assert!(matches!(err, ModemError::CommandError { code: 0, .. }));
    }

    #[test]
    fn session_without_result_line_is_protocol_error() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::NoResult);
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();
        session.queue_text("HELLO").unwrap();

        let err = session.initiate_session().unwrap_err();
        assert!(matches!(err, ModemError::Protocol(ref msg) if msg.contains("+SBDIX")));
        assert_eq!(session.state().buffer(), b"HELLO");
    }

    #[test]
    fn ring_alert_is_reported() {
        let sim = SimulatedModem::new();
        sim.ring_during_next_session();
        let mut modem = connected(&sim);

        let response = modem.session().unwrap().initiate_session().unwrap();
        assert!(response.ring_alert);
        assert!(response.mo_success());
    }

    #[test]
    fn retry_stops_on_success() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Status(35));
        sim.script_session(SessionScript::Status(17));
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap();
        assert!(response.mo_success());
        assert_eq!(sim.session_count(), 3);
    }

    #[test]
    fn retry_is_bounded() {
        let sim = SimulatedModem::new();
        for _ in 0..5 {
            sim.script_session(SessionScript::Status(32));
        }
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(2))
            .unwrap();
        assert_eq!(response.mo_status, SbdStatus::NoNetwork(32));
        assert_eq!(sim.session_count(), 2);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Status(15));
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap();
        assert_eq!(response.mo_status, SbdStatus::AccessDenied(15));
        assert_eq!(sim.session_count(), 1);
    }

    #[test]
    fn ring_alert_does_not_retry_permanent_failure() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Status(15));
        sim.ring_during_next_session();
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap();
        assert_eq!(response.mo_status, SbdStatus::AccessDenied(15));
        assert!(response.ring_alert);
        assert_eq!(sim.session_count(), 1);
    }

    #[test]
    fn ring_alert_retries_other_failures() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Status(5));
        sim.ring_during_next_session();
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap();
        assert!(response.mo_success());
        assert_eq!(sim.session_count(), 2);
    }

    #[test]
    fn timed_out_session_is_retried_when_message_was_not_consumed() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::Hang);
        let mut modem = connected(&sim);

        let response = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap();
        assert!(response.mo_success());
        assert_eq!(sim.session_count(), 2);
    }

    #[test]
    fn timed_out_session_after_delivery_is_not_retried() {
        let sim = SimulatedModem::new();
        sim.script_session(SessionScript::HangAfterSend);
        let mut modem = connected(&sim);

        let err = modem
            .session()
            .unwrap()
            .initiate_session_with_retry(&quick_retry(3))
            .unwrap_err();
        assert!(matches!(err, ModemError::SessionFailed(ref msg) if msg.contains("MOMSN")));
        assert_eq!(sim.session_count(), 1);
    }

    #[test]
    fn read_without_pending_data() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);

        let err = modem.session().unwrap().read_bytes().unwrap_err();
        assert!(matches!(err, ModemError::NoInboundData));
        assert!(!sim.commands().contains(&"AT+SBDRB".to_string()));
    }

    #[test]
    fn inbound_message_is_read_after_session() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(b"hello\r\nworld");
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        let response = session.initiate_session().unwrap();
        assert_eq!(response.mt_length, 12);
        assert_eq!(response.mt_status, SbdStatus::Success(1));
        assert!(session.state().inbound_pending());

        assert_eq!(session.read_bytes().unwrap(), b"hello\r\nworld");
        assert_eq!(session.read_text().unwrap(), "hello\r\nworld");
    }

    #[test]
    fn read_bytes_skips_leading_ring_alert() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(b"pong");
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        session.initiate_session().unwrap();
        sim.ring_during_next_download();
        assert_eq!(session.read_bytes().unwrap(), b"pong");
        drop(session);
        assert_eq!(modem.signal_quality().unwrap(), 5);
    }

    #[test]
    fn read_text_rejects_invalid_utf8() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(&[0xc3, 0x28]);
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        session.initiate_session().unwrap();
        assert!(matches!(session.read_text(), Err(ModemError::Decode(_))));
    }

    #[test]
    fn inbound_checksum_mismatch_is_protocol_error() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(b"abc");
        sim.corrupt_next_download();
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        session.initiate_session().unwrap();
        let err = session.read_bytes().unwrap_err();
        assert!(matches!(err, ModemError::Protocol(ref msg) if msg.contains("checksum")));
        assert_eq!(session.read_bytes().unwrap(), b"abc");
    }

    #[test]
    fn buffer_status_refreshes_inbound_flag() {
        let sim = SimulatedModem::new();
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        let status = session.buffer_status().unwrap();
        assert!(!status.mo_buffered);
        assert_eq!(status.mt_sequence, None);

        session.queue_text("ping").unwrap();
        assert!(session.buffer_status().unwrap().mo_buffered);

        sim.stage_inbound(b"pong");
        session.initiate_session().unwrap();
        let status = session.buffer_status().unwrap();
        assert!(status.mt_buffered);
        assert_eq!(status.mt_sequence, Some(1));
        assert!(session.state().inbound_pending());
    }

    #[test]
    fn clear_buffers_clears_local_state() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(b"pong");
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        session.queue_text("ping").unwrap();
        session.initiate_session().unwrap();
        session.queue_text("again").unwrap();

        assert_eq!(session.clear_buffers(BufferClear::Mo).unwrap(), SbdStatus::Ok(0));
        assert!(session.state().buffer().is_empty());
        assert!(session.state().inbound_pending());

        assert_eq!(session.clear_buffers(BufferClear::Mt).unwrap(), SbdStatus::Ok(0));
        assert!(!session.state().inbound_pending());
        assert!(sim.mo_buffer().is_empty());
        assert!(matches!(session.read_bytes(), Err(ModemError::NoInboundData)));
    }

    #[test]
    fn failed_clear_leaves_local_state() {
        let sim = SimulatedModem::new();
        sim.stage_inbound(b"pong");
        let mut modem = connected(&sim);
        let mut session = modem.session().unwrap();

        session.queue_text("ping").unwrap();
        session.initiate_session().unwrap();
        session.queue_text("again").unwrap();
        sim.fail_next_clear();

        assert_eq!(
            session.clear_buffers(BufferClear::Both).unwrap(),
            SbdStatus::Failure(1)
        );
        assert_eq!(session.state().buffer(), b"again");
        assert!(session.state().inbound_pending());
        assert_eq!(sim.mo_buffer(), b"again");
        assert_eq!(session.read_bytes().unwrap(), b"pong");
    }
}
