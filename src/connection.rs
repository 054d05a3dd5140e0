// ABOUTME: AT command engine turning a raw serial byte stream into deadline-bounded exchanges
// ABOUTME: Provides command execution with terminal token matching plus line, NUL and fixed-size reads

use crate::client::error::{ErrorHolder, ModemError, ModemResult};
use crate::deadline::{Deadline, Poller};
use crate::frame::{self, Response, STANDARD_RESULTS};
use crate::transport::ByteTransport;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tracing::{Instrument, Span, debug, info, info_span, trace};

/// Send deadline used for command lines and free text
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 1000;

/// Reply deadline for commands without a more specific one
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Ctrl-Z, ends the text written after an `AT+CMGS` prompt
pub const CTRL_Z: char = '\u{1A}';

const READ_CHUNK: usize = 100;
const FIXED_READ_CHUNK: usize = 10;

const IDLE_PAUSE: Duration = Duration::from_millis(5);
const PARSE_PAUSE: Duration = Duration::from_millis(50);
const LINE_PAUSE: Duration = Duration::from_millis(1);
const FIXED_READ_PAUSE: Duration = Duration::from_millis(3);
const WRITE_PAUSE: Duration = Duration::from_millis(1);

/// How received line bytes are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDecoding {
    /// 7-bit ASCII only; any other byte fails the read as soon as it arrives
    #[default]
    Ascii,
    Utf8,
}

impl TextDecoding {
    fn check(self, byte: u8) -> ModemResult<()> {
        if self == TextDecoding::Ascii && !byte.is_ascii() {
            return Err(ModemError::Encoding(format!(
                "byte 0x{byte:02X} is not ASCII"
            )));
        }
        Ok(())
    }

    fn decode(self, bytes: &[u8]) -> ModemResult<String> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| ModemError::Encoding(format!("line is not valid UTF-8: {e}")))
    }
}

/// AT command session over a `ByteTransport`
///
/// Owns the transport, a scratch accumulator and the session's last-error
/// record. Every operation is bounded by a deadline given in milliseconds;
/// a deadline expiry is reported as a `Timeout`, which the error record
/// classifies as a warning.
///
/// ## Command exchange
///
/// ```text
/// host                         modem
///  | -- clear buffers             |
///  | -- "AT+CPIN?\r\n" ---------> |
///  | <-------- "\r\n+CPIN: READY" |   fragment, no terminal yet
///  | <---------- "\r\n\r\nOK\r\n" |   last non-empty line is a terminal
///  | => Response { body: "\n+CPIN: READY\n", result: "OK" }
/// ```
///
/// The accumulator is split on carriage returns after each burst. The
/// exchange completes only when the last non-empty fragment equals one of
/// the terminal tokens; anything else (including `OK` followed by an
/// unsolicited line) keeps waiting. A timed out exchange never returns a
/// partial body.
///
/// Failures are returned to the caller and also recorded in
/// [`errors`](Self::errors), replacing whatever was recorded before.
pub struct CommandSession<T> {
    transport: T,
    buffer: BytesMut,
    last_result: Option<String>,
    errors: ErrorHolder,
    span: Span,
}

impl<T: ByteTransport> CommandSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_span(transport, info_span!("modem"))
    }

    /// Session whose log events are emitted inside `span`
    pub fn with_span(transport: T, span: Span) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(1024),
            last_result: None,
            errors: ErrorHolder::new(),
            span,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Terminal token of the last completed exchange
    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn errors(&self) -> &ErrorHolder {
        &self.errors
    }

    pub fn clear_error(&mut self) {
        self.errors.clear();
    }

    /// Record a failure detected above the engine and hand it back
    pub fn fail(&mut self, err: ModemError) -> ModemError {
        let _entered = self.span.enter();
        self.errors.record(&err);
        err
    }

    fn track<V>(&mut self, result: ModemResult<V>) -> ModemResult<V> {
        result.map_err(|err| self.fail(err))
    }

    pub async fn open(&mut self) -> ModemResult<()> {
        let span = self.span.clone();
        let result = self.open_channel().instrument(span).await;
        self.track(result)
    }

    async fn open_channel(&mut self) -> ModemResult<()> {
        self.transport.open().await?;
        self.transport.clear().await?;
        self.buffer.clear();
        info!("channel opened");
        Ok(())
    }

    pub async fn close(&mut self) -> ModemResult<()> {
        let span = self.span.clone();
        let result = self.close_channel().instrument(span).await;
        self.track(result)
    }

    async fn close_channel(&mut self) -> ModemResult<()> {
        self.transport.close().await?;
        info!("channel closed");
        Ok(())
    }

    /// Discard unread input, unsent output and the accumulator
    pub async fn clear(&mut self) -> ModemResult<()> {
        self.buffer.clear();
        let result = self.transport.clear().await.map_err(ModemError::from);
        self.track(result)
    }

    /// Write all of `data` within `timeout_ms`
    pub async fn send_raw(&mut self, data: &[u8], timeout_ms: u64) -> ModemResult<()> {
        let span = self.span.clone();
        let result = self
            .send_all(data, Deadline::after_ms(timeout_ms))
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Write ASCII text as is
    pub async fn write_str(&mut self, text: &str) -> ModemResult<()> {
        if !text.is_ascii() {
            let err = ModemError::Encoding(format!("'{text}' is not ASCII"));
            return Err(self.fail(err));
        }
        self.send_raw(text.as_bytes(), DEFAULT_SEND_TIMEOUT_MS).await
    }

    /// Write ASCII text followed by CR LF
    pub async fn write_line(&mut self, text: &str) -> ModemResult<()> {
        self.write_str(&format!("{text}\r\n")).await
    }

    async fn send_all(&mut self, data: &[u8], deadline: Deadline) -> ModemResult<()> {
        let poll = Poller::new(deadline, "send");
        let mut sent = 0;
        while sent < data.len() {
            let written = deadline
                .run("send", self.transport.write(&data[sent..]))
                .await??;
            if written == 0 {
                poll.wait(WRITE_PAUSE).await?;
            }
            sent += written;
        }
        trace!(bytes = data.len(), "sent");
        Ok(())
    }

    /// Read exactly `count` bytes
    pub async fn read_exact_bytes(&mut self, count: usize, timeout_ms: u64) -> ModemResult<Bytes> {
        let span = self.span.clone();
        let result = self
            .read_fixed(count, Deadline::after_ms(timeout_ms))
            .instrument(span)
            .await;
        self.track(result)
    }

    async fn read_fixed(&mut self, count: usize, deadline: Deadline) -> ModemResult<Bytes> {
        let poll = Poller::new(deadline, "fixed-size read");
        let mut chunk = [0u8; FIXED_READ_CHUNK];
        self.buffer.clear();

        while self.buffer.len() < count {
            let want = if count - self.buffer.len() >= FIXED_READ_CHUNK {
                FIXED_READ_CHUNK
            } else {
                1
            };
            let n = deadline
                .run("fixed-size read", self.transport.read(&mut chunk[..want]))
                .await??;
            if n == 0 {
                poll.wait(FIXED_READ_PAUSE).await?;
                continue;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
            if self.buffer.len() < count {
                poll.wait(Duration::ZERO).await?;
            }
        }
        Ok(self.buffer.split().freeze())
    }

    /// Read one line and return it trimmed
    pub async fn read_line(&mut self, timeout_ms: u64, decoding: TextDecoding) -> ModemResult<String> {
        let span = self.span.clone();
        let result = self
            .read_text_line(Deadline::after_ms(timeout_ms), decoding)
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Read one line, undecoded, including its line feed
    pub async fn read_raw_line(&mut self, timeout_ms: u64) -> ModemResult<Bytes> {
        let span = self.span.clone();
        let result = self
            .read_until(b'\n', Deadline::after_ms(timeout_ms), None, "line")
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Skip blank lines and return the first one with content. All attempts
    /// share one deadline.
    pub async fn read_non_empty_line(
        &mut self,
        timeout_ms: u64,
        decoding: TextDecoding,
    ) -> ModemResult<String> {
        let span = self.span.clone();
        let result = self
            .read_first_non_empty(Deadline::after_ms(timeout_ms), decoding)
            .instrument(span)
            .await;
        self.track(result)
    }

    async fn read_first_non_empty(
        &mut self,
        deadline: Deadline,
        decoding: TextDecoding,
    ) -> ModemResult<String> {
        loop {
            let line = self.read_text_line(deadline, decoding).await?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    /// Read up to a NUL byte and return the text before it
    pub async fn read_null_terminated_line(
        &mut self,
        timeout_ms: u64,
        decoding: TextDecoding,
    ) -> ModemResult<String> {
        let span = self.span.clone();
        let result = self
            .read_nul_text(Deadline::after_ms(timeout_ms), decoding)
            .instrument(span)
            .await;
        self.track(result)
    }

    async fn read_nul_text(&mut self, deadline: Deadline, decoding: TextDecoding) -> ModemResult<String> {
        let raw = self
            .read_until(0, deadline, Some(decoding), "NUL-terminated line")
            .await?;
        decoding.decode(&raw[..raw.len() - 1])
    }

    /// Like [`read_line`](Self::read_line), but a failure is only logged
    pub async fn try_read_line(&mut self, timeout_ms: u64, decoding: TextDecoding) -> Option<String> {
        let span = self.span.clone();
        let result = self
            .read_text_line(Deadline::after_ms(timeout_ms), decoding)
            .instrument(span.clone())
            .await;
        untracked(&span, "read_line", result)
    }

    /// Like [`read_non_empty_line`](Self::read_non_empty_line), but a failure is only logged
    pub async fn try_read_non_empty_line(
        &mut self,
        timeout_ms: u64,
        decoding: TextDecoding,
    ) -> Option<String> {
        let span = self.span.clone();
        let result = self
            .read_first_non_empty(Deadline::after_ms(timeout_ms), decoding)
            .instrument(span.clone())
            .await;
        untracked(&span, "read_non_empty_line", result)
    }

    /// Like [`read_exact_bytes`](Self::read_exact_bytes), but a failure is only logged
    pub async fn try_read_exact_bytes(&mut self, count: usize, timeout_ms: u64) -> Option<Bytes> {
        let span = self.span.clone();
        let result = self
            .read_fixed(count, Deadline::after_ms(timeout_ms))
            .instrument(span.clone())
            .await;
        untracked(&span, "read_exact_bytes", result)
    }

    async fn read_text_line(&mut self, deadline: Deadline, decoding: TextDecoding) -> ModemResult<String> {
        let raw = self.read_until(b'\n', deadline, Some(decoding), "line").await?;
        let line = decoding.decode(&raw)?;
        trace!(line = line.trim(), "read line");
        Ok(line.trim().to_string())
    }

    /// Byte-at-a-time read up to and including `terminator`
    async fn read_until(
        &mut self,
        terminator: u8,
        deadline: Deadline,
        decoding: Option<TextDecoding>,
        operation: &'static str,
    ) -> ModemResult<Bytes> {
        let poll = Poller::new(deadline, operation);
        let mut byte = [0u8; 1];
        self.buffer.clear();

        loop {
            let n = deadline.run(operation, self.transport.read(&mut byte)).await??;
            if n == 0 {
                poll.wait(LINE_PAUSE).await?;
                continue;
            }
            if let Some(decoding) = decoding {
                decoding.check(byte[0])?;
            }
            self.buffer.extend_from_slice(&byte);
            if byte[0] == terminator {
                return Ok(self.buffer.split().freeze());
            }
            poll.wait(Duration::ZERO).await?;
        }
    }

    /// Send `command` and wait until the reply ends with one of `terminals`
    pub async fn execute(
        &mut self,
        command: &str,
        timeout_ms: u64,
        terminals: &[&str],
    ) -> ModemResult<Response> {
        let span = self.span.clone();
        let result = self
            .exchange(command, Deadline::after_ms(timeout_ms), terminals)
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Send `command` and require the reply to end with `expected`
    pub async fn execute_expect(
        &mut self,
        command: &str,
        expected: &str,
        timeout_ms: u64,
    ) -> ModemResult<Response> {
        let span = self.span.clone();
        let result = self
            .exchange_expecting(command, Deadline::after_ms(timeout_ms), &[expected], expected)
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Send `command` and require `OK`; an `ERROR` reply is a `CommandRejected`
    pub async fn execute_ok(&mut self, command: &str, timeout_ms: u64) -> ModemResult<Response> {
        let span = self.span.clone();
        let result = self
            .exchange_expecting(command, Deadline::after_ms(timeout_ms), STANDARD_RESULTS, "OK")
            .instrument(span)
            .await;
        self.track(result)
    }

    /// Run `(command, timeout_ms)` pairs in order, stopping at the first failure
    pub async fn execute_sequence(&mut self, commands: &[(&str, u64)]) -> ModemResult<()> {
        for (command, timeout_ms) in commands {
            self.execute_ok(command, *timeout_ms).await?;
        }
        Ok(())
    }

    /// Send `command` expecting `OK` without recording a failure.
    /// Used for housekeeping commands whose outcome does not matter.
    pub async fn try_execute(&mut self, command: &str, timeout_ms: u64) -> Option<Response> {
        let span = self.span.clone();
        let result = self
            .exchange_expecting(command, Deadline::after_ms(timeout_ms), STANDARD_RESULTS, "OK")
            .instrument(span.clone())
            .await;
        untracked(&span, command, result)
    }

    async fn exchange_expecting(
        &mut self,
        command: &str,
        deadline: Deadline,
        terminals: &[&str],
        expected: &str,
    ) -> ModemResult<Response> {
        let response = self.exchange(command, deadline, terminals).await?;
        if response.result != expected {
            return Err(ModemError::CommandRejected {
                command: command.to_string(),
                result: response.result,
            });
        }
        Ok(response)
    }

    async fn exchange(
        &mut self,
        command: &str,
        deadline: Deadline,
        terminals: &[&str],
    ) -> ModemResult<Response> {
        if !command.is_ascii() {
            return Err(ModemError::Encoding(format!("command '{command}' is not ASCII")));
        }

        self.last_result = None;
        self.buffer.clear();
        deadline.run("clear", self.transport.clear()).await??;

        let line = format!("{command}\r\n");
        self.send_all(line.as_bytes(), deadline).await?;
        debug!(command, "sent command");

        let poll = Poller::new(deadline, "command response");
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let mut received = 0;
            loop {
                let n = deadline
                    .run("command response", self.transport.read(&mut chunk))
                    .await??;
                if n == 0 {
                    break;
                }
                self.buffer.extend_from_slice(&chunk[..n]);
                received += n;
            }

            if received == 0 {
                poll.wait(IDLE_PAUSE).await?;
                continue;
            }

            if let Some(response) = frame::match_terminal(&self.buffer, terminals) {
                debug!(command, result = %response.result, body = response.text(), "command completed");
                self.last_result = Some(response.result.clone());
                return Ok(response);
            }
            poll.wait(PARSE_PAUSE).await?;
        }
    }
}

/// Log a failure that the caller chose not to record
fn untracked<V>(span: &Span, operation: &str, result: ModemResult<V>) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(parent: span, operation, %err, "ignored failure");
            None
        }
    }
}
