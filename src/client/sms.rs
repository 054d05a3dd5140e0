// ABOUTME: SMS submission in text mode and PDU mode with bounded per-message retries
// ABOUTME: PDU mode compiles the message with the pdu codec and submits each segment in order

use crate::client::error::{ModemError, ModemResult};
use crate::client::session::ModemSession;
use crate::client::types::SmsOptions;
use crate::connection::CTRL_Z;
use crate::pdu::{self, PduMessage, PduPart};
use crate::transport::ByteTransport;
use tracing::{debug, info, warn};

/// Sends SMS through a ready [`ModemSession`]
///
/// Every submission is `AT+CMGS`, a `>` prompt, then the payload closed by
/// Ctrl-Z. A failed prompt or payload starts the attempt over; after
/// `SmsOptions::attempts` failures the send gives up with
/// `ModemError::AttemptsExhausted`.
pub struct SmsSender<'a, T> {
    session: &'a mut ModemSession<T>,
    options: SmsOptions,
}

impl<'a, T: ByteTransport> SmsSender<'a, T> {
    pub(crate) fn new(session: &'a mut ModemSession<T>, options: SmsOptions) -> Self {
        Self { session, options }
    }

    pub fn options(&self) -> &SmsOptions {
        &self.options
    }

    /// Send ASCII `text` to `number` in text mode. Returns the modem's
    /// `+CMGS` reply.
    pub async fn send_text(&mut self, number: &str, text: &str) -> ModemResult<String> {
        self.session.ensure_ready()?;
        let number = self.checked_number(number)?;
        if !text.is_ascii() {
            let err = ModemError::Encoding("text mode SMS must be ASCII, use PDU mode".to_string());
            return Err(self.session.connection_mut().fail(err));
        }

        let connection = self.session.connection_mut();
        connection.execute_ok("AT+CMGS=?", 300).await?;
        connection.execute_ok("AT+CMGF=1", 1000).await?;

        let prompt = format!("AT+CMGS=\"{number}\"");
        let payload = format!("{text}\n{CTRL_Z}");
        let reply = self.submit("send_text", &prompt, &payload).await?;
        info!(parent: self.session.connection().span(), number, "text SMS sent");
        Ok(reply)
    }

    /// Compile `message` and submit every segment in PDU mode. Returns one
    /// `+CMGS` reply per segment.
    pub async fn send_pdu(&mut self, message: &PduMessage) -> ModemResult<Vec<String>> {
        self.session.ensure_ready()?;
        let parts = match pdu::compile(message) {
            Ok(parts) => parts,
            Err(err) => return Err(self.session.connection_mut().fail(err.into())),
        };
        self.send_parts(&parts).await
    }

    /// Submit already compiled segments in PDU mode
    pub async fn send_parts(&mut self, parts: &[PduPart]) -> ModemResult<Vec<String>> {
        self.session.ensure_ready()?;

        let connection = self.session.connection_mut();
        connection.execute_ok("AT+CSCS=\"GSM\"", 500).await?;
        connection.execute_ok("AT+CMGF=0", 1000).await?;

        let mut replies = Vec::with_capacity(parts.len());
        for part in parts {
            let prompt = format!("AT+CMGS={}", part.tpdu_octets());
            let payload = format!("{}{CTRL_Z}", part.submission());
            let reply = self.submit("send_pdu", &prompt, &payload).await?;
            debug!(
                parent: self.session.connection().span(),
                index = part.index,
                total = part.total,
                reply = reply.as_str(),
                "segment sent"
            );
            replies.push(reply);
        }

        info!(parent: self.session.connection().span(), segments = parts.len(), "PDU SMS sent");
        Ok(replies)
    }

    /// One `AT+CMGS` round with retries
    async fn submit(
        &mut self,
        operation: &'static str,
        prompt: &str,
        payload: &str,
    ) -> ModemResult<String> {
        let attempts = self.options.attempts;
        let connection = self.session.connection_mut();

        for attempt in 1..=attempts {
            if let Err(err) = connection
                .execute_expect(prompt, ">", self.options.prompt_timeout_ms)
                .await
            {
                warn!(parent: connection.span(), attempt, %err, "no SMS prompt");
                continue;
            }

            match connection
                .execute_ok(payload, self.options.submit_timeout_ms)
                .await
            {
                Ok(response) => return Ok(response.text().to_string()),
                Err(err) => warn!(parent: connection.span(), attempt, %err, "SMS submission failed"),
            }
        }

        Err(connection.fail(ModemError::AttemptsExhausted { operation, attempts }))
    }

    fn checked_number<'n>(&mut self, number: &'n str) -> ModemResult<&'n str> {
        let trimmed = number.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            let err = ModemError::Validation(format!("invalid phone number '{number}'"));
            return Err(self.session.connection_mut().fail(err));
        }
        Ok(trimmed)
    }
}
