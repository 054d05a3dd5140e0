// ABOUTME: USSD requests via AT+CUSD and parsing of the +CUSD result line
// ABOUTME: Handles replies delivered inline with OK as well as the later NUL-terminated unsolicited line

use crate::client::error::{ModemError, ModemResult};
use crate::client::session::ModemSession;
use crate::client::types::UssdResponse;
use crate::connection::TextDecoding;
use crate::frame;
use crate::transport::ByteTransport;
use tracing::{debug, info};

const USSD_TIMEOUT_MS: u64 = 20_000;
const TAIL_TIMEOUT_MS: u64 = 500;
/// Filler byte some firmware sends after the NUL terminator
const TAIL_FILLER: u8 = 0xFF;

/// Runs USSD codes such as `*100#` through a ready [`ModemSession`]
pub struct UssdClient<'a, T> {
    session: &'a mut ModemSession<T>,
}

impl<'a, T: ByteTransport> UssdClient<'a, T> {
    pub(crate) fn new(session: &'a mut ModemSession<T>) -> Self {
        Self { session }
    }

    /// Send `code` and wait for the network's answer
    pub async fn run(&mut self, code: &str) -> ModemResult<UssdResponse> {
        self.session.ensure_ready()?;
        if code.is_empty() || code.contains('"') {
            let err = ModemError::Validation(format!("invalid USSD code '{code}'"));
            return Err(self.session.connection_mut().fail(err));
        }

        let connection = self.session.connection_mut();
        info!(parent: connection.span(), code, "running USSD request");
        let response = connection
            .execute_ok(&format!("AT+CUSD=1,\"{code}\",15"), USSD_TIMEOUT_MS)
            .await?;

        let line = if response.text().is_empty() {
            self.read_unsolicited().await?
        } else {
            response.text().to_string()
        };

        match parse_cusd(&line) {
            Some(reply) => {
                debug!(parent: self.session.connection().span(), status = reply.status, "USSD reply");
                Ok(reply)
            }
            None => {
                let err = ModemError::Protocol(format!("cannot parse USSD reply '{line}'"));
                Err(self.session.connection_mut().fail(err))
            }
        }
    }

    /// The `+CUSD` line that arrives after `OK`, plus whatever trails its NUL
    async fn read_unsolicited(&mut self) -> ModemResult<String> {
        let connection = self.session.connection_mut();
        let mut line = connection
            .read_null_terminated_line(USSD_TIMEOUT_MS, TextDecoding::Ascii)
            .await?
            .trim()
            .to_string();

        let mut tail = String::new();
        if let Some(byte) = connection.try_read_exact_bytes(1, TAIL_TIMEOUT_MS).await {
            if byte[0] != TAIL_FILLER {
                tail.push_str(&String::from_utf8_lossy(&byte));
            }
        }
        if let Some(rest) = connection.try_read_line(TAIL_TIMEOUT_MS, TextDecoding::Ascii).await {
            tail.push_str(&rest);
        }

        let tail = tail.trim();
        if !tail.is_empty() {
            line.push_str(tail);
        }
        Ok(line)
    }
}

/// Parse `+CUSD: <status>[,"<text>"[,<dcs>]]`
///
/// The text is everything between the first and the last double quote, so
/// quotes and commas inside the message survive.
pub fn parse_cusd(line: &str) -> Option<UssdResponse> {
    let value = frame::tagged_value(line, "+CUSD")?;

    let (status, rest) = match value.split_once(',') {
        Some((status, rest)) => (status.trim(), rest.trim()),
        None => (value, ""),
    };
    let status = status.parse::<u8>().ok()?;

    let (text, dcs) = match (rest.find('"'), rest.rfind('"')) {
        (Some(open), Some(close)) if close > open => {
            let dcs = rest[close + 1..]
                .trim()
                .trim_start_matches(',')
                .trim()
                .parse::<u8>()
                .ok();
            (rest[open + 1..close].to_string(), dcs)
        }
        _ => (rest.trim_matches(',').trim_matches('"').to_string(), None),
    };

    Some(UssdResponse { status, text, dcs })
}
