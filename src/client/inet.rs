// ABOUTME: GPRS bearer management (AT+SAPBR) and HTTP GET/POST through the modem's AT+HTTP stack
// ABOUTME: Includes the pure parsers for +SAPBR, +HTTPACTION and +HTTPREAD reply lines

use crate::client::error::{ModemError, ModemResult};
use crate::client::session::ModemSession;
use crate::client::types::{ApnCredentials, BearerInfo, HttpOptions, HttpResponse};
use crate::connection::TextDecoding;
use crate::datatypes::{BearerState, HttpMethod, ModemState};
use crate::frame;
use crate::transport::ByteTransport;
use tracing::{debug, info, warn};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// GPRS and HTTP operations on a ready [`ModemSession`]
///
/// An HTTP request needs an attached bearer. A typical exchange:
///
/// ```rust,no_run
/// # use gsm_modem::client::{ApnCredentials, ModemSession};
/// # use gsm_modem::transport::ByteTransport;
/// # async fn example<T: ByteTransport>(session: &mut ModemSession<T>) -> gsm_modem::client::ModemResult<()> {
/// let mut inet = session.inet();
/// inet.attach(&ApnCredentials::new("internet"), 1).await?;
/// let response = inet.http_get("example.com", 80, "/status", 1).await?;
/// println!("{} {}", response.status, response.body);
/// inet.detach(1).await?;
/// # Ok(())
/// # }
/// ```
pub struct InetClient<'a, T> {
    session: &'a mut ModemSession<T>,
    options: HttpOptions,
}

impl<'a, T: ByteTransport> InetClient<'a, T> {
    pub(crate) fn new(session: &'a mut ModemSession<T>, options: HttpOptions) -> Self {
        Self { session, options }
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// Query the state of bearer `cid`
    pub async fn check_bearer(&mut self, cid: u8) -> ModemResult<BearerInfo> {
        self.session.ensure_ready()?;
        let connection = self.session.connection_mut();
        let response = connection
            .execute_ok(&format!("AT+SAPBR=2,{cid}"), 1000)
            .await?;

        match parse_sapbr(response.text(), cid) {
            Ok(info) => {
                debug!(parent: connection.span(), cid, state = ?info.state, ip = ?info.ip, "bearer state");
                Ok(info)
            }
            Err(err) => Err(connection.fail(err)),
        }
    }

    /// Open GPRS bearer `cid` unless it is already connected
    pub async fn attach(&mut self, credentials: &ApnCredentials, cid: u8) -> ModemResult<BearerInfo> {
        let current = self.check_bearer(cid).await?;
        if current.is_connected() {
            self.session.set_state(ModemState::Attached);
            return Ok(current);
        }

        Self::quotable(self.session, "APN", &credentials.apn)?;
        Self::quotable(self.session, "user", &credentials.user)?;
        Self::quotable(self.session, "password", &credentials.password)?;

        let connection = self.session.connection_mut();
        connection.try_execute("AT+CIPSHUT", 500).await;

        let commands = [
            (format!("AT+SAPBR=3,{cid},\"CONTYPE\",\"GPRS\""), 1000),
            (format!("AT+SAPBR=3,{cid},\"APN\",\"{}\"", credentials.apn), 500),
            (format!("AT+SAPBR=3,{cid},\"USER\",\"{}\"", credentials.user), 500),
            (format!("AT+SAPBR=3,{cid},\"PWD\",\"{}\"", credentials.password), 500),
            (format!("AT+SAPBR=1,{cid}"), 10_000),
        ];
        let sequence: Vec<(&str, u64)> = commands.iter().map(|(c, t)| (c.as_str(), *t)).collect();
        connection.execute_sequence(&sequence).await?;

        let info = self.check_bearer(cid).await?;
        if !info.is_connected() {
            let err = ModemError::Protocol(format!(
                "bearer {cid} is {:?} after activation",
                info.state
            ));
            return Err(self.session.connection_mut().fail(err));
        }

        info!(parent: self.session.connection().span(), cid, apn = credentials.apn.as_str(), ip = ?info.ip, "GPRS attached");
        self.session.set_state(ModemState::Attached);
        Ok(info)
    }

    /// Close bearer `cid`
    pub async fn detach(&mut self, cid: u8) -> ModemResult<()> {
        self.session.ensure_ready()?;
        self.session
            .connection_mut()
            .try_execute("AT+CIPCLOSE", 1000)
            .await;

        match self.check_bearer(cid).await {
            Ok(info) if info.state == BearerState::Closed => {}
            _ => {
                self.session
                    .connection_mut()
                    .execute_ok(&format!("AT+SAPBR=0,{cid}"), 1000)
                    .await?;
            }
        }

        info!(parent: self.session.connection().span(), cid, "GPRS detached");
        self.session.set_state(ModemState::Ready);
        Ok(())
    }

    /// `GET http://server:port/path` over bearer `cid`
    pub async fn http_get(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        cid: u8,
    ) -> ModemResult<HttpResponse> {
        self.session.ensure_ready()?;
        self.prepare(server, port, path, cid, None).await?;

        let connection = self.session.connection_mut();
        connection.execute_ok("AT+HTTPACTION=0", 10_000).await?;
        let line = connection
            .read_non_empty_line(10_000, TextDecoding::Ascii)
            .await?;

        self.finish(HttpMethod::Get, &line).await
    }

    /// `POST` form-encoded `params` to `http://server:port/path` over bearer `cid`
    pub async fn http_post(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        params: &str,
        cid: u8,
    ) -> ModemResult<HttpResponse> {
        self.session.ensure_ready()?;
        self.prepare(server, port, path, cid, Some(FORM_CONTENT_TYPE))
            .await?;

        let connection = self.session.connection_mut();
        let command = format!("AT+HTTPDATA={},10000", params.len());
        let download = connection
            .execute(&command, 7000, &["DOWNLOAD", "ERROR"])
            .await?;
        if download.result != "DOWNLOAD" {
            let err = ModemError::CommandRejected {
                command,
                result: download.result,
            };
            return Err(connection.fail(err));
        }

        connection.write_line(params).await?;
        let uploaded = connection
            .read_non_empty_line(500, TextDecoding::Ascii)
            .await?;
        if uploaded != "OK" {
            let err = ModemError::Protocol(format!("POST data upload answered '{uploaded}'"));
            return Err(connection.fail(err));
        }

        connection.execute_ok("AT+HTTPACTION=1", 15_000).await?;
        let line = connection
            .read_non_empty_line(15_000, TextDecoding::Ascii)
            .await?;

        self.finish(HttpMethod::Post, &line).await
    }

    /// Reset the HTTP service and set every request parameter
    async fn prepare(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        cid: u8,
        content_type: Option<&str>,
    ) -> ModemResult<()> {
        Self::quotable(self.session, "server", server)?;
        Self::quotable(self.session, "path", path)?;
        Self::quotable(self.session, "user agent", &self.options.user_agent)?;

        let mut commands = vec![
            ("AT+HTTPINIT".to_string(), 2000),
            (format!("AT+HTTPPARA=\"CID\",\"{cid}\""), 1000),
            (format!("AT+HTTPPARA=\"URL\",\"{server}:{port}{path}\""), 500),
        ];
        if let Some(content_type) = content_type {
            commands.push((format!("AT+HTTPPARA=\"CONTENT\",\"{content_type}\""), 500));
        }
        let redirect = if self.options.follow_redirects { 1 } else { 0 };
        commands.extend([
            (format!("AT+HTTPPARA=\"UA\",\"{}\"", self.options.user_agent), 500),
            (format!("AT+HTTPPARA=\"REDIR\",\"{redirect}\""), 500),
            (format!("AT+HTTPPARA=\"TIMEOUT\",\"{}\"", self.options.timeout_secs), 500),
        ]);

        let connection = self.session.connection_mut();
        // a request left over from an earlier failure makes HTTPINIT fail
        connection.try_execute("AT+HTTPTERM", 500).await;

        let sequence: Vec<(&str, u64)> = commands.iter().map(|(c, t)| (c.as_str(), *t)).collect();
        connection.execute_sequence(&sequence).await
    }

    /// Parse the action result, read the body when there is one and end the request
    async fn finish(&mut self, method: HttpMethod, line: &str) -> ModemResult<HttpResponse> {
        let connection = self.session.connection_mut();
        let (status, length) = match parse_http_action(line, method) {
            Ok(parsed) => parsed,
            Err(err) => return Err(connection.fail(err)),
        };

        let mut response = HttpResponse {
            status,
            length,
            body: String::new(),
        };

        if response.is_success() && matches!(status, 200 | 206) && length > 0 {
            let read = connection
                .execute_ok(&format!("AT+HTTPREAD=0,{length}"), 10_000)
                .await?;
            response.body = match parse_http_read(&read.body, length) {
                Ok(body) => body,
                Err(err) => return Err(connection.fail(err)),
            };
        } else if !response.is_success() {
            warn!(parent: connection.span(), status, ?method, "HTTP request failed");
        }

        connection.try_execute("AT+HTTPTERM", 500).await;
        info!(parent: connection.span(), status, length, ?method, "HTTP request completed");
        Ok(response)
    }

    /// Values are sent inside double quotes and cannot contain one
    fn quotable(session: &mut ModemSession<T>, field: &str, value: &str) -> ModemResult<()> {
        if value.contains('"') || !value.is_ascii() {
            let err = ModemError::Validation(format!("{field} '{value}' cannot be sent to the modem"));
            return Err(session.connection_mut().fail(err));
        }
        Ok(())
    }
}

/// Parse `+SAPBR: <cid>,<status>,"<ip>"` for bearer `cid`
pub fn parse_sapbr(line: &str, cid: u8) -> ModemResult<BearerInfo> {
    let value = frame::tagged_value(line, "+SAPBR")
        .ok_or_else(|| ModemError::Protocol(format!("expected +SAPBR, got '{line}'")))?;

    let fields = frame::split_and_filter(value, ',');
    let [reported, status, ip, ..] = fields.as_slice() else {
        return Err(ModemError::Protocol(format!("short +SAPBR reply '{value}'")));
    };

    if reported.parse::<u8>().ok() != Some(cid) {
        return Err(ModemError::Protocol(format!(
            "+SAPBR reply is for bearer {reported}, expected {cid}"
        )));
    }

    let state = BearerState::from_field(status).unwrap_or(BearerState::Unknown);
    let ip = (state == BearerState::Connected).then(|| ip.trim_matches('"').trim().to_string());

    Ok(BearerInfo { cid, state, ip })
}

/// Parse `+HTTPACTION: <method>,<status>,<length>` into `(status, length)`
pub fn parse_http_action(line: &str, method: HttpMethod) -> ModemResult<(u16, usize)> {
    let value = frame::tagged_value(line, "+HTTPACTION")
        .ok_or_else(|| ModemError::Protocol(format!("expected +HTTPACTION, got '{line}'")))?;

    let fields = frame::split_and_filter(value, ',');
    let [reported, status, length, ..] = fields.as_slice() else {
        return Err(ModemError::Protocol(format!("short +HTTPACTION reply '{value}'")));
    };

    if reported.parse::<u8>().ok() != Some(method.code()) {
        return Err(ModemError::Protocol(format!(
            "+HTTPACTION reports method {reported}, expected {}",
            method.code()
        )));
    }

    let status = status
        .parse::<u16>()
        .map_err(|_| ModemError::Protocol(format!("HTTP status '{status}' is not numeric")))?;
    let length = length
        .parse::<usize>()
        .map_err(|_| ModemError::Protocol(format!("HTTP length '{length}' is not numeric")))?;

    Ok((status, length))
}

/// Split an `AT+HTTPREAD` reply body into its `+HTTPREAD: <len>` header and the data
pub fn parse_http_read(body: &str, expected: usize) -> ModemResult<String> {
    let body = body.trim_start();
    let (header, data) = body.split_once('\n').unwrap_or((body, ""));

    let announced = frame::tagged_value(header, "+HTTPREAD")
        .ok_or_else(|| ModemError::Protocol(format!("expected +HTTPREAD, got '{}'", header.trim())))?;
    let announced = announced
        .parse::<usize>()
        .map_err(|_| ModemError::Protocol(format!("HTTPREAD length '{announced}' is not numeric")))?;

    if announced != expected {
        return Err(ModemError::Protocol(format!(
            "HTTPREAD returned {announced} bytes, expected {expected}"
        )));
    }

    Ok(data.strip_suffix('\n').unwrap_or(data).to_string())
}
