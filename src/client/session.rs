// ABOUTME: Modem session lifecycle: startup probing with echo detection, SIM PIN handling and IMEI query
// ABOUTME: Owns the command engine and hands out borrowed SMS, USSD and HTTP feature handlers

use crate::client::error::{ErrorHolder, ModemError, ModemResult};
use crate::client::inet::InetClient;
use crate::client::sms::SmsSender;
use crate::client::types::{HttpOptions, SessionOptions, SmsOptions};
use crate::client::ussd::UssdClient;
use crate::connection::{CommandSession, DEFAULT_COMMAND_TIMEOUT_MS, TextDecoding};
use crate::datatypes::{ModemState, PinState};
use crate::frame;
use crate::transport::ByteTransport;
use std::time::Duration;
use tracing::{Instrument, debug, info, warn};

/// Commands sent once the modem answers the probe
const CONFIGURATION: &[(&str, u64)] = &[
    // numeric result codes off, verbose on
    ("ATV1", 500),
    // plain ERROR instead of +CME ERROR
    ("AT+CMEE=0", 500),
    ("AT", 5000),
];

/// A SIM900 modem driven over one command channel
///
/// ## Lifecycle
///
/// ```text
/// Unknown --open()--> Idle --begin()--> Ready --inet().attach()--> Attached
///                       \                 ^                           |
///                        +--> Error       +-----inet().detach()-------+
/// ```
///
/// `begin()` probes the modem with `AT` until it answers, switches command
/// echo off when the modem repeats the probe back, applies the base
/// configuration and reads the SIM lock state. Any failing step leaves the
/// session in `ModemState::Error`.
///
/// Feature handlers borrow the session mutably, so only one command is ever
/// in flight on the channel.
pub struct ModemSession<T> {
    connection: CommandSession<T>,
    state: ModemState,
    pin_state: PinState,
    options: SessionOptions,
}

impl<T: ByteTransport> ModemSession<T> {
    pub fn new(transport: T) -> Self {
        Self::from_connection(CommandSession::new(transport), SessionOptions::default())
    }

    pub fn with_options(transport: T, options: SessionOptions) -> Self {
        Self::from_connection(CommandSession::new(transport), options)
    }

    pub fn from_connection(connection: CommandSession<T>, options: SessionOptions) -> Self {
        Self {
            connection,
            state: ModemState::Unknown,
            pin_state: PinState::Unknown,
            options,
        }
    }

    pub fn connection(&self) -> &CommandSession<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut CommandSession<T> {
        &mut self.connection
    }

    pub fn into_connection(self) -> CommandSession<T> {
        self.connection
    }

    pub fn state(&self) -> ModemState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ModemState) {
        if self.state != state {
            debug!(parent: self.connection.span(), from = %self.state, to = %state, "state change");
            self.state = state;
        }
    }

    pub fn pin_state(&self) -> PinState {
        self.pin_state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn errors(&self) -> &ErrorHolder {
        self.connection.errors()
    }

    pub fn clear_error(&mut self) {
        self.connection.clear_error();
    }

    /// Fail with `InvalidState` unless `begin()` has completed
    pub(crate) fn ensure_ready(&mut self) -> ModemResult<()> {
        if self.state.is_ready() {
            return Ok(());
        }
        let err = ModemError::InvalidState(format!(
            "modem is {}, startup has not completed",
            self.state
        ));
        Err(self.connection.fail(err))
    }

    /// Open the channel
    pub async fn open(&mut self) -> ModemResult<()> {
        self.connection.open().await?;
        self.set_state(ModemState::Idle);
        Ok(())
    }

    /// Close the channel
    pub async fn close(&mut self) -> ModemResult<()> {
        self.connection.close().await?;
        self.set_state(ModemState::Unknown);
        Ok(())
    }

    /// Probe, configure and read the SIM lock state
    pub async fn begin(&mut self) -> ModemResult<()> {
        let span = self.connection.span().clone();
        let result = self.negotiate().instrument(span).await;
        match result {
            Ok(()) => {
                self.set_state(ModemState::Ready);
                Ok(())
            }
            Err(err) => {
                self.set_state(ModemState::Error);
                Err(err)
            }
        }
    }

    async fn negotiate(&mut self) -> ModemResult<()> {
        self.connection.clear().await?;

        let echo = self.probe().await?;
        if echo {
            info!("command echo is on, sending ATE0");
            self.connection.write_line("ATE0").await?;
            tokio::time::sleep(Duration::from_millis(self.options.echo_settle_ms)).await;
            self.connection.clear().await?;
        }

        self.connection.execute_sequence(CONFIGURATION).await?;
        let pin_state = self.check_pin().await?;
        info!(%pin_state, "modem ready");
        Ok(())
    }

    /// Send `AT` until the modem answers. Returns true when it echoed the probe.
    async fn probe(&mut self) -> ModemResult<bool> {
        let attempts = self.options.probe_attempts;

        for attempt in 1..=attempts {
            self.connection.write_line("AT").await?;
            let reply = self
                .connection
                .try_read_non_empty_line(self.options.probe_timeout_ms, TextDecoding::Ascii)
                .await;

            match reply.as_deref() {
                None => {
                    debug!(attempt, "no answer to probe");
                    tokio::time::sleep(Duration::from_millis(self.options.probe_pause_ms)).await;
                }
                Some("OK") => return Ok(false),
                Some("AT") => {
                    let next = self
                        .connection
                        .try_read_non_empty_line(500, TextDecoding::Ascii)
                        .await;
                    if next.as_deref() == Some("OK") {
                        return Ok(true);
                    }
                    warn!(attempt, reply = ?next, "echoed probe without OK");
                }
                Some(other) => warn!(attempt, reply = other, "unexpected probe reply"),
            }
        }

        Err(self.connection.fail(ModemError::NotResponding { attempts }))
    }

    /// Query `AT+CPIN?` and store the result
    pub async fn check_pin(&mut self) -> ModemResult<PinState> {
        let response = self
            .connection
            .execute_ok("AT+CPIN?", DEFAULT_COMMAND_TIMEOUT_MS)
            .await?;

        let text = response.text();
        let Some(value) = frame::tagged_value(text, "+CPIN") else {
            let err = ModemError::Protocol(format!("unexpected PIN state reply '{text}'"));
            return Err(self.connection.fail(err));
        };

        match PinState::from_reply(value) {
            Some(state) => {
                self.pin_state = state;
                Ok(state)
            }
            None => {
                self.pin_state = PinState::Unknown;
                let err = ModemError::Protocol(format!("unknown PIN state '{value}'"));
                Err(self.connection.fail(err))
            }
        }
    }

    /// Unlock the SIM with `pin`
    pub async fn enter_pin(&mut self, pin: &str) -> ModemResult<()> {
        if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
            let err = ModemError::Validation("PIN must be digits only".to_string());
            return Err(self.connection.fail(err));
        }
        self.connection
            .execute_ok(&format!("AT+CPIN=\"{pin}\""), DEFAULT_COMMAND_TIMEOUT_MS)
            .await?;
        Ok(())
    }

    /// Module serial number via `AT+GSN`
    pub async fn imei(&mut self) -> ModemResult<String> {
        let response = self
            .connection
            .execute_ok("AT+GSN", DEFAULT_COMMAND_TIMEOUT_MS)
            .await?;

        match response.lines().next() {
            Some(line) if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(line.to_string())
            }
            other => {
                let err = ModemError::Protocol(format!("unexpected IMEI reply {other:?}"));
                Err(self.connection.fail(err))
            }
        }
    }

    /// SMS sending with default retry settings
    pub fn sms(&mut self) -> SmsSender<'_, T> {
        SmsSender::new(self, SmsOptions::default())
    }

    pub fn sms_with(&mut self, options: SmsOptions) -> SmsSender<'_, T> {
        SmsSender::new(self, options)
    }

    pub fn ussd(&mut self) -> UssdClient<'_, T> {
        UssdClient::new(self)
    }

    /// GPRS bearer and HTTP requests with default HTTP settings
    pub fn inet(&mut self) -> InetClient<'_, T> {
        InetClient::new(self, HttpOptions::default())
    }

    pub fn inet_with(&mut self, options: HttpOptions) -> InetClient<'_, T> {
        InetClient::new(self, options)
    }
}

#[cfg(test)]
pub(crate) fn ready_session<T: ByteTransport>(transport: T) -> ModemSession<T> {
    let mut session = ModemSession::new(transport);
    session.state = ModemState::Ready;
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockModem;

    const OK: &str = "\r\nOK\r\n";

    fn configured(modem: MockModem) -> MockModem {
        modem
            .on("ATV1", OK)
            .on("AT+CMEE=0", OK)
            .on("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n")
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_without_echo() {
        let modem = configured(MockModem::new().on("AT", OK));
        let mut session = ModemSession::new(modem);

        session.begin().await.unwrap();
        assert_eq!(session.state(), ModemState::Ready);
        assert_eq!(session.pin_state(), PinState::NoPinNeeded);
        assert!(!session.connection().transport().commands.contains(&"ATE0".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_disables_echo() {
        let modem = configured(MockModem::new().with_echo().on("AT", OK).on("ATE0", OK));
        let mut session = ModemSession::new(modem);

        session.begin().await.unwrap();
        assert_eq!(session.state(), ModemState::Ready);
        assert_eq!(
            session.connection().transport().commands,
            vec!["AT", "ATE0", "ATV1", "AT+CMEE=0", "AT", "AT+CPIN?"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_retries_silent_probe() {
        let modem = configured(MockModem::new().silent("AT").then(OK));
        let options = SessionOptions::new().with_probe_timeout(100);
        let mut session = ModemSession::with_options(modem, options);

        session.begin().await.unwrap();
        let probes = session
            .connection()
            .transport()
            .commands
            .iter()
            .filter(|c| *c == "AT")
            .count();
        // one silent probe, one answered probe, then the configuration AT
        assert_eq!(probes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_gives_up() {
        let modem = MockModem::new().silent("AT");
        let options = SessionOptions::new().with_probe_attempts(2).with_probe_timeout(50);
        let mut session = ModemSession::with_options(modem, options);

        let err = session.begin().await.unwrap_err();
        assert!(matches!(err, ModemError::NotResponding { attempts: 2 }));
        assert_eq!(session.state(), ModemState::Error);
        assert!(session.errors().has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_fails_on_configuration_error() {
        let modem = MockModem::new().on("AT", OK).on("ATV1", OK);
        let mut session = ModemSession::new(modem);

        let err = session.begin().await.unwrap_err();
        assert!(matches!(err, ModemError::CommandRejected { .. }));
        assert_eq!(session.state(), ModemState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_pin_state_is_protocol_error() {
        let modem = MockModem::new().on("AT+CPIN?", "\r\n+CPIN: NOT READY\r\n\r\nOK\r\n");
        let mut session = ModemSession::new(modem);

        let err = session.check_pin().await.unwrap_err();
        assert!(matches!(err, ModemError::Protocol(_)));
        assert_eq!(session.pin_state(), PinState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_pin() {
        let modem = MockModem::new().on("AT+CPIN=\"1111\"", OK);
        let mut session = ModemSession::new(modem);

        session.enter_pin("1111").await.unwrap();
        assert!(matches!(
            session.enter_pin("12a4").await,
            Err(ModemError::Validation(_))
        ));
        assert!(matches!(
            session.enter_pin("0000").await,
            Err(ModemError::CommandRejected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_imei() {
        let modem = MockModem::new().on("AT+GSN", "\r\n013227001234567\r\n\r\nOK\r\n");
        let mut session = ModemSession::new(modem);
        assert_eq!(session.imei().await.unwrap(), "013227001234567");
    }

    #[tokio::test(start_paused = true)]
    async fn test_features_need_ready_session() {
        let mut session = ModemSession::new(MockModem::new());
        let err = session.ensure_ready().unwrap_err();
        assert!(matches!(err, ModemError::InvalidState(_)));

        session.open().await.unwrap();
        assert_eq!(session.state(), ModemState::Idle);
        assert!(session.ensure_ready().is_err());
    }
}
