// ABOUTME: Session factory that opens a serial port and runs startup negotiation in one call
// ABOUTME: Collects serial settings, session options, an optional SIM PIN and a tracing span

use crate::client::error::{ModemError, ModemResult};
use crate::client::session::ModemSession;
use crate::client::types::SessionOptions;
use crate::connection::CommandSession;
use crate::transport::{ByteTransport, SerialSettings, SerialTransport};
use tracing::{Span, info, info_span};

/// Builder for a ready-to-use [`ModemSession`]
///
/// ```rust,no_run
/// use gsm_modem::client::SessionBuilder;
///
/// # async fn example() -> gsm_modem::client::ModemResult<()> {
/// let mut session = SessionBuilder::new("/dev/ttyAMA0").pin("1111").open().await?;
/// let imei = session.imei().await?;
/// println!("IMEI {imei}");
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    serial: SerialSettings,
    options: SessionOptions,
    pin: Option<String>,
    span: Option<Span>,
}

impl SessionBuilder {
    /// Builder for the modem on `port_name` with default serial parameters
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_settings(SerialSettings::new(port_name))
    }

    pub fn with_settings(serial: SerialSettings) -> Self {
        Self {
            serial,
            options: SessionOptions::default(),
            pin: None,
            span: None,
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial = self.serial.with_baud_rate(baud_rate);
        self
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// PIN to enter when the SIM asks for one during startup
    pub fn pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    /// Span that every log event of the session is emitted in
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Open the port and negotiate
    pub async fn open(self) -> ModemResult<ModemSession<SerialTransport>> {
        let span = self
            .span
            .unwrap_or_else(|| info_span!("modem", port = %self.serial.port_name));
        let transport = SerialTransport::new(self.serial);
        let connection = CommandSession::with_span(transport, span);

        start(ModemSession::from_connection(connection, self.options), self.pin.as_deref()).await
    }
}

/// Open, negotiate and unlock the SIM when needed
pub(crate) async fn start<T: ByteTransport>(
    mut session: ModemSession<T>,
    pin: Option<&str>,
) -> ModemResult<ModemSession<T>> {
    session.open().await?;
    session.begin().await?;

    if session.pin_state().needs_code() {
        let Some(pin) = pin else {
            let state = session.pin_state();
            let err = ModemError::InvalidState(format!("SIM is locked ({state}) and no PIN was given"));
            return Err(session.connection_mut().fail(err));
        };
        session.enter_pin(pin).await?;
        let state = session.check_pin().await?;
        info!(parent: session.connection().span(), pin_state = %state, "PIN accepted");
    }

    Ok(session)
}
