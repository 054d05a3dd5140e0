// ABOUTME: Async driver for SIM900-family GSM modems over a serial AT command channel
// ABOUTME: Exposes the command engine, the SMS PDU codec and the SMS, USSD and GPRS/HTTP clients

pub mod client;
pub mod connection;
pub mod datatypes;
pub mod deadline;
pub mod frame;
pub mod pdu;
pub mod transport;


// Re-export the main client API for easy access
pub use client::{ModemError, ModemResult, ModemSession, SessionBuilder};
pub use connection::CommandSession;
pub use pdu::{PduMessage, PduPart};
pub use transport::{ByteTransport, SerialSettings, SerialTransport};

/// Error returned by the demo binaries and other glue code.
///
/// Library operations return [`ModemError`]; this boxed form is for
/// application code that mixes modem errors with others.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for application code using the driver.
///
/// # Examples
///
/// ## Sending an SMS
///
/// ```rust,no_run
/// use gsm_modem::SessionBuilder;
///
/// #[tokio::main]
/// async fn main() -> gsm_modem::Result<()> {
///     // Open the port, probe the modem and unlock the SIM
///     let mut session = SessionBuilder::new("/dev/ttyAMA0").pin("1111").open().await?;
///
///     let reply = session.sms().send_text("+380501234567", "Hello, World!").await?;
///     println!("Sent: {reply}");
///
///     session.close().await?;
///     Ok(())
/// }
/// ```
///
/// ## HTTP over GPRS
///
/// ```rust,no_run
/// use gsm_modem::SessionBuilder;
/// use gsm_modem::client::ApnCredentials;
///
/// #[tokio::main]
/// async fn main() -> gsm_modem::Result<()> {
///     let mut session = SessionBuilder::new("/dev/ttyAMA0").open().await?;
///     let mut inet = session.inet();
///
///     inet.attach(&ApnCredentials::new("internet"), 1).await?;
///     let response = inet.http_get("example.com", 80, "/", 1).await?;
///     println!("{} ({} bytes)", response.status, response.length);
///     inet.detach(1).await?;
///
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
