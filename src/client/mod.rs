// ABOUTME: Modem client module: session lifecycle plus the SMS, USSD and GPRS/HTTP feature layers
// ABOUTME: Exports the session, builder, feature handlers, option types and error types

//! Modem Client Module
//!
//! Everything above the AT command engine lives here:
//!
//! * **Session lifecycle** - [`ModemSession`] probes the modem, disables echo,
//!   applies the base configuration and tracks the SIM lock state
//! * **Feature layers** - [`SmsSender`], [`UssdClient`] and [`InetClient`]
//!   borrow the session mutably, so the compiler guarantees a single command
//!   in flight
//! * **Builder** - [`SessionBuilder`] opens a serial port and negotiates in one call
//! * **Errors** - [`ModemError`] for results, [`ErrorHolder`] for the
//!   per-session last-error record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gsm_modem::client::SessionBuilder;
//! use gsm_modem::pdu::PduMessage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = SessionBuilder::new("/dev/ttyAMA0").open().await?;
//!
//! // Plain ASCII in text mode
//! session.sms().send_text("+380501234567", "Hello!").await?;
//!
//! // Anything else through the PDU codec, split into segments as needed
//! let message = PduMessage::new("+380501234567", "Привіт!").with_flash(true);
//! session.sms().send_pdu(&message).await?;
//!
//! // Balance check
//! let reply = session.ussd().run("*100#").await?;
//! println!("{}", reply.text);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod inet;
pub mod session;
pub mod sms;
pub mod types;
pub mod ussd;

pub use builder::SessionBuilder;
pub use error::{ErrorHolder, ModemError, ModemResult, Severity};
pub use inet::InetClient;
pub use session::ModemSession;
pub use sms::SmsSender;
pub use types::{
    ApnCredentials, BearerInfo, HttpOptions, HttpResponse, SessionOptions, SmsOptions,
    UssdResponse,
};
pub use ussd::UssdClient;
