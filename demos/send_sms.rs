// ABOUTME: Demo application sending one SMS through a SIM900 modem on a serial port
// ABOUTME: Uses text mode for ASCII by default and PDU mode for Unicode, flash or validity options

use argh::FromArgs;
use gsm_modem::SessionBuilder;
use gsm_modem::pdu::{PduMessage, ValidityPeriod};
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Send an SMS through a SIM900 modem
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial port the modem is attached to (default: /dev/ttyAMA0)
    #[argh(option)]
    port: Option<String>,

    /// baud rate (default: 57600)
    #[argh(option, short = 'b')]
    baud: Option<u32>,

    /// SIM PIN, when the card is locked
    #[argh(option)]
    pin: Option<String>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// always send in PDU mode
    #[argh(switch)]
    pdu: bool,

    /// show the message on screen without storing it (PDU mode)
    #[argh(switch)]
    flash: bool,

    /// validity period in hours, 12 to 24 (PDU mode)
    #[argh(option)]
    validity_hours: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::TRACE
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let port = cli_args.port.unwrap_or_else(|| "/dev/ttyAMA0".to_owned());
    let mut builder = SessionBuilder::new(&port).baud_rate(cli_args.baud.unwrap_or(57600));
    if let Some(pin) = cli_args.pin {
        builder = builder.pin(pin);
    }

    let mut session = builder.open().await.map_err(|e| {
        eprintln!("Modem startup on {port} failed: {e}");
        Box::<dyn Error>::from(e.to_string())
    })?;
    println!("Modem ready on {port}");

    let use_pdu = cli_args.pdu
        || cli_args.flash
        || cli_args.validity_hours.is_some()
        || !cli_args.message.is_ascii();

    let result = if use_pdu {
        let mut message = PduMessage::new(&cli_args.to, &cli_args.message).with_flash(cli_args.flash);
        if let Some(hours) = cli_args.validity_hours {
            message = message.with_validity(ValidityPeriod::hours(hours, false)?);
        }
        println!("Sending {} segment(s) in PDU mode", message.segment_count());
        session.sms().send_pdu(&message).await.map(|replies| replies.join(", "))
    } else {
        session.sms().send_text(&cli_args.to, &cli_args.message).await
    };

    match result {
        Ok(reply) => {
            println!("Message sent successfully: {reply}");
            if let Err(e) = session.close().await {
                eprintln!("Warning: close failed: {e}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to send message: {e}");
            let _ = session.close().await;
            Err(Box::<dyn Error>::from(e.to_string()))
        }
    }
}
