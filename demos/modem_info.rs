// ABOUTME: Demo application printing modem identity, SIM state and an optional USSD reply
// ABOUTME: Exercises startup negotiation, IMEI query and the USSD client

use argh::FromArgs;
use gsm_modem::SessionBuilder;
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Show what the modem reports about itself
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial port the modem is attached to (default: /dev/ttyAMA0)
    #[argh(option)]
    port: Option<String>,

    /// SIM PIN, when the card is locked
    #[argh(option)]
    pin: Option<String>,

    /// USSD code to run, e.g. *100#
    #[argh(option, short = 'u')]
    ussd: Option<String>,
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
    let mut builder = SessionBuilder::new(&port);
    if let Some(pin) = cli_args.pin {
        builder = builder.pin(pin);
    }
    let mut session = builder.open().await?;

    println!("State:     {}", session.state());
    println!("SIM:       {}", session.pin_state());
    println!("IMEI:      {}", session.imei().await?);

    if let Some(code) = cli_args.ussd {
        match session.ussd().run(&code).await {
            Ok(reply) => {
                println!("USSD {code}: {}", reply.text);
                if reply.needs_reply() {
                    println!("(the network expects a reply)");
                }
            }
            Err(e) => eprintln!("USSD {code} failed: {e}"),
        }
    }

    session.close().await?;
    Ok(())
}
