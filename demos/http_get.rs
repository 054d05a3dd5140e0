// ABOUTME: Demo application fetching a URL over GPRS with the modem's HTTP stack
// ABOUTME: Attaches the bearer, runs a GET or form POST, prints the response and detaches

use argh::FromArgs;
use gsm_modem::SessionBuilder;
use gsm_modem::client::{ApnCredentials, HttpOptions};
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Make an HTTP request through a SIM900 modem
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial port the modem is attached to (default: /dev/ttyAMA0)
    #[argh(option)]
    port: Option<String>,

    /// access point name (default: internet)
    #[argh(option)]
    apn: Option<String>,

    /// APN user name
    #[argh(option)]
    user: Option<String>,

    /// APN password
    #[argh(option)]
    password: Option<String>,

    /// server host name or address
    #[argh(option, short = 's')]
    server: String,

    /// server port (default: 80)
    #[argh(option)]
    http_port: Option<u16>,

    /// request path (default: /)
    #[argh(option)]
    path: Option<String>,

    /// form-encoded parameters; sends a POST instead of a GET
    #[argh(option)]
    post: Option<String>,

    /// bearer profile number (default: 1)
    #[argh(option)]
    cid: Option<u8>,
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
    let cid = cli_args.cid.unwrap_or(1);
    let http_port = cli_args.http_port.unwrap_or(80);
    let path = cli_args.path.unwrap_or_else(|| "/".to_owned());
    let credentials = ApnCredentials::new(cli_args.apn.unwrap_or_else(|| "internet".to_owned()))
        .with_login(
            cli_args.user.unwrap_or_default(),
            cli_args.password.unwrap_or_default(),
        );

    let mut session = SessionBuilder::new(&port).open().await?;
    let mut inet = session.inet_with(HttpOptions::new().with_user_agent("gsm-modem demo"));

    let bearer = inet.attach(&credentials, cid).await?;
    println!("Attached, address {}", bearer.ip.as_deref().unwrap_or("unknown"));

    let result = match &cli_args.post {
        Some(params) => inet.http_post(&cli_args.server, http_port, &path, params, cid).await,
        None => inet.http_get(&cli_args.server, http_port, &path, cid).await,
    };

    match &result {
        Ok(response) => {
            println!("HTTP {} ({} bytes)", response.status, response.length);
            println!("{}", response.body);
        }
        Err(e) => eprintln!("Request failed: {e}"),
    }

    if let Err(e) = inet.detach(cid).await {
        eprintln!("Warning: detach failed: {e}");
    }
    session.close().await?;

    result.map(|_| ()).map_err(|e| Box::<dyn Error>::from(e.to_string()))
}
