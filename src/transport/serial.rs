// ABOUTME: Serial port transport built on tokio-serial with the modem's fixed 57600 8N1 settings
// ABOUTME: Turns awaiting reads into non-blocking polls so the command engine owns all waiting

use super::{ByteTransport, not_open};
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::debug;

/// How long a single read may wait for the driver before reporting "nothing yet"
const READ_POLL: Duration = Duration::from_millis(1);

/// Serial line settings
///
/// Defaults match what SIM900 modules expect out of the box: 57600 baud,
/// 8 data bits, no parity, one stop bit, no flow control.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl SerialSettings {
    pub const DEFAULT_BAUD_RATE: u32 = 57600;

    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}

/// `ByteTransport` over a local serial device
pub struct SerialTransport {
    settings: SerialSettings,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            stream: None,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn stream(&mut self) -> io::Result<&mut SerialStream> {
        self.stream.as_mut().ok_or_else(not_open)
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("settings", &self.settings)
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl ByteTransport for SerialTransport {
    async fn open(&mut self) -> io::Result<()> {
        if self.stream.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "serial port is already open",
            ));
        }

        let stream = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .parity(self.settings.parity)
            .stop_bits(self.settings.stop_bits)
            .flow_control(self.settings.flow_control)
            .timeout(Duration::ZERO)
            .open_native_async()
            .map_err(io::Error::from)?;

        debug!(
            port = %self.settings.port_name,
            baud = self.settings.baud_rate,
            "serial port opened"
        );
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush().await?;
            debug!(port = %self.settings.port_name, "serial port closed");
        }
        Ok(())
    }

    async fn clear(&mut self) -> io::Result<()> {
        self.stream()?
            .clear(ClearBuffer::All)
            .map_err(io::Error::from)
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stream()?.write(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let stream = self.stream()?;
        match tokio::time::timeout(READ_POLL, stream.read(buf)).await {
            Ok(result) => result,
            // Nothing arrived within the poll window
            Err(_) => Ok(0),
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
