// ABOUTME: Byte transport abstraction underneath the AT command engine
// ABOUTME: Raw duplex channel operations only, no knowledge of the AT protocol

use std::io;

mod serial;

#[cfg(test)]
pub(crate) mod mock;

pub use serial::{SerialSettings, SerialTransport};

/// Physical duplex byte channel to the modem
///
/// Implementations never interpret the AT protocol. All waiting is done by
/// the command engine, so `read` must not block: it returns whatever is
/// available right now, and `Ok(0)` when nothing is.
pub trait ByteTransport {
    /// Open the underlying channel
    async fn open(&mut self) -> io::Result<()>;

    /// Close the underlying channel. Closing a closed channel is not an error.
    async fn close(&mut self) -> io::Result<()>;

    /// Discard anything pending in the input and output buffers
    async fn clear(&mut self) -> io::Result<()>;

    /// Write as much of `data` as the channel accepts, returning the count
    async fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes without waiting for more to arrive
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Returns true while the channel is open
    fn is_open(&self) -> bool;
}

pub(crate) fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial channel is not open")
}
