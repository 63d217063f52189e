//! Byte-stream abstraction the bus loop runs on (§6).
//!
//! Production use wires this to a real RS-232/LIN transceiver through
//! the `serialport` crate (see `bin/inetbox-serial.rs`); tests and the
//! replay tool implement it directly over an in-memory or file-backed
//! byte source.

use std::io;
use std::time::Duration;

/// A duplex byte stream the bus loop reads LIN frames from and writes
/// responses to.
///
/// Implementations are not required to be non-blocking; the bus loop's
/// `step()` contract only bounds the amount of *protocol* work done per
/// call, not how long an individual read blocks waiting for bytes.
pub trait SerialChannel {
    /// Reads exactly `buf.len()` bytes, blocking until they arrive or
    /// the channel's read timeout elapses.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `buf` in full.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Discards any bytes already buffered but not yet read, so a fresh
    /// read starts at the next sync byte instead of stale data.
    fn flush_input(&mut self) -> io::Result<()>;

    /// Sets the blocking read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Adapts any real [`serialport::SerialPort`] to [`SerialChannel`].
pub struct PortChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl PortChannel {
    /// Wraps an already-opened serial port.
    pub fn new(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { port }
    }
}

impl SerialChannel for PortChannel {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        io::Read::read_exact(&mut self.port, buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, buf)
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory channel used by unit and integration tests.
    #[derive(Default)]
    pub struct MockChannel {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
    }

    impl SerialChannel for MockChannel {
        fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
            if self.inbound.len() < buf.len() {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more bytes"));
            }
            for slot in buf {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(())
        }

        fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            self.outbound.extend_from_slice(buf);
            Ok(())
        }

        fn flush_input(&mut self) -> io::Result<()> {
            self.inbound.clear();
            Ok(())
        }

        fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn mock_channel_reads_and_writes() {
        let mut chan = MockChannel {
            inbound: VecDeque::from(vec![1, 2, 3]),
            outbound: Vec::new(),
        };
        let mut buf = [0u8; 2];
        chan.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        chan.write_all(&[9, 9]).unwrap();
        assert_eq!(chan.outbound, vec![9, 9]);
    }
}
