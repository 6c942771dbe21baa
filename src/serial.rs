use std::io;

use log::{trace, warn};
use serialport::{ClearBuffer, SerialPort};
use thiserror::Error;

use crate::{command::Command, response::Response};

/// Iterations of the receive busy-wait before giving up. The loop never
/// yields to the scheduler; on typical hosts the bound is exhausted in
/// well under a millisecond, which keeps the exchange usable from a
/// real-time control loop.
const MAX_BUSY_LOOP: usize = 20_000;

/// UART rate the servos ship with.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("I/O error on the serial link: {0}")]
    Io(#[from] io::Error),
    #[error("Reply header did not arrive within the polling bound.")]
    HeaderTimeout,
    #[error("Reply payload did not arrive within the polling bound.")]
    PayloadTimeout,
    #[error("Corrupted message received.")]
    Corrupted,
}

/// Raw byte link to the bus. Opening the device, GPIO setup and the like
/// happen before a [`Session`] is constructed.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Bytes currently waiting in the receive buffer.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read_byte(&mut self) -> io::Result<u8>;

    /// Discard any stale bytes waiting in the receive buffer.
    fn flush_input(&mut self) -> io::Result<()>;
}

impl Transport for Box<dyn SerialPort> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let count = self.bytes_to_read().map_err(io::Error::from)?;
        Ok(count as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Open a serial device at the given path.
pub fn open(path: &str, baud_rate: u32) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(path, baud_rate).open()
}

/// Half-duplex request/response session. The session owns its transport
/// exclusively; the link is a single physical channel, so the handle can
/// be moved but never shared. `&mut self` on [`Session::exchange`] keeps
/// one request in flight at a time; callers wanting concurrent access
/// must serialize externally, e.g. behind a mutex.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Move the transport handle back out.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Write one request frame. Completion of the write is the only
    /// acknowledgement a write-type command gets.
    pub(crate) fn send(&mut self, command: &Command) -> Result<(), ExchangeError> {
        let frame = command.build();
        trace!("tx {frame:02x?}");
        self.transport.write(&frame)?;
        Ok(())
    }

    /// Busy-poll until at least `wanted` bytes are waiting. Returns false
    /// once the iteration bound is exhausted.
    fn wait_for(&mut self, wanted: usize) -> Result<bool, ExchangeError> {
        for _ in 0..MAX_BUSY_LOOP {
            if self.transport.bytes_available()? >= wanted {
                return Ok(true);
            }
        }
        Ok(self.transport.bytes_available()? >= wanted)
    }

    /// Assemble one reply frame: the four fixed leading bytes (headers,
    /// id, length field), then the `length - 1` remaining bytes.
    fn receive(&mut self) -> Result<Vec<u8>, ExchangeError> {
        if !self.wait_for(4)? {
            return Err(ExchangeError::HeaderTimeout);
        }

        let mut frame = Vec::with_capacity(10);
        for _ in 0..4 {
            frame.push(self.transport.read_byte()?);
        }

        let remaining = (frame[3] as usize).saturating_sub(1);
        if !self.wait_for(remaining)? {
            return Err(ExchangeError::PayloadTimeout);
        }

        for _ in 0..remaining {
            frame.push(self.transport.read_byte()?);
        }

        trace!("rx {frame:02x?}");
        Ok(frame)
    }

    /// One full request/response exchange: flush stale input, send the
    /// request, receive the reply and validate it against the expected
    /// command id and payload length.
    pub(crate) fn exchange(
        &mut self,
        command: &Command,
        reply_payload_len: u8,
    ) -> Result<Response, ExchangeError> {
        self.transport.flush_input()?;
        self.send(command)?;

        let frame = self.receive()?;

        Response::try_from(frame.as_slice())
            .and_then(|response| response.expect(command.instruction.id(), reply_payload_len))
            .map_err(|error| {
                warn!("rejected reply {frame:02x?}: {error}");
                ExchangeError::Corrupted
            })
    }
}
