//! Byte-level transport used by the handshake and the codec.
//!
//! The protocol logic only needs four primitives: readiness polling in each
//! direction plus single-byte send and receive. [`SerialTransport`] provides
//! them over a host serial port; tests drive the same code with a scripted
//! transport.

use log::trace;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::error::TransportError;

/// Serial link primitives.
///
/// Implementations must not block in `send_byte` or `read_byte` once the
/// matching ready call has returned `true`.
pub trait Transport {
    /// Whether a byte can be handed to the transmitter
    fn transmit_ready(&mut self) -> Result<bool, TransportError>;

    /// Whether a received byte is waiting
    fn receive_ready(&mut self) -> Result<bool, TransportError>;

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Wait up to `wait` for the transmitter, then send `byte`.
    fn transmit(&mut self, byte: u8, wait: Duration) -> Result<(), TransportError> {
        let start = Instant::now();
        while !self.transmit_ready()? {
            if start.elapsed() >= wait {
                return Err(TransportError::TransmitTimeout { waited: wait });
            }
            std::hint::spin_loop();
        }
        self.send_byte(byte)
    }

    /// Wait up to `wait` for a byte and read it.
    fn receive(&mut self, wait: Duration) -> Result<u8, TransportError> {
        let start = Instant::now();
        while !self.receive_ready()? {
            if start.elapsed() >= wait {
                return Err(TransportError::ReceiveTimeout { waited: wait });
            }
            std::hint::spin_loop();
        }
        self.read_byte()
    }

    /// Discard every byte already waiting. Returns how many were dropped.
    fn drain(&mut self) -> Result<usize, TransportError> {
        let mut dropped = 0;
        while self.receive_ready()? {
            self.read_byte()?;
            dropped += 1;
        }
        Ok(dropped)
    }

    /// Drop stale input before a new request goes out
    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.drain().map(|_| ())
    }

    /// Read and discard until nothing arrives for `quiet`, or `max` bytes
    /// have been dropped. Catches replies still in flight.
    fn settle(&mut self, quiet: Duration, max: usize) -> Result<usize, TransportError> {
        let mut dropped = 0;
        while dropped < max {
            match self.receive(quiet) {
                Ok(_) => dropped += 1,
                Err(TransportError::ReceiveTimeout { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(dropped)
    }
}

/// [`Transport`] over a host serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialTransport { port }
    }

    /// Open `port_name` at `baud_rate`, 8N1, without flow control
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;
        Ok(SerialTransport::new(port))
    }

    /// Drop anything queued in either direction
    pub fn clear(&mut self) -> Result<(), TransportError> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Transport for SerialTransport {
    fn transmit_ready(&mut self) -> Result<bool, TransportError> {
        // Only queue a byte once the previous one has left the OS buffer, so
        // calibration bursts track the wire instead of piling up.
        Ok(self.port.bytes_to_write()? == 0)
    }

    fn receive_ready(&mut self) -> Result<bool, TransportError> {
        Ok(self.port.bytes_to_read()? > 0)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        trace!("tx {:02X}", byte);
        self.port.write_all(&[byte])?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        trace!("rx {:02X}", buf[0]);
        Ok(buf[0])
    }
}
