//! Error types for Si8900 protocol operations.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Si8900 operations.
pub type Result<T> = std::result::Result<T, Si8900Error>;

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transmitter stayed busy past the wait
    #[error("Transmitter not ready within {waited:?}")]
    TransmitTimeout {
        /// How long the transmitter was polled
        waited: Duration,
    },

    /// No byte arrived within the receive wait
    #[error("No byte received within {waited:?}")]
    ReceiveTimeout {
        /// How long the receiver was polled
        waited: Duration,
    },
}

/// Errors raised by the auto-baud handshake.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Two consecutive confirmation bytes were not seen within the bound
    #[error("Auto-baud timed out after {attempts} bytes in {elapsed:?}")]
    Timeout {
        /// Bytes evaluated before giving up
        attempts: u32,
        /// Time spent in the handshake
        elapsed: Duration,
    },

    /// Underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while sending commands.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The device never echoed the command back within the retry bound
    #[error("Command {command:#04x} not echoed after {attempts} attempts (last echo {last_echo:02X?})")]
    EchoMismatchTimeout {
        /// Command that was sent
        command: u8,
        /// Last byte received in place of the echo, if any arrived
        last_echo: Option<u8>,
        /// Number of transmissions
        attempts: u32,
    },

    /// Underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error types for Si8900 communication.
#[derive(Error, Debug)]
pub enum Si8900Error {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure outside of a handshake or command send
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Auto-baud handshake failed
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Command send failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// An operation needing a synchronized link was attempted without one
    #[error("Link is not synchronized, run the auto-baud handshake first")]
    NotSynchronized,

    /// Oversampling was requested with zero samples
    #[error("Sample count must be at least 1")]
    InvalidSampleCount,

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Si8900Error {
    /// Whether this error leaves the link in an unknown state.
    pub fn desynchronizes(&self) -> bool {
        matches!(
            self,
            Si8900Error::Transport(_) | Si8900Error::Handshake(_) | Si8900Error::Codec(_)
        )
    }
}
