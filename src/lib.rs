//! # Si8900 Protocol Library
//!
//! A Rust library for driving Si8900 isolated ADCs over a UART link.
//! The device has no fixed baud rate, so every session starts with an
//! auto-baud handshake before commands can be exchanged.
//!
//! ## Features
//!
//! - Bounded auto-baud handshake that fails with a timeout instead of hanging
//! - Command byte construction from typed gain, mode, reference and channel settings
//! - Echo-validated command sending with bounded retransmission
//! - Response packet decoding into channel + 10-bit reading, with oversampling
//! - Pluggable [`Transport`] so the protocol can run over any byte link
//!
//! ## Example
//!
//! ```no_run
//! use si8900_protocol::{InputChannel, LinkConfig, Mode, Pga, Si8900, Vref, build_command};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut adc = Si8900::open("/dev/ttyUSB0", LinkConfig::default())?;
//!     adc.synchronize()?;
//!     let cmd = build_command(Pga::Half, Mode::Single, Vref::Internal, InputChannel::Ch0);
//!     let reading = adc.read_oversampled(cmd, 8)?;
//!     println!("channel {} = {}", reading.channel, reading.value);
//!     Ok(())
//! }
//! ```

pub mod bits;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

pub use bits::reverse_bits;
pub use codec::{build_command, decode_oversampled, decode_reading, encode_packet, send_command, Oversampler};
pub use config::LinkConfig;
pub use error::{CodecError, HandshakeError, Result, Si8900Error, TransportError};
pub use handshake::{run_auto_baud, CalibrationState, HandshakeConfig, HandshakeEngine};
pub use protocol::Si8900;
pub use transport::{SerialTransport, Transport};
pub use types::*;
