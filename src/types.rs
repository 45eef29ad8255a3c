use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::*;

/// Raw response packet: `[cmd_echo, data1, data2]`
pub type Packet = [u8; PACKET_LEN];

/// Programmable gain amplifier setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pga {
    /// Gain of 0.5
    Half,
    /// Gain of 1
    Unity,
}

impl Pga {
    /// Field bits for the command byte
    pub fn bits(self) -> u8 {
        match self {
            Pga::Half => PGA_0,
            Pga::Unity => PGA_1,
        }
    }
}

/// Conversion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// One conversion per command
    Single,
    /// Continuous conversions after one command
    Stream,
}

impl Mode {
    /// Field bits for the command byte
    pub fn bits(self) -> u8 {
        match self {
            Mode::Single => MODE_0,
            Mode::Stream => MODE_1,
        }
    }
}

/// Voltage reference selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vref {
    /// Reference tied to VDD
    Internal,
    /// External reference pin
    External,
}

impl Vref {
    /// Field bits for the command byte
    pub fn bits(self) -> u8 {
        match self {
            Vref::Internal => REF_0,
            Vref::External => REF_1,
        }
    }
}

/// Analog input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputChannel {
    /// AIN0
    Ch0,
    /// AIN1
    Ch1,
    /// AIN2
    Ch2,
}

impl InputChannel {
    /// Every channel, in wire order
    pub const ALL: [InputChannel; 3] = [InputChannel::Ch0, InputChannel::Ch1, InputChannel::Ch2];

    /// Field bits including the fixed `11` high bits
    pub fn bits(self) -> u8 {
        match self {
            InputChannel::Ch0 => INCH_0,
            InputChannel::Ch1 => INCH_1,
            InputChannel::Ch2 => INCH_2,
        }
    }

    /// Channel number as it appears in a decoded reading
    pub fn index(self) -> u8 {
        match self {
            InputChannel::Ch0 => 0,
            InputChannel::Ch1 => 1,
            InputChannel::Ch2 => 2,
        }
    }
}

/// Command byte sent to the device.
///
/// Layout: `1 1 INCH{2} VREF 0 MODE PGA`. A command built through
/// [`build_command`](crate::codec::build_command) always has exactly one value
/// per field; `from_raw` accepts any byte and leaves that to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandByte(u8);

impl CommandByte {
    /// Wrap a raw byte without checking its fields
    pub const fn from_raw(byte: u8) -> Self {
        CommandByte(byte)
    }

    /// Byte as sent on the wire
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<CommandByte> for u8 {
    fn from(cmd: CommandByte) -> u8 {
        cmd.0
    }
}

impl fmt::Display for CommandByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Decoded channel and reading.
///
/// A packet that fails echo validation decodes to [`Reading::FAILED`], with
/// both fields set to the `0xFF` sentinel. The channel field is only two bits
/// wide on the wire, so `channel == FAILED` never collides with a valid decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Input channel, 0..=2
    pub channel: u8,
    /// 10-bit ADC count, 0..=1023
    pub value: u16,
}

impl Reading {
    /// Result of a packet whose echo did not match
    pub const FAILED: Reading = Reading {
        channel: FAILED,
        value: FAILED as u16,
    };

    /// Whether this is the [`Reading::FAILED`] sentinel
    pub fn is_failed(&self) -> bool {
        self.channel == FAILED
    }
}

/// Timestamped oversampled reading, ready for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// When sampling started
    pub taken_at: DateTime<Utc>,
    pub command: CommandByte,
    /// Mean of the accepted samples
    pub reading: Reading,
    pub samples_requested: u8,
    /// Samples whose echo matched
    pub samples_accepted: u32,
}

/// Synchronization state of the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Baud rate not yet confirmed, or lost after a timeout
    Unknown,
    /// Two consecutive confirmations seen, or declared known-good
    Synchronized,
}
