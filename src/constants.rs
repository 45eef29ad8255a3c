//! Protocol constants for Si8900 communication.
//!
//! This module defines the reserved handshake bytes, the command byte fields,
//! the response packet masks, and the serial defaults used by the driver.

/// Calibration byte sent repeatedly so the device can lock onto the baud rate
pub const CAL_BYTE: u8 = 0xAA;

/// Byte returned by the device once it has locked onto the baud rate
pub const CONFIRM: u8 = 0x55;

/// Sentinel placed in both reading fields when a packet fails validation
pub const FAILED: u8 = 0xFF;

/// Indicator that the link is already known-good and auto-baud can be skipped
pub const HAND_SHAKED: u8 = 0x88;

// Command byte fields: 1 1 INCH{2} VREF - MODE PGA

/// Gain of 0.5
pub const PGA_0: u8 = 0x00;
/// Gain of 1
pub const PGA_1: u8 = 0x01;

/// Single conversion per command
pub const MODE_0: u8 = 0x00;
/// Continuous conversion stream
pub const MODE_1: u8 = 0x02;

/// Reference = VDD
pub const REF_0: u8 = 0x00;
/// Reference = external VREF pin
pub const REF_1: u8 = 0x08;

/// Input channel 0
pub const INCH_0: u8 = 0xC0;
/// Input channel 1
pub const INCH_1: u8 = 0xD0;
/// Input channel 2
pub const INCH_2: u8 = 0xE0;

/// General purpose read of channel 0
pub const GP_SINGLE_READ_0: u8 = INCH_0 | REF_0 | MODE_1 | PGA_0;
/// General purpose read of channel 1
pub const GP_SINGLE_READ_1: u8 = INCH_1 | REF_0 | MODE_1 | PGA_0;
/// General purpose read of channel 2
pub const GP_SINGLE_READ_2: u8 = INCH_2 | REF_0 | MODE_1 | PGA_0;

/// Length of a response packet: command echo plus two data bytes
pub const PACKET_LEN: usize = 3;

/// Channel field of the first data byte
pub const INCH_MASK: u8 = 0x30;

/// Reading bits (D9..D0 at bits 10..1) of the joined 16-bit packet word.
/// Bit 11 carries the low channel bit and must stay out of the reading.
pub const READING_MASK: u16 = 0x07FE;

/// Number of ADC counts (10-bit converter)
pub const ADC_RESOLUTION: u16 = 1024;

/// Default baud rate used to open the port
pub const BAUD_RATE: u32 = 9600;

/// Default per-byte receive wait in milliseconds
pub const READ_TIMEOUT_MS: u64 = 100;

/// Default number of bytes evaluated before auto-baud gives up
pub const HANDSHAKE_MAX_ATTEMPTS: u32 = 64;

/// Default overall auto-baud deadline in milliseconds
pub const HANDSHAKE_TIMEOUT_MS: u64 = 2000;

/// Default number of command transmissions before an echo mismatch is fatal
pub const ECHO_RETRIES: u32 = 8;
