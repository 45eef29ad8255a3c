//! Simulated Si8900 shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;

use si8900_protocol::constants::{CAL_BYTE, CONFIRM};
use si8900_protocol::{encode_packet, CommandByte, Transport, TransportError};

/// Device model: needs `lock_after` calibration bytes to lock onto the baud
/// rate, answers each further calibration byte with `CONFIRM`, and replies to
/// command bytes with a full packet using the configured channel readings.
/// Replies reach the receiver `lag_polls` receive-ready polls after the send.
pub struct SimulatedAdc {
    pub rx: VecDeque<u8>,
    in_flight: VecDeque<u8>,
    pub lag_polls: usize,
    polls_left: usize,
    pub sent: Vec<u8>,
    pub lock_after: usize,
    cal_seen: usize,
    /// Reading returned for each channel
    pub readings: [u16; 3],
    /// Corrupt the echo of every nth command (1-based), 0 disables
    pub corrupt_every: usize,
    commands_seen: usize,
    /// Noise answered to calibration bytes before lock
    pub noise: u8,
}

impl SimulatedAdc {
    pub fn new(lock_after: usize) -> Self {
        SimulatedAdc {
            rx: VecDeque::new(),
            in_flight: VecDeque::new(),
            lag_polls: 0,
            polls_left: 0,
            sent: Vec::new(),
            lock_after,
            cal_seen: 0,
            readings: [0; 3],
            corrupt_every: 0,
            commands_seen: 0,
            noise: 0x00,
        }
    }

    pub fn with_readings(mut self, readings: [u16; 3]) -> Self {
        self.readings = readings;
        self
    }

    pub fn with_lag(mut self, polls: usize) -> Self {
        self.lag_polls = polls;
        self
    }

    pub fn calibration_bytes(&self) -> usize {
        self.sent.iter().filter(|&&b| b == CAL_BYTE).count()
    }

    fn respond(&mut self, byte: u8) {
        if byte == CAL_BYTE {
            self.cal_seen += 1;
            let reply = if self.cal_seen > self.lock_after {
                CONFIRM
            } else {
                self.noise
            };
            self.in_flight.push_back(reply);
            return;
        }

        self.commands_seen += 1;
        let channel = (byte >> 4) & 0x03;
        let value = self.readings.get(channel as usize).copied().unwrap_or(0);
        let mut packet = encode_packet(CommandByte::from_raw(byte), channel, value);
        if self.corrupt_every != 0 && self.commands_seen % self.corrupt_every == 0 {
            packet[0] = !packet[0];
        }
        self.in_flight.extend(packet);
    }
}

impl Transport for SimulatedAdc {
    fn transmit_ready(&mut self) -> Result<bool, TransportError> {
        Ok(true)
    }

    fn receive_ready(&mut self) -> Result<bool, TransportError> {
        if !self.in_flight.is_empty() {
            if self.polls_left == 0 {
                self.rx.extend(self.in_flight.drain(..));
            } else {
                self.polls_left -= 1;
            }
        }
        Ok(!self.rx.is_empty())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.sent.push(byte);
        self.respond(byte);
        self.polls_left = self.lag_polls;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.rx
            .pop_front()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no byte").into())
    }
}
