//! Auto-baud handshake.
//!
//! The device starts with no idea of the host's baud rate. The host keeps
//! sending [`CAL_BYTE`] so the device can measure the bit timing, and the
//! device answers with [`CONFIRM`] once it has locked on. Two confirmation
//! bytes in a row are required before the link counts as synchronized; any
//! other byte restarts the count.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::error::{HandshakeError, TransportError};
use crate::transport::Transport;

/// Bounds for one handshake run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Received bytes evaluated before giving up
    pub max_attempts: u32,
    /// Overall deadline for the handshake
    pub timeout_ms: u64,
    /// Minimum gap between calibration bytes sent while waiting for a reply
    pub cal_interval_us: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            max_attempts: HANDSHAKE_MAX_ATTEMPTS,
            timeout_ms: HANDSHAKE_TIMEOUT_MS,
            // One 10-bit frame at 9600 baud
            cal_interval_us: 1042,
        }
    }
}

impl HandshakeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cal_interval(&self) -> Duration {
        Duration::from_micros(self.cal_interval_us)
    }
}

/// Two-stage confirmation tracker for one handshake run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationState {
    pub receive_confirmed: bool,
    pub confirm_confirmed: bool,
}

impl CalibrationState {
    /// Feed one received byte. Returns `true` if it was a confirmation byte.
    pub fn observe(&mut self, byte: u8) -> bool {
        if byte == CONFIRM {
            if self.receive_confirmed {
                self.confirm_confirmed = true;
            }
            self.receive_confirmed = true;
            true
        } else {
            self.receive_confirmed = false;
            self.confirm_confirmed = false;
            false
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.receive_confirmed && self.confirm_confirmed
    }
}

/// Drives the auto-baud exchange over a [`Transport`]
#[derive(Debug, Clone, Default)]
pub struct HandshakeEngine {
    config: HandshakeConfig,
}

impl HandshakeEngine {
    pub fn new(config: HandshakeConfig) -> Self {
        HandshakeEngine { config }
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Run the handshake until two consecutive confirmation bytes arrive.
    ///
    /// Fails with [`HandshakeError::Timeout`] once `max_attempts` bytes have
    /// been evaluated or `timeout_ms` has elapsed, whichever comes first.
    pub fn run_auto_baud<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), HandshakeError> {
        let mut run = Run {
            transport,
            config: &self.config,
            start: Instant::now(),
            last_cal: Instant::now(),
            attempts: 0,
        };
        let mut state = CalibrationState::default();

        run.send_cal()?;
        loop {
            let byte = run.await_byte()?;
            run.attempts += 1;

            if state.observe(byte) {
                debug!("auto-baud: confirm {} ({:?})", run.attempts, state);
            } else {
                debug!("auto-baud: got {:02X}, restarting confirmation", byte);
                run.send_cal()?;
            }
            run.send_cal()?;

            if state.is_synchronized() {
                info!(
                    "auto-baud synchronized after {} bytes in {:?}",
                    run.attempts,
                    run.start.elapsed()
                );
                return Ok(());
            }
            if run.attempts >= self.config.max_attempts || run.start.elapsed() >= self.config.timeout() {
                return Err(run.timeout());
            }
        }
    }
}

struct Run<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    config: &'a HandshakeConfig,
    start: Instant,
    last_cal: Instant,
    attempts: u32,
}

impl<T: Transport + ?Sized> Run<'_, T> {
    fn remaining(&self) -> Duration {
        self.config.timeout().saturating_sub(self.start.elapsed())
    }

    fn timeout(&self) -> HandshakeError {
        let elapsed = self.start.elapsed();
        warn!("auto-baud gave up after {} bytes in {:?}", self.attempts, elapsed);
        HandshakeError::Timeout {
            attempts: self.attempts,
            elapsed,
        }
    }

    fn send_cal(&mut self) -> Result<(), HandshakeError> {
        let wait = self.remaining();
        match self.transport.transmit(CAL_BYTE, wait) {
            Ok(()) => {
                self.last_cal = Instant::now();
                Ok(())
            }
            Err(TransportError::TransmitTimeout { .. }) => Err(self.timeout()),
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for the next byte, keeping the calibration stream going meanwhile
    fn await_byte(&mut self) -> Result<u8, HandshakeError> {
        loop {
            if self.transport.receive_ready()? {
                return Ok(self.transport.read_byte()?);
            }
            if self.start.elapsed() >= self.config.timeout() {
                return Err(self.timeout());
            }
            if self.last_cal.elapsed() >= self.config.cal_interval() && self.transport.transmit_ready()? {
                self.transport.send_byte(CAL_BYTE)?;
                self.last_cal = Instant::now();
            }
            std::hint::spin_loop();
        }
    }
}

/// Run the handshake with default bounds
pub fn run_auto_baud<T: Transport + ?Sized>(transport: &mut T) -> Result<(), HandshakeError> {
    HandshakeEngine::default().run_auto_baud(transport)
}
