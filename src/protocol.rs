use chrono::Utc;
use log::{debug, info, warn};

use crate::codec::{self, Oversampler};
use crate::config::LinkConfig;
use crate::constants::*;
use crate::error::{Result, Si8900Error};
use crate::handshake::HandshakeEngine;
use crate::transport::{SerialTransport, Transport};
use crate::types::*;

/// Main Si8900 driver interface
pub struct Si8900<T: Transport> {
    transport: T,
    config: LinkConfig,
    handshake: HandshakeEngine,
    state: LinkState,
}

impl Si8900<SerialTransport> {
    /// Open a serial port. The link starts unsynchronized.
    pub fn open(port_name: &str, config: LinkConfig) -> Result<Self> {
        let mut transport = SerialTransport::open(port_name, config.baud_rate, config.read_timeout())?;
        transport.clear()?;
        Ok(Self::with_transport(transport, config))
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<T: Transport> Si8900<T> {
    pub fn with_transport(transport: T, config: LinkConfig) -> Self {
        let handshake = HandshakeEngine::new(config.handshake.clone());
        Si8900 {
            transport,
            config,
            handshake,
            state: LinkState::Unknown,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    /// Forget synchronization, forcing a handshake before the next read
    pub fn invalidate(&mut self) {
        self.state = LinkState::Unknown;
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the auto-baud handshake
    pub fn synchronize(&mut self) -> Result<()> {
        self.state = LinkState::Unknown;
        self.handshake.run_auto_baud(&mut self.transport)?;
        // The device still answers the trailing calibration byte; wait it out
        let stale = self
            .transport
            .settle(self.config.read_timeout(), self.config.handshake.max_attempts as usize)?;
        if stale > 0 {
            debug!("dropped {} stale bytes after auto-baud", stale);
        }
        self.state = LinkState::Synchronized;
        Ok(())
    }

    /// Skip the handshake if `indicator` is [`HAND_SHAKED`], otherwise synchronize
    pub fn resume(&mut self, indicator: u8) -> Result<()> {
        if indicator == HAND_SHAKED {
            info!("link marked as already synchronized, skipping auto-baud");
            self.state = LinkState::Synchronized;
            Ok(())
        } else {
            self.synchronize()
        }
    }

    fn ensure_synchronized(&self) -> Result<()> {
        match self.state {
            LinkState::Synchronized => Ok(()),
            LinkState::Unknown => Err(Si8900Error::NotSynchronized),
        }
    }

    /// Drop synchronization when `result` says the link can no longer be trusted
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if e.desynchronizes() {
                warn!("link lost: {}", e);
                self.state = LinkState::Unknown;
            }
        }
        result
    }

    /// Send a command and wait for its echo
    pub fn send_command(&mut self, cmd: CommandByte) -> Result<()> {
        self.ensure_synchronized()?;
        let result = self
            .transport
            .clear_input()
            .map_err(Si8900Error::from)
            .and_then(|_| {
                codec::send_command(
                    &mut self.transport,
                    cmd,
                    self.config.echo_retries,
                    self.config.read_timeout(),
                )
                .map_err(Si8900Error::from)
            });
        self.track(result)
    }

    fn read_packet(&mut self) -> Result<Packet> {
        let wait = self.config.read_timeout();
        let mut packet = [0u8; PACKET_LEN];
        for byte in packet.iter_mut() {
            *byte = self.transport.receive(wait)?;
        }
        debug!("packet {:02X?}", packet);
        Ok(packet)
    }

    /// Send `cmd` once and read the full response, echo included.
    ///
    /// Input is cleared first so a late or partial reply to an earlier
    /// request cannot shift this packet.
    pub fn acquire_packet(&mut self, cmd: CommandByte) -> Result<Packet> {
        self.ensure_synchronized()?;
        let wait = self.config.read_timeout();
        let result = self
            .transport
            .clear_input()
            .and_then(|_| self.transport.transmit(cmd.raw(), wait))
            .map_err(Si8900Error::from)
            .and_then(|_| self.read_packet());
        self.track(result)
    }

    /// Read the next packet of a running stream without transmitting
    pub fn next_packet(&mut self) -> Result<Packet> {
        self.ensure_synchronized()?;
        let result = self.read_packet();
        self.track(result)
    }

    /// Single reading. Echo mismatches come back as [`Reading::FAILED`].
    pub fn read(&mut self, cmd: CommandByte) -> Result<Reading> {
        let packet = self.acquire_packet(cmd)?;
        let reading = codec::decode_reading(&packet, cmd);
        if reading.is_failed() {
            warn!("command {}: echo mismatch in {:02X?}", cmd, packet);
        }
        Ok(reading)
    }

    fn sample(&mut self, cmd: CommandByte, sample_count: u8) -> Result<Oversampler> {
        if sample_count == 0 {
            return Err(Si8900Error::InvalidSampleCount);
        }
        let mut sampler = Oversampler::new();
        for _ in 0..sample_count {
            let packet = self.acquire_packet(cmd)?;
            sampler.push(codec::decode_reading(&packet, cmd));
        }
        if sampler.accepted() < sampler.attempted() {
            warn!(
                "command {}: {}/{} samples failed",
                cmd,
                sampler.attempted() - sampler.accepted(),
                sampler.attempted()
            );
        }
        Ok(sampler)
    }

    /// Mean of `sample_count` fresh readings, skipping failed ones
    pub fn read_oversampled(&mut self, cmd: CommandByte, sample_count: u8) -> Result<Reading> {
        Ok(self.sample(cmd, sample_count)?.finish())
    }

    /// Oversampled reading stamped with the acquisition time
    pub fn measure(&mut self, cmd: CommandByte, sample_count: u8) -> Result<Measurement> {
        let taken_at = Utc::now();
        let sampler = self.sample(cmd, sample_count)?;
        Ok(Measurement {
            taken_at,
            command: cmd,
            reading: sampler.finish(),
            samples_requested: sample_count,
            samples_accepted: sampler.accepted(),
        })
    }
}
