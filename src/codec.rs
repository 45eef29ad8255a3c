//! Command byte construction and response packet decoding.
//!
//! Response packet layout:
//!
//! ```text
//! byte 0: command echo      1 1 INCH{2} VREF 0 MODE PGA
//! byte 1: data 1            1 0 INCH{2} D9..D6
//! byte 2: data 2            0 D5..D0 0
//! ```

use log::{debug, warn};
use std::time::Duration;

use crate::constants::*;
use crate::error::{CodecError, TransportError};
use crate::transport::Transport;
use crate::types::*;

/// Combine one value of each field into a command byte.
pub fn build_command(pga: Pga, mode: Mode, vref: Vref, inch: InputChannel) -> CommandByte {
    CommandByte::from_raw(pga.bits() | mode.bits() | vref.bits() | inch.bits())
}

/// Send `cmd` and wait for the device to echo it back.
///
/// A wrong echo, or no echo within `wait`, triggers a retransmission. After
/// `max_attempts` transmissions the send fails with
/// [`CodecError::EchoMismatchTimeout`].
pub fn send_command<T: Transport + ?Sized>(
    transport: &mut T,
    cmd: CommandByte,
    max_attempts: u32,
    wait: Duration,
) -> Result<(), CodecError> {
    let mut last_echo = None;
    for attempt in 1..=max_attempts {
        transport.transmit(cmd.raw(), wait)?;
        match transport.receive(wait) {
            Ok(echo) if echo == cmd.raw() => return Ok(()),
            Ok(echo) => {
                debug!("command {}: echo {:02X} on attempt {}", cmd, echo, attempt);
                last_echo = Some(echo);
            }
            Err(TransportError::ReceiveTimeout { .. }) => {
                debug!("command {}: no echo on attempt {}", cmd, attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    warn!("command {} not echoed after {} attempts", cmd, max_attempts);
    Err(CodecError::EchoMismatchTimeout {
        command: cmd.raw(),
        last_echo,
        attempts: max_attempts,
    })
}

/// Join the two data bytes: `{1 0 INCH{2} D9..D0 0}` in the low 15 bits
fn join(data1: u8, data2: u8) -> u16 {
    ((data1 as u16) << 7) | data2 as u16
}

/// Decode a response packet sent in reply to `expected_cmd`.
///
/// Returns [`Reading::FAILED`] if the echo byte does not match.
pub fn decode_reading(buffer: &Packet, expected_cmd: CommandByte) -> Reading {
    if buffer[0] != expected_cmd.raw() {
        return Reading::FAILED;
    }
    Reading {
        channel: (buffer[1] & INCH_MASK) >> 4,
        value: (join(buffer[1], buffer[2]) & READING_MASK) >> 1,
    }
}

/// Build the packet the device would send for `value` on `channel`.
///
/// `value` is truncated to 10 bits and `channel` to 2.
pub fn encode_packet(cmd: CommandByte, channel: u8, value: u16) -> Packet {
    [
        cmd.raw(),
        0x80 | ((channel & 0x03) << 4) | ((value >> 6) & 0x0F) as u8,
        ((value & 0x3F) << 1) as u8,
    ]
}

/// Running mean over decoded samples, skipping failed ones
#[derive(Debug, Clone, Default)]
pub struct Oversampler {
    sum: u64,
    accepted: u32,
    attempted: u32,
    channel: Option<u8>,
}

impl Oversampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: Reading) {
        self.attempted = self.attempted.saturating_add(1);
        // Counter saturated: further samples would skew the mean
        if reading.is_failed() || self.accepted == u32::MAX {
            return;
        }
        self.sum += reading.value as u64;
        self.accepted += 1;
        self.channel = Some(reading.channel);
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Truncating mean of accepted samples; [`Reading::FAILED`] if none were
    pub fn finish(&self) -> Reading {
        match self.channel {
            Some(channel) if self.accepted > 0 => Reading {
                channel,
                value: (self.sum / self.accepted as u64) as u16,
            },
            _ => Reading::FAILED,
        }
    }
}

/// Decode `sample_count` packets and average them.
///
/// The first attempt decodes `buffer` as it is; `refill` overwrites it with
/// the next packet before every later attempt. Failed samples are left out
/// of the mean, and if every sample fails the result is [`Reading::FAILED`].
pub fn decode_oversampled<F>(
    buffer: &mut Packet,
    expected_cmd: CommandByte,
    sample_count: u8,
    mut refill: F,
) -> Reading
where
    F: FnMut(&mut Packet),
{
    let mut sampler = Oversampler::new();
    for i in 0..sample_count {
        if i > 0 {
            refill(buffer);
        }
        sampler.push(decode_reading(buffer, expected_cmd));
    }
    if sampler.accepted() < sampler.attempted() {
        debug!(
            "oversample {}: {}/{} samples accepted",
            expected_cmd,
            sampler.accepted(),
            sampler.attempted()
        );
    }
    sampler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use test_case::test_case;

    const CMD: CommandByte = CommandByte::from_raw(GP_SINGLE_READ_0);

    #[test_case(Pga::Half, Mode::Single, Vref::Internal, InputChannel::Ch0, 0xC0; "ch0_defaults")]
    #[test_case(Pga::Half, Mode::Single, Vref::Internal, InputChannel::Ch1, 0xD0; "ch1_defaults")]
    #[test_case(Pga::Half, Mode::Single, Vref::Internal, InputChannel::Ch2, 0xE0; "ch2_defaults")]
    #[test_case(Pga::Unity, Mode::Single, Vref::Internal, InputChannel::Ch0, 0xC1; "unity_gain")]
    #[test_case(Pga::Half, Mode::Stream, Vref::Internal, InputChannel::Ch0, 0xC2; "stream")]
    #[test_case(Pga::Half, Mode::Single, Vref::External, InputChannel::Ch0, 0xC8; "external_ref")]
    #[test_case(Pga::Unity, Mode::Stream, Vref::External, InputChannel::Ch2, 0xEB; "everything")]
    fn build(pga: Pga, mode: Mode, vref: Vref, inch: InputChannel, expected: u8) {
        assert_eq!(build_command(pga, mode, vref, inch).raw(), expected);
    }

    #[test]
    fn presets_match_builder() {
        let presets = [GP_SINGLE_READ_0, GP_SINGLE_READ_1, GP_SINGLE_READ_2];
        for (inch, preset) in InputChannel::ALL.iter().zip(presets) {
            let cmd = build_command(Pga::Half, Mode::Stream, Vref::Internal, *inch);
            assert_eq!(cmd.raw(), preset);
        }
    }

    #[test]
    fn decodes_every_channel_and_value() {
        for inch in InputChannel::ALL {
            let cmd = build_command(Pga::Half, Mode::Single, Vref::Internal, inch);
            for value in 0..ADC_RESOLUTION {
                let packet = encode_packet(cmd, inch.index(), value);
                let reading = decode_reading(&packet, cmd);
                assert_eq!(reading.channel, inch.index());
                assert_eq!(reading.value, value, "channel {} value {}", inch.index(), value);
            }
        }
    }

    #[test]
    fn decodes_hand_built_packet() {
        // channel 2, reading 0b10_1100_1101 = 717
        let packet = [CMD.raw(), 0b1010_1011, 0b0001_1010];
        assert_eq!(decode_reading(&packet, CMD), Reading { channel: 2, value: 717 });
    }

    #[test]
    fn valid_reading_of_255_is_not_failed() {
        let reading = decode_reading(&encode_packet(CMD, 0, 255), CMD);
        assert_eq!(reading.value, 255);
        assert!(!reading.is_failed());
    }

    #[test]
    fn mismatched_echo_fails() {
        let packet = encode_packet(CMD, 0, 512);
        for echo in (0..=u8::MAX).filter(|&b| b != CMD.raw()) {
            let mut bad = packet;
            bad[0] = echo;
            let reading = decode_reading(&bad, CMD);
            assert_eq!(reading, Reading::FAILED);
            assert!(reading.is_failed());
        }
    }

    fn oversample(values: &[Option<u16>]) -> Reading {
        let packets: Vec<Packet> = values
            .iter()
            .map(|v| match v {
                Some(v) => encode_packet(CMD, 0, *v),
                None => encode_packet(CommandByte::from_raw(0x00), 0, 0),
            })
            .collect();
        let mut next = packets.clone().into_iter().skip(1);
        let mut buffer = packets[0];
        decode_oversampled(&mut buffer, CMD, values.len() as u8, |buf| {
            *buf = next.next().unwrap();
        })
    }

    #[test]
    fn oversampled_mean() {
        let r = oversample(&[Some(100), Some(101), Some(102)]);
        assert_eq!(r, Reading { channel: 0, value: 101 });
    }

    #[test]
    fn oversampled_mean_truncates() {
        assert_eq!(oversample(&[Some(10), Some(11)]).value, 10);
    }

    #[test]
    fn oversampled_skips_failed_samples() {
        assert_eq!(oversample(&[Some(200), None, Some(300), None]).value, 250);
    }

    #[test]
    fn oversampled_all_failed() {
        assert_eq!(oversample(&[None, None, None]), Reading::FAILED);
    }

    #[test]
    fn oversampled_zero_samples() {
        let mut buffer = encode_packet(CMD, 0, 7);
        let r = decode_oversampled(&mut buffer, CMD, 0, |_| panic!("no refill expected"));
        assert_eq!(r, Reading::FAILED);
    }

    #[test]
    fn oversampled_full_scale_does_not_overflow() {
        let mut buffer = encode_packet(CMD, 1, 1023);
        let r = decode_oversampled(&mut buffer, CMD, u8::MAX, |_| {});
        assert_eq!(r, Reading { channel: 1, value: 1023 });
    }

    #[test]
    fn oversampler_accepts_more_than_255_samples() {
        let mut sampler = Oversampler::new();
        for i in 0..1000u32 {
            sampler.push(Reading { channel: 2, value: 1020 + (i % 4) as u16 });
        }
        sampler.push(Reading::FAILED);
        assert_eq!(sampler.accepted(), 1000);
        assert_eq!(sampler.attempted(), 1001);
        // mean of 1020..=1023 repeated is 1021.5
        assert_eq!(sampler.finish(), Reading { channel: 2, value: 1021 });
    }

    #[test]
    fn send_command_accepts_echo() {
        let mut mock = MockTransport::new().respond_with(|b| vec![b]);
        send_command(&mut mock, CMD, 3, Duration::from_millis(10)).unwrap();
        assert_eq!(mock.sent, vec![CMD.raw()]);
    }

    #[test]
    fn send_command_retries_on_mismatch() {
        let mut mock = MockTransport::with_rx(&[0x12, 0x34]).respond_with(|b| vec![b]);
        send_command(&mut mock, CMD, 3, Duration::from_millis(10)).unwrap();
        assert_eq!(mock.sent, vec![CMD.raw(); 3]);
    }

    #[test]
    fn send_command_gives_up() {
        let mut mock = MockTransport::new().respond_with(|_| vec![0x00]);
        let err = send_command(&mut mock, CMD, 4, Duration::from_millis(10)).unwrap_err();
        match err {
            CodecError::EchoMismatchTimeout {
                command,
                last_echo,
                attempts,
            } => {
                assert_eq!(command, CMD.raw());
                assert_eq!(last_echo, Some(0x00));
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.sent.len(), 4);
    }

    #[test]
    fn send_command_counts_silence_as_attempt() {
        let mut mock = MockTransport::new();
        let err = send_command(&mut mock, CMD, 2, Duration::from_millis(2)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::EchoMismatchTimeout { last_echo: None, attempts: 2, .. }
        ));
    }
}
